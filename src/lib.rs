//! Library exports for the perp-futures market-microstructure analytics
//! engine.

pub mod backfill;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
#[cfg(feature = "fanout")]
pub mod fanout;
pub mod model;
pub mod sink;
pub mod snapshot;
pub mod transport;
pub mod window;
