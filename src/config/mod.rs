//! Configuration management.
//!
//! The original tracker-by-tracker construction scattered thresholds
//! across each component's constructor; [`EngineConfig`] collects every
//! tunable into one struct loaded once via `EngineConfig::from_env()`.

pub mod engine;

pub use engine::EngineConfig;
