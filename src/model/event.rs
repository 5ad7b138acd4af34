//! Tagged event sum-type consumed by the engine's ingest task.
//!
//! Replaces a type-name dispatch over heterogeneous event objects with an
//! exhaustive match over a closed set of variants.

use super::{OrderBookSnapshot, PerpAssetContext, Trade};

#[derive(Debug, Clone)]
pub enum MarketEvent {
    OrderBook(OrderBookSnapshot),
    Trade(Trade),
    Context(PerpAssetContext),
}
