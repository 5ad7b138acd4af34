//! Public trade events.

use crate::window::Timestamped;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A single taker trade. `side` is from the taker's perspective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Trade {
    pub time_ms: i64,
    pub price: Decimal,
    pub size_base: Decimal,
    pub side: TradeSide,
}

impl Trade {
    pub fn notional(&self) -> Decimal {
        self.price * self.size_base
    }

    pub fn notional_f64(&self) -> f64 {
        self.notional().to_f64().unwrap_or(0.0)
    }

    pub fn price_f64(&self) -> f64 {
        self.price.to_f64().unwrap_or(0.0)
    }

    pub fn size_f64(&self) -> f64 {
        self.size_base.to_f64().unwrap_or(0.0)
    }

    /// Malformed-event guard at the transport boundary: size/price must be
    /// finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.price > Decimal::ZERO && self.size_base > Decimal::ZERO
    }
}

impl Timestamped for Trade {
    fn time_ms(&self) -> i64 {
        self.time_ms
    }
}
