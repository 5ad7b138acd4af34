//! Order-book levels and replace-on-arrival L2 snapshots.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price level. `count = 0` is tolerated and treated as unknown
/// rather than rejected (exchanges don't always report order counts).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub count: u32,
}

impl OrderBookLevel {
    pub fn new(price: Decimal, size: Decimal, count: u32) -> Self {
        Self { price, size, count }
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    pub fn notional_f64(&self) -> f64 {
        self.notional().to_f64().unwrap_or(0.0)
    }
}

/// One side of the book. Bids are stored best-first (descending), asks
/// best-first (ascending) — the caller is responsible for sorting on
/// construction, this type does not re-sort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBookSide(pub Vec<OrderBookLevel>);

impl OrderBookSide {
    pub fn best(&self) -> Option<&OrderBookLevel> {
        self.0.first()
    }

    pub fn depth_usd(&self, levels: usize) -> f64 {
        self.0.iter().take(levels).map(|l| l.notional_f64()).sum()
    }

    pub fn total_usd(&self) -> f64 {
        self.0.iter().map(|l| l.notional_f64()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Immutable L2 snapshot. Each new snapshot event fully replaces the
/// previous one — there is no incremental delta application at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub coin: String,
    pub time_ms: i64,
    pub bids: OrderBookSide,
    pub asks: OrderBookSide,
}

impl OrderBookSnapshot {
    pub fn mid(&self) -> Option<f64> {
        let bid = self.bids.best()?.price.to_f64()?;
        let ask = self.asks.best()?.price.to_f64()?;
        Some((bid + ask) / 2.0)
    }

    pub fn spread_abs(&self) -> Option<f64> {
        let bid = self.bids.best()?.price.to_f64()?;
        let ask = self.asks.best()?.price.to_f64()?;
        Some(ask - bid)
    }

    /// `(ask - bid) / mid * 10_000`. Divides by mid, not best_bid — see
    /// DESIGN.md's Open Question resolutions.
    pub fn spread_bps(&self) -> Option<f64> {
        let mid = self.mid()?;
        if mid <= 0.0 {
            return None;
        }
        Some(self.spread_abs()? / mid * 10_000.0)
    }

    pub fn depth_usd(&self, levels: usize) -> (f64, f64) {
        (self.bids.depth_usd(levels), self.asks.depth_usd(levels))
    }

    /// `(bid - ask) / (bid + ask)`, 0 when both sides are empty.
    pub fn imbalance(&self, levels: usize) -> f64 {
        let (b, a) = self.depth_usd(levels);
        if b + a > 0.0 {
            (b - a) / (b + a)
        } else {
            0.0
        }
    }

    /// Malformed-event guard at the ingestion boundary: each side, where
    /// present, must be monotone (bids descending, asks ascending) with
    /// strictly positive price and size.
    pub fn is_valid(&self) -> bool {
        fn side_ok(side: &OrderBookSide, descending: bool) -> bool {
            let mut prev: Option<Decimal> = None;
            for level in side.0.iter() {
                if level.price <= Decimal::ZERO || level.size <= Decimal::ZERO {
                    return false;
                }
                if let Some(p) = prev {
                    let ok = if descending { level.price < p } else { level.price > p };
                    if !ok {
                        return false;
                    }
                }
                prev = Some(level.price);
            }
            true
        }
        side_ok(&self.bids, true) && side_ok(&self.asks, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn lvl(p: &str, s: &str) -> OrderBookLevel {
        OrderBookLevel::new(Decimal::from_str(p).unwrap(), Decimal::from_str(s).unwrap(), 1)
    }

    #[test]
    fn mid_and_spread_scenario_one() {
        let book = OrderBookSnapshot {
            coin: "SOL".into(),
            time_ms: 1000,
            bids: OrderBookSide(vec![lvl("100.0", "1"), lvl("99.9", "2")]),
            asks: OrderBookSide(vec![lvl("100.1", "1"), lvl("100.2", "2")]),
        };
        assert!((book.mid().unwrap() - 100.05).abs() < 1e-9);
        assert!((book.spread_bps().unwrap() - 9.995002).abs() < 1e-3);
        assert_eq!(book.imbalance(1), 0.0);
    }

    #[test]
    fn empty_book_has_no_mid() {
        let book = OrderBookSnapshot {
            coin: "SOL".into(),
            time_ms: 0,
            bids: OrderBookSide::default(),
            asks: OrderBookSide::default(),
        };
        assert!(book.mid().is_none());
        assert_eq!(book.imbalance(5), 0.0);
    }

    #[test]
    fn imbalance_symmetry() {
        let book = OrderBookSnapshot {
            coin: "SOL".into(),
            time_ms: 0,
            bids: OrderBookSide(vec![lvl("100", "3")]),
            asks: OrderBookSide(vec![lvl("101", "1")]),
        };
        let swapped = OrderBookSnapshot {
            coin: "SOL".into(),
            time_ms: 0,
            bids: OrderBookSide(vec![lvl("101", "1")]),
            asks: OrderBookSide(vec![lvl("100", "3")]),
        };
        assert!((book.imbalance(1) + swapped.imbalance(1)).abs() < 1e-9);
    }
}
