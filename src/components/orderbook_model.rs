//! Walk-the-book slippage estimation (§4.1).
//!
//! Grounded on `orderbook_metrics.py`'s slippage walk and the teacher's
//! `orderbook/metrics.rs::calculate_slippage_for_amount` loop shape,
//! generalized from the teacher's BTreeMap sides to the normalized
//! `OrderBookSide` level list.

use crate::model::{OrderBookSide, OrderBookSnapshot};
use rust_decimal::prelude::ToPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy)]
pub struct SlippageEstimate {
    pub avg_fill_price: f64,
    pub slippage_bps: f64,
    pub round_trip_cost_bps: f64,
    pub is_feasible: bool,
    pub liquidity_used_pct: f64,
}

const EPS_USD: f64 = 1e-6;

/// Walk `side_levels` consuming up to `usd_size` of notional, best price
/// first. Returns `(filled_usd, notional_vwap, qty)` where `notional_vwap`
/// is `Σ fill_i · price_i` and `qty` is `Σ fill_i / price_i`.
fn walk(side_levels: &OrderBookSide, usd_size: f64) -> (f64, f64, f64) {
    let mut remaining = usd_size;
    let mut filled = 0.0;
    let mut notional_vwap = 0.0;
    let mut qty = 0.0;

    for level in side_levels.0.iter() {
        if remaining <= EPS_USD {
            break;
        }
        let price = level.price.to_f64().unwrap_or(0.0);
        if price <= 0.0 {
            continue;
        }
        let level_notional = level.notional_f64();
        let fill = remaining.min(level_notional);
        notional_vwap += fill * price;
        qty += fill / price;
        remaining -= fill;
        filled += fill;
    }

    (filled, notional_vwap, qty)
}

/// Estimate the cost of executing `usd_size` of `side` against `book`.
/// `reference_price` is the fallback VWAP when the side has no liquidity
/// at all (empty book ⇒ `is_feasible = false`, `avg_fill_price = reference_price`).
pub fn estimate_slippage(
    book: &OrderBookSnapshot,
    side: Side,
    usd_size: f64,
    taker_fee_bps: f64,
) -> Option<SlippageEstimate> {
    let spread_bps = book.spread_bps().unwrap_or(0.0);
    let (levels, best_price, reference_price) = match side {
        Side::Buy => (
            &book.asks,
            book.asks.best().and_then(|l| l.price.to_f64()),
            book.mid(),
        ),
        Side::Sell => (
            &book.bids,
            book.bids.best().and_then(|l| l.price.to_f64()),
            book.mid(),
        ),
    };

    let best_price = best_price.or(reference_price)?;
    let reference_price = reference_price.unwrap_or(best_price);

    let total_side_notional = levels.total_usd();
    let (filled, notional_vwap, qty) = walk(levels, usd_size);

    let avg_fill_price = if qty > 0.0 {
        notional_vwap / qty
    } else {
        reference_price
    };

    let is_feasible = filled >= 0.99 * usd_size;

    let slippage_bps = if qty > 0.0 && best_price > 0.0 {
        match side {
            Side::Buy => (avg_fill_price - best_price) / best_price * 10_000.0,
            Side::Sell => (best_price - avg_fill_price) / best_price * 10_000.0,
        }
    } else {
        0.0
    };

    let round_trip_cost_bps = spread_bps + slippage_bps + 2.0 * taker_fee_bps;

    let liquidity_used_pct = if total_side_notional > 0.0 {
        (filled / total_side_notional * 100.0).min(100.0)
    } else {
        100.0
    };

    Some(SlippageEstimate {
        avg_fill_price,
        slippage_bps,
        round_trip_cost_bps,
        is_feasible,
        liquidity_used_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderBookLevel;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn lvl(p: &str, s: &str) -> OrderBookLevel {
        OrderBookLevel::new(Decimal::from_str(p).unwrap(), Decimal::from_str(s).unwrap(), 1)
    }

    fn book() -> OrderBookSnapshot {
        OrderBookSnapshot {
            coin: "SOL".into(),
            time_ms: 0,
            bids: OrderBookSide(vec![lvl("100.0", "10"), lvl("99.0", "10")]),
            asks: OrderBookSide(vec![lvl("100.1", "10"), lvl("101.0", "10")]),
        }
    }

    #[test]
    fn feasible_fill_within_top_level() {
        let est = estimate_slippage(&book(), Side::Buy, 500.0, 2.8).unwrap();
        assert!(est.is_feasible);
        assert!(est.avg_fill_price >= 100.1);
        assert!(est.liquidity_used_pct > 0.0 && est.liquidity_used_pct <= 100.0);
    }

    #[test]
    fn empty_side_is_infeasible() {
        let book = OrderBookSnapshot {
            coin: "SOL".into(),
            time_ms: 0,
            bids: OrderBookSide::default(),
            asks: OrderBookSide::default(),
        };
        assert!(estimate_slippage(&book, Side::Buy, 500.0, 2.8).is_none());
    }

    #[test]
    fn oversized_order_is_infeasible() {
        let est = estimate_slippage(&book(), Side::Buy, 1_000_000.0, 2.8).unwrap();
        assert!(!est.is_feasible);
        assert_eq!(est.liquidity_used_pct, 100.0);
    }
}
