//! Bucketed trade-flow distribution over rolling windows (§4.2).
//!
//! Grounded on `trade_flow_tracker.py`: a monotone trade queue retained
//! for `max_history_s`, queried over an arbitrary sub-window at read
//! time, with a fixed notional-size bucket schedule and a sweep
//! classifier on the buy/sell ratio.

use crate::model::{Trade, TradeSide};
use crate::window::Window;

#[derive(Debug, Clone, Default)]
pub struct BucketStats {
    pub count: u64,
    pub buy_notional: f64,
    pub sell_notional: f64,
}

#[derive(Debug, Clone)]
pub struct TradeFlowStats {
    pub trade_count: u64,
    pub total_volume: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub buy_ratio: f64,
    pub sell_ratio: f64,
    pub sweep_direction: Option<&'static str>,
    pub largest: f64,
    pub median: f64,
    pub average: f64,
    pub buckets: Vec<BucketStats>,
}

pub struct TradeFlowTracker {
    trades: Window<Trade>,
    bucket_schedule_usd: Vec<(f64, Option<f64>)>,
    sweep_ratio_threshold: f64,
}

impl TradeFlowTracker {
    pub fn new(max_history_s: i64, bucket_schedule_usd: Vec<(f64, Option<f64>)>, sweep_ratio_threshold: f64) -> Self {
        Self {
            trades: Window::new(max_history_s * 1000),
            bucket_schedule_usd,
            sweep_ratio_threshold,
        }
    }

    pub fn on_trade(&mut self, now_ms: i64, trade: Trade) {
        self.trades.push(now_ms, trade);
    }

    pub fn stats(&self, now_ms: i64, window_s: i64) -> TradeFlowStats {
        let mut notionals: Vec<f64> = Vec::new();
        let mut buy_volume = 0.0;
        let mut sell_volume = 0.0;
        let mut buckets: Vec<BucketStats> = self
            .bucket_schedule_usd
            .iter()
            .map(|_| BucketStats::default())
            .collect();

        for trade in self.trades.since(now_ms, window_s * 1000) {
            let notional = trade.notional_f64();
            notionals.push(notional);
            match trade.side {
                TradeSide::Buy => buy_volume += notional,
                TradeSide::Sell => sell_volume += notional,
            }
            if let Some(idx) = self
                .bucket_schedule_usd
                .iter()
                .position(|(lo, hi)| notional >= *lo && hi.map(|h| notional < h).unwrap_or(true))
            {
                let bucket = &mut buckets[idx];
                bucket.count += 1;
                match trade.side {
                    TradeSide::Buy => bucket.buy_notional += notional,
                    TradeSide::Sell => bucket.sell_notional += notional,
                }
            }
        }

        let trade_count = notionals.len() as u64;
        let total_volume = buy_volume + sell_volume;
        let buy_ratio = if total_volume > 0.0 { buy_volume / total_volume } else { 0.0 };
        let sell_ratio = if total_volume > 0.0 { sell_volume / total_volume } else { 0.0 };

        let sweep_direction = if trade_count >= 3 && buy_ratio >= self.sweep_ratio_threshold {
            Some("up")
        } else if trade_count >= 3 && sell_ratio >= self.sweep_ratio_threshold {
            Some("down")
        } else {
            None
        };

        notionals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let largest = notionals.last().copied().unwrap_or(0.0);
        let median = median_of(&notionals);
        let average = if trade_count > 0 {
            notionals.iter().sum::<f64>() / trade_count as f64
        } else {
            0.0
        };

        TradeFlowStats {
            trade_count,
            total_volume,
            buy_volume,
            sell_volume,
            buy_ratio,
            sell_ratio,
            sweep_direction,
            largest,
            median,
            average,
            buckets,
        }
    }
}

fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_schedule() -> Vec<(f64, Option<f64>)> {
        vec![
            (0.0, Some(1_000.0)),
            (1_000.0, Some(5_000.0)),
            (5_000.0, Some(10_000.0)),
            (10_000.0, Some(50_000.0)),
            (50_000.0, Some(250_000.0)),
            (250_000.0, None),
        ]
    }

    fn trade(time_ms: i64, notional: f64, side: TradeSide) -> Trade {
        use rust_decimal::Decimal;
        use std::str::FromStr;
        Trade {
            time_ms,
            price: Decimal::from_str("1").unwrap(),
            size_base: Decimal::from_str(&notional.to_string()).unwrap(),
            side,
        }
    }

    #[test]
    fn sweep_detected_on_buy_dominant_window() {
        let mut t = TradeFlowTracker::new(900, default_schedule(), 0.65);
        t.on_trade(0, trade(0, 10_000.0, TradeSide::Buy));
        t.on_trade(1_000, trade(1_000, 10_000.0, TradeSide::Buy));
        t.on_trade(2_000, trade(2_000, 10_000.0, TradeSide::Buy));
        t.on_trade(3_000, trade(3_000, 10_000.0, TradeSide::Buy));
        t.on_trade(4_000, trade(4_000, 5_000.0, TradeSide::Sell));

        let stats = t.stats(10_000, 10);
        assert!((stats.buy_ratio - (40_000.0 / 45_000.0)).abs() < 1e-6);
        assert_eq!(stats.sweep_direction, Some("up"));
    }

    #[test]
    fn no_sweep_below_threshold() {
        let mut t = TradeFlowTracker::new(900, default_schedule(), 0.65);
        t.on_trade(0, trade(0, 1_000.0, TradeSide::Buy));
        t.on_trade(1_000, trade(1_000, 1_000.0, TradeSide::Sell));
        let stats = t.stats(2_000, 10);
        assert_eq!(stats.sweep_direction, None);
    }
}
