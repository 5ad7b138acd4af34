//! Suspected-liquidation detector: large-trade and cascade heuristics
//! (§4.9). Grounded on `liquidations.py`. The two heuristics are mutually
//! exclusive per trade — large-trade is checked first.

use crate::model::{Trade, TradeSide};
use crate::window::{Timestamped, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiqSide {
    Long,
    Short,
}

fn liq_side_for(trade_side: TradeSide) -> LiqSide {
    match trade_side {
        TradeSide::Sell => LiqSide::Long,
        TradeSide::Buy => LiqSide::Short,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LiquidationEvent {
    pub time_ms: i64,
    pub side: LiqSide,
    pub volume_usd: f64,
    pub confidence: f64,
}

impl Timestamped for LiquidationEvent {
    fn time_ms(&self) -> i64 {
        self.time_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiqStatus {
    Normal,
    Elevated,
    High,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidationRead {
    pub long_liquidations: u32,
    pub short_liquidations: u32,
    pub total_long_volume: f64,
    pub total_short_volume: f64,
}

impl LiquidationRead {
    pub fn status(&self) -> LiqStatus {
        let total = self.long_liquidations + self.short_liquidations;
        if total >= 10 {
            LiqStatus::High
        } else if total >= 3 {
            LiqStatus::Elevated
        } else {
            LiqStatus::Normal
        }
    }
}

pub struct LiquidationDetector {
    events: Window<LiquidationEvent>,
    recent_trades: Window<Trade>,
    large_trade_threshold_usd: f64,
    cascade_window_ms: i64,
    cascade_min_count: usize,
}

impl LiquidationDetector {
    pub fn new(
        large_trade_threshold_usd: f64,
        cascade_window_ms: i64,
        cascade_min_count: usize,
        max_history_s: i64,
    ) -> Self {
        Self {
            events: Window::new(max_history_s * 1000),
            recent_trades: Window::new(cascade_window_ms),
            large_trade_threshold_usd,
            cascade_window_ms,
            cascade_min_count,
        }
    }

    pub fn on_trade(&mut self, now_ms: i64, trade: Trade) -> Option<LiquidationEvent> {
        let notional = trade.notional_f64();

        if notional >= self.large_trade_threshold_usd {
            let event = LiquidationEvent {
                time_ms: now_ms,
                side: liq_side_for(trade.side),
                volume_usd: notional,
                confidence: (notional / (5.0 * self.large_trade_threshold_usd)).min(1.0),
            };
            self.recent_trades.push(now_ms, trade);
            self.events.push(now_ms, event);
            return Some(event);
        }

        self.recent_trades.push(now_ms, trade);

        let mut count = 0usize;
        let mut volume = 0.0;
        for t in self.recent_trades.since(now_ms, self.cascade_window_ms) {
            if t.side == trade.side {
                count += 1;
                volume += t.notional_f64();
            }
        }

        if count >= self.cascade_min_count && volume >= self.large_trade_threshold_usd {
            let event = LiquidationEvent {
                time_ms: now_ms,
                side: liq_side_for(trade.side),
                volume_usd: volume,
                confidence: 0.7,
            };
            self.events.push(now_ms, event);
            return Some(event);
        }

        None
    }

    /// Whether any trade has ever reached this detector (used by the
    /// engine's `system_status.liquidations` freshness check).
    pub fn has_recent_trades(&self) -> bool {
        !self.recent_trades.is_empty()
    }

    pub fn read(&self, now_ms: i64, window_s: i64) -> LiquidationRead {
        let mut read = LiquidationRead::default();
        for event in self.events.since(now_ms, window_s * 1000) {
            match event.side {
                LiqSide::Long => {
                    read.long_liquidations += 1;
                    read.total_long_volume += event.volume_usd;
                }
                LiqSide::Short => {
                    read.short_liquidations += 1;
                    read.total_short_volume += event.volume_usd;
                }
            }
        }
        read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn trade(time_ms: i64, notional: f64, side: TradeSide) -> Trade {
        Trade {
            time_ms,
            price: Decimal::from_str("1").unwrap(),
            size_base: Decimal::from_str(&notional.to_string()).unwrap(),
            side,
        }
    }

    #[test]
    fn cascade_of_five_small_sells_emits_long_liquidation() {
        let mut d = LiquidationDetector::new(10_000.0, 5_000, 5, 900);
        let mut last = None;
        for (i, t) in [0, 1_000, 2_000, 3_000, 4_000].into_iter().enumerate() {
            last = d.on_trade(t, trade(t, 3_000.0, TradeSide::Sell));
            if i < 4 {
                assert!(last.is_none());
            }
        }
        let event = last.unwrap();
        assert_eq!(event.side, LiqSide::Long);
        assert!((event.volume_usd - 15_000.0).abs() < 1e-9);
        assert_eq!(event.confidence, 0.7);
    }

    #[test]
    fn single_large_sell_emits_high_confidence_event() {
        let mut d = LiquidationDetector::new(10_000.0, 5_000, 5, 900);
        let event = d.on_trade(0, trade(0, 50_000.0, TradeSide::Sell)).unwrap();
        assert_eq!(event.side, LiqSide::Long);
        assert_eq!(event.confidence, 1.0);
    }

    #[test]
    fn status_bands() {
        let mut read = LiquidationRead::default();
        assert_eq!(read.status(), LiqStatus::Normal);
        read.long_liquidations = 3;
        assert_eq!(read.status(), LiqStatus::Elevated);
        read.long_liquidations = 10;
        assert_eq!(read.status(), LiqStatus::High);
    }
}
