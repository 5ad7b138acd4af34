//! Session/VWAP tracker: day high/low, VWAP, rolling volume windows, and
//! automatic day-boundary reset (§4.7). Grounded on `session_context.py`.
//!
//! The VWAP trade queue deliberately survives a session reset — see
//! `DESIGN.md`'s Open Question resolution #4.

use crate::model::Trade;
use crate::window::Window;

pub struct SessionTracker {
    day_high: f64,
    day_low: f64,
    current_price: f64,
    session_start_ms: i64,
    initialized: bool,

    vwap_trades: Window<Trade>,
    session_duration_s: i64,
    vwap_window_s: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionRead {
    pub daily_high: f64,
    pub daily_low: f64,
    pub current_price: f64,
    pub pct_from_low: f64,
    pub pct_from_high: f64,
    pub pct_through_range: f64,
    pub session_vwap: Option<f64>,
    pub distance_from_vwap_bps: Option<f64>,
    pub session_volume_usd: f64,
    pub last_1h_volume_usd: f64,
    pub last_4h_volume_usd: f64,
    pub session_duration_hours: f64,
}

impl SessionTracker {
    pub fn new(session_duration_s: i64, vwap_window_s: i64) -> Self {
        Self {
            day_high: 0.0,
            day_low: 0.0,
            current_price: 0.0,
            session_start_ms: 0,
            initialized: false,
            vwap_trades: Window::new(vwap_window_s * 1000),
            session_duration_s,
            vwap_window_s,
        }
    }

    /// Seed day high/low/current price from a backfill before any live
    /// trade arrives (§10.2).
    pub fn seed(&mut self, now_ms: i64, day_high: f64, day_low: f64, current_price: f64) {
        self.day_high = day_high;
        self.day_low = day_low;
        self.current_price = current_price;
        if !self.initialized {
            self.session_start_ms = now_ms;
            self.initialized = true;
        }
    }

    /// Reset (or initialize) the session against the price that triggered
    /// this update — mirrors `reset_session(timestamp, price)` being called
    /// with the incoming price, not the stale pre-reset one.
    fn maybe_reset(&mut self, now_ms: i64, price: f64) {
        if !self.initialized {
            self.session_start_ms = now_ms;
            self.initialized = true;
            self.day_high = price;
            self.day_low = price;
            self.current_price = price;
            return;
        }
        if now_ms - self.session_start_ms >= self.session_duration_s * 1000 {
            self.session_start_ms = now_ms;
            self.day_high = price;
            self.day_low = price;
            self.current_price = price;
        }
    }

    fn apply_price(&mut self, price: f64) {
        self.current_price = price;
        if self.day_high == 0.0 || price > self.day_high {
            self.day_high = price;
        }
        if self.day_low == 0.0 || price < self.day_low {
            self.day_low = price;
        }
    }

    pub fn on_price(&mut self, now_ms: i64, price: f64) {
        self.maybe_reset(now_ms, price);
        self.apply_price(price);
    }

    /// Every trade moves `current_price`/`day_high`/`day_low`, not just the
    /// VWAP queue — matches `session_context.py::add_trade` updating the
    /// extremes from the trade price on every trade.
    pub fn on_trade(&mut self, now_ms: i64, trade: Trade) {
        let price = trade.price_f64();
        self.maybe_reset(now_ms, price);
        self.apply_price(price);
        self.vwap_trades.push(now_ms, trade);
    }

    /// Whether any trade or price update has been observed yet
    /// (used by the engine's `system_status.session_context` freshness
    /// check).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn read(&self, now_ms: i64) -> SessionRead {
        let (day_high, day_low, current_price) = (self.day_high, self.day_low, self.current_price);
        let range = day_high - day_low;

        let (pct_from_low, pct_from_high, pct_through_range) = if range <= 0.0 {
            (0.0, 0.0, 50.0)
        } else {
            let from_low = if day_low > 0.0 {
                (current_price - day_low) / day_low * 100.0
            } else {
                0.0
            };
            let from_high = if day_high > 0.0 {
                (day_high - current_price) / day_high * 100.0
            } else {
                0.0
            };
            let through = (current_price - day_low) / range * 100.0;
            (from_low, from_high, through)
        };

        let mut notional_sum = 0.0;
        let mut pv_sum = 0.0;
        let mut last_1h = 0.0;
        let mut last_4h = 0.0;
        let mut session_volume = 0.0;
        for trade in self.vwap_trades.iter() {
            let notional = trade.notional_f64();
            notional_sum += notional;
            pv_sum += trade.price_f64() * notional;
            if now_ms - trade.time_ms < 3_600_000 {
                last_1h += notional;
            }
            if now_ms - trade.time_ms < 4 * 3_600_000 {
                last_4h += notional;
            }
            if trade.time_ms >= self.session_start_ms {
                session_volume += notional;
            }
        }

        let session_vwap = if notional_sum > 0.0 {
            Some(pv_sum / notional_sum)
        } else {
            None
        };
        let distance_from_vwap_bps = session_vwap.and_then(|vwap| {
            if vwap > 0.0 {
                Some((current_price - vwap) / vwap * 10_000.0)
            } else {
                None
            }
        });

        SessionRead {
            daily_high: day_high,
            daily_low: day_low,
            current_price,
            pct_from_low,
            pct_from_high,
            pct_through_range,
            session_vwap,
            distance_from_vwap_bps,
            session_volume_usd: session_volume,
            last_1h_volume_usd: last_1h,
            last_4h_volume_usd: last_4h,
            session_duration_hours: self.session_duration_s as f64 / 3_600.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TradeSide;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn trade(time_ms: i64, price: f64) -> Trade {
        Trade {
            time_ms,
            price: Decimal::from_str(&price.to_string()).unwrap(),
            size_base: Decimal::from_str("1").unwrap(),
            side: TradeSide::Buy,
        }
    }

    #[test]
    fn resets_extremes_but_keeps_vwap_queue() {
        let mut s = SessionTracker::new(60, 86_400);
        s.on_trade(0, trade(0, 100.0));
        s.on_price(0, 100.0);
        s.on_trade(30_000, trade(30_000, 110.0));
        s.on_price(30_000, 110.0);
        s.on_trade(60_000, trade(60_000, 90.0));
        s.on_price(60_000, 90.0);

        let read = s.read(60_000);
        assert_eq!(read.daily_high, 90.0);
        assert_eq!(read.daily_low, 90.0);
        assert_eq!(read.current_price, 90.0);
        // VWAP queue survives the reset: all three trades still counted.
        let expected_vwap = (100.0 + 110.0 + 90.0) / 3.0;
        assert!((read.session_vwap.unwrap() - expected_vwap).abs() < 1e-9);
    }

    #[test]
    fn degenerate_range_gives_fifty_percent_through() {
        let mut s = SessionTracker::new(86_400, 86_400);
        s.on_price(0, 100.0);
        let read = s.read(0);
        assert_eq!(read.pct_through_range, 50.0);
        assert_eq!(read.pct_from_low, 0.0);
        assert_eq!(read.pct_from_high, 0.0);
    }
}
