//! Open interest / funding / basis tracker (§4.8). Grounded on
//! `market_indicators.py`.

use crate::model::PerpAssetContext;
use crate::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisStatus {
    Premium,
    Discount,
    Normal,
}

#[derive(Debug, Clone, Copy)]
pub struct OiWindowRead {
    pub change_percent: f64,
    pub trend: Trend,
    pub velocity_pct_per_min: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct MarketContextRead {
    pub oi: f64,
    pub oi_trend: Trend,
    pub oi_velocity: f64,
    pub funding_rate: f64,
    pub funding_trend: Trend,
    pub funding_annualized_pct: f64,
    pub basis: Option<f64>,
    pub basis_status: BasisStatus,
}

pub struct MarketContextTracker {
    history: Window<PerpAssetContext>,
    oi_flat_threshold_pct: f64,
    funding_flat_threshold: f64,
    basis_spike_threshold_pct: f64,
    funding_periods_per_day: f64,
}

impl MarketContextTracker {
    pub fn new(
        max_history_s: i64,
        oi_flat_threshold_pct: f64,
        funding_flat_threshold: f64,
        basis_spike_threshold_pct: f64,
        funding_periods_per_day: f64,
    ) -> Self {
        Self {
            history: Window::new(max_history_s * 1000),
            oi_flat_threshold_pct,
            funding_flat_threshold,
            basis_spike_threshold_pct,
            funding_periods_per_day,
        }
    }

    pub fn on_context(&mut self, now_ms: i64, ctx: PerpAssetContext) {
        self.history.push(now_ms, ctx);
    }

    /// Whether any context update has been observed yet (used by the
    /// engine's `system_status.market_indicators` freshness check).
    pub fn has_data(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn oi_window(&self, now_ms: i64, window_s: i64) -> Option<OiWindowRead> {
        let start = self.history.since(now_ms, window_s * 1000).next()?;
        let latest = self.history.back()?;
        if start.oi_usd == 0.0 {
            return None;
        }
        let change_percent = (latest.oi_usd - start.oi_usd) / start.oi_usd * 100.0;
        let trend = if change_percent.abs() < self.oi_flat_threshold_pct {
            Trend::Flat
        } else if change_percent > 0.0 {
            Trend::Up
        } else {
            Trend::Down
        };
        let minutes = (window_s as f64 / 60.0).max(f64::EPSILON);
        Some(OiWindowRead {
            change_percent,
            trend,
            velocity_pct_per_min: change_percent / minutes,
        })
    }

    pub fn read(&self, now_ms: i64, oi_window_s: i64) -> Option<MarketContextRead> {
        let latest = self.history.back()?;
        let oi_window = self.oi_window(now_ms, oi_window_s);

        let funding_trend = if latest.funding_rate.abs() < self.funding_flat_threshold {
            Trend::Flat
        } else if latest.funding_rate > 0.0 {
            Trend::Up
        } else {
            Trend::Down
        };

        let basis = latest.basis_pct();
        let basis_status = match basis {
            Some(b) if b > self.basis_spike_threshold_pct => BasisStatus::Premium,
            Some(b) if b < -self.basis_spike_threshold_pct => BasisStatus::Discount,
            _ => BasisStatus::Normal,
        };

        // Assumes 8h funding periods (`funding_periods_per_day`, default 3).
        let funding_annualized_pct =
            latest.funding_rate * self.funding_periods_per_day * 365.0 * 100.0;

        Some(MarketContextRead {
            oi: latest.oi_usd,
            oi_trend: oi_window.map(|w| w.trend).unwrap_or(Trend::Flat),
            oi_velocity: oi_window.map(|w| w.velocity_pct_per_min).unwrap_or(0.0),
            funding_rate: latest.funding_rate,
            funding_trend,
            funding_annualized_pct,
            basis,
            basis_status,
        })
    }

    /// Short textual summary for logging/debugging — not part of the
    /// wire snapshot.
    pub fn interpretation(&self, read: &MarketContextRead) -> String {
        format!(
            "oi {:?} ({:.2}%/min), funding {:?} ({:.4} ann. {:.2}%), basis {:?}",
            read.oi_trend, read.oi_velocity, read.funding_trend, read.funding_rate,
            read.funding_annualized_pct, read.basis_status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(time_ms: i64, oi_usd: f64, funding_rate: f64, mark_px: f64, oracle_px: Option<f64>) -> PerpAssetContext {
        PerpAssetContext { time_ms, oi_usd, funding_rate, mark_px, oracle_px }
    }

    #[test]
    fn oi_trend_and_velocity() {
        let mut t = MarketContextTracker::new(900, 0.5, 1e-4, 0.1, 3.0);
        t.on_context(0, ctx(0, 1_000_000.0, 0.0001, 100.0, Some(100.0)));
        t.on_context(300_000, ctx(300_000, 1_010_000.0, 0.0001, 100.0, Some(100.0)));
        let oi = t.oi_window(300_000, 300).unwrap();
        assert!((oi.change_percent - 1.0).abs() < 1e-6);
        assert_eq!(oi.trend, Trend::Up);
    }

    #[test]
    fn basis_premium_detected() {
        let mut t = MarketContextTracker::new(900, 0.5, 1e-4, 0.1, 3.0);
        t.on_context(0, ctx(0, 1_000_000.0, 0.0001, 101.0, Some(100.0)));
        let read = t.read(0, 300).unwrap();
        assert_eq!(read.basis_status, BasisStatus::Premium);
        assert!((read.basis.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn funding_annualization_matches_three_periods_per_day() {
        let mut t = MarketContextTracker::new(900, 0.5, 1e-4, 0.1, 3.0);
        t.on_context(0, ctx(0, 1_000_000.0, 0.0001, 100.0, None));
        let read = t.read(0, 300).unwrap();
        assert!((read.funding_annualized_pct - (0.0001 * 3.0 * 365.0 * 100.0)).abs() < 1e-9);
    }
}
