//! Depth-decay tracker: change in top-of-book liquidity over a short
//! window (§4.4). Grounded on `depth_decay.py`.

use crate::window::{Timestamped, Window};

#[derive(Debug, Clone, Copy)]
struct DepthPoint {
    time_ms: i64,
    l5_bid_usd: f64,
    l5_ask_usd: f64,
}

impl Timestamped for DepthPoint {
    fn time_ms(&self) -> i64 {
        self.time_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayStatus {
    Ok,
    Medium,
    High,
    Critical,
}

fn status_for(decay_pct: f64) -> DecayStatus {
    if decay_pct < 5.0 {
        DecayStatus::Ok
    } else if decay_pct < 15.0 {
        DecayStatus::Medium
    } else if decay_pct < 30.0 {
        DecayStatus::High
    } else {
        DecayStatus::Critical
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DepthDecayRead {
    pub bid_decay_percent: f64,
    pub ask_decay_percent: f64,
    pub bid_status: DecayStatus,
    pub ask_status: DecayStatus,
}

pub struct DepthDecayTracker {
    points: Window<DepthPoint>,
    window_s: i64,
}

impl DepthDecayTracker {
    pub fn new(window_s: i64) -> Self {
        Self {
            points: Window::new((window_s as f64 * 1.1 * 1000.0) as i64),
            window_s,
        }
    }

    pub fn on_book_update(&mut self, now_ms: i64, l5_bid_usd: f64, l5_ask_usd: f64) {
        self.points.push(
            now_ms,
            DepthPoint {
                time_ms: now_ms,
                l5_bid_usd,
                l5_ask_usd,
            },
        );
    }

    /// Signed: a negative decay% means depth increased since the
    /// reference point (the oldest sample within the window).
    pub fn read(&self, now_ms: i64) -> Option<DepthDecayRead> {
        let reference = self.points.since(now_ms, self.window_s * 1000).next()?;
        let current = self.points.back()?;

        let bid_decay_percent = if reference.l5_bid_usd > 0.0 {
            (reference.l5_bid_usd - current.l5_bid_usd) / reference.l5_bid_usd * 100.0
        } else {
            0.0
        };
        let ask_decay_percent = if reference.l5_ask_usd > 0.0 {
            (reference.l5_ask_usd - current.l5_ask_usd) / reference.l5_ask_usd * 100.0
        } else {
            0.0
        };

        Some(DepthDecayRead {
            bid_decay_percent,
            ask_decay_percent,
            bid_status: status_for(bid_decay_percent),
            ask_status: status_for(ask_decay_percent),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_classified_by_threshold() {
        let mut t = DepthDecayTracker::new(15);
        t.on_book_update(0, 100_000.0, 100_000.0);
        t.on_book_update(15_000, 80_000.0, 110_000.0);
        let read = t.read(15_000).unwrap();
        assert!((read.bid_decay_percent - 20.0).abs() < 1e-9);
        assert_eq!(read.bid_status, DecayStatus::High);
        assert!(read.ask_decay_percent < 0.0);
        assert_eq!(read.ask_status, DecayStatus::Ok);
    }

    #[test]
    fn no_reference_returns_none() {
        let t = DepthDecayTracker::new(15);
        assert!(t.read(0).is_none());
    }
}
