//! Short/long-window price momentum (§4.3).
//!
//! Grounded on `price_momentum.py`: a price-point queue appended on every
//! mid change, queried over a window by comparing the oldest in-window
//! sample to the latest.

use crate::window::{Timestamped, Window};

#[derive(Debug, Clone, Copy)]
struct PricePoint {
    time_ms: i64,
    mid: f64,
}

impl Timestamped for PricePoint {
    fn time_ms(&self) -> i64 {
        self.time_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy)]
pub struct MomentumRead {
    pub direction: Direction,
    pub change_percent: f64,
    pub is_usable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Bullish,
    Bearish,
    ReversalUp,
    ReversalDown,
    None,
}

pub struct MomentumTracker {
    points: Window<PricePoint>,
    flat_threshold_pct: f64,
}

impl MomentumTracker {
    pub fn new(retention_ms: i64, flat_threshold_pct: f64) -> Self {
        Self {
            points: Window::new(retention_ms),
            flat_threshold_pct,
        }
    }

    pub fn on_mid(&mut self, now_ms: i64, mid: f64) {
        self.points.push(now_ms, PricePoint { time_ms: now_ms, mid });
    }

    pub fn read(&self, now_ms: i64, window_s: i64) -> MomentumRead {
        let window_ms = window_s * 1000;
        let in_window: Vec<&PricePoint> = self.points.since(now_ms, window_ms).collect();

        let (Some(oldest), Some(latest)) = (in_window.first(), in_window.last()) else {
            return MomentumRead {
                direction: Direction::Flat,
                change_percent: 0.0,
                is_usable: false,
            };
        };

        let change_percent = if oldest.mid != 0.0 {
            (latest.mid - oldest.mid) / oldest.mid * 100.0
        } else {
            0.0
        };

        let direction = if change_percent.abs() < self.flat_threshold_pct {
            Direction::Flat
        } else if change_percent > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };

        let span_ms = latest.time_ms - oldest.time_ms;
        let is_usable = span_ms as f64 >= 0.5 * window_ms as f64;

        MomentumRead {
            direction,
            change_percent,
            is_usable,
        }
    }

    /// Composite read combining a short and long window's directions into
    /// a single alignment signal, for components that want one read
    /// rather than two independent ones (e.g. the regime detector).
    pub fn alignment(short: &MomentumRead, long: &MomentumRead) -> Alignment {
        match (short.direction, long.direction) {
            (Direction::Up, Direction::Up) => Alignment::Bullish,
            (Direction::Down, Direction::Down) => Alignment::Bearish,
            (Direction::Up, Direction::Down) => Alignment::ReversalUp,
            (Direction::Down, Direction::Up) => Alignment::ReversalDown,
            _ => Alignment::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_upward_trend() {
        let mut m = MomentumTracker::new(60_000, 0.01);
        m.on_mid(0, 100.0);
        m.on_mid(5_000, 101.0);
        let read = m.read(5_000, 5);
        assert_eq!(read.direction, Direction::Up);
        assert!(read.is_usable);
    }

    #[test]
    fn flat_within_threshold() {
        let mut m = MomentumTracker::new(60_000, 0.01);
        m.on_mid(0, 100.0);
        m.on_mid(5_000, 100.0005);
        let read = m.read(5_000, 5);
        assert_eq!(read.direction, Direction::Flat);
    }

    #[test]
    fn unusable_when_span_too_short() {
        let mut m = MomentumTracker::new(60_000, 0.01);
        m.on_mid(0, 100.0);
        m.on_mid(1_000, 101.0);
        let read = m.read(1_000, 20);
        assert!(!read.is_usable);
    }
}
