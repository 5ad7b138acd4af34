//! Volatility regime classifier (§4.6). Grounded on `volatility.py`:
//! a percentile rank of the latest 5m ATR reading against its own
//! rolling history.

use crate::window::Capped;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolRegime {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy)]
pub struct VolatilityRead {
    pub atr_1m: f64,
    pub atr_5m: f64,
    pub realized_vol_1m: f64,
    pub realized_vol_5m: f64,
    pub regime: VolRegime,
    pub percentile: f64,
}

pub struct VolatilityTracker {
    atr_1m_history: Capped<f64>,
    atr_5m_history: Capped<f64>,
    low_pct: f64,
    high_pct: f64,
}

impl VolatilityTracker {
    pub fn new(history_window: usize, low_pct: f64, high_pct: f64) -> Self {
        Self {
            atr_1m_history: Capped::new(history_window),
            atr_5m_history: Capped::new(history_window),
            low_pct,
            high_pct,
        }
    }

    pub fn update(&mut self, atr_1m: f64, atr_5m: f64) {
        self.atr_1m_history.push(atr_1m);
        self.atr_5m_history.push(atr_5m);
    }

    pub fn read(&self, realized_vol_1m: f64, realized_vol_5m: f64) -> VolatilityRead {
        let atr_1m = self.atr_1m_history.last().copied().unwrap_or(0.0);
        let atr_5m = self.atr_5m_history.last().copied().unwrap_or(0.0);

        let n = self.atr_5m_history.len();
        let (regime, percentile) = if n < 10 {
            (VolRegime::Normal, 50.0)
        } else {
            let value = atr_5m;
            let leq = self.atr_5m_history.iter().filter(|&&v| v <= value).count();
            let pct = leq as f64 / n as f64 * 100.0;
            let regime = if pct <= self.low_pct {
                VolRegime::Low
            } else if pct >= self.high_pct {
                VolRegime::High
            } else {
                VolRegime::Normal
            };
            (regime, pct)
        };

        VolatilityRead {
            atr_1m,
            atr_5m,
            realized_vol_1m,
            realized_vol_5m,
            regime,
            percentile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_with_insufficient_history() {
        let mut t = VolatilityTracker::new(100, 33.0, 67.0);
        for v in [1.0, 2.0, 3.0] {
            t.update(v, v);
        }
        let read = t.read(0.0, 0.0);
        assert_eq!(read.regime, VolRegime::Normal);
        assert_eq!(read.percentile, 50.0);
    }

    #[test]
    fn classifies_low_and_high_with_full_history() {
        let mut t = VolatilityTracker::new(10, 33.0, 67.0);
        for v in 1..=9 {
            t.update(v as f64, v as f64);
        }
        t.update(1.0, 1.0);
        let read = t.read(0.0, 0.0);
        assert_eq!(read.regime, VolRegime::Low);
    }
}
