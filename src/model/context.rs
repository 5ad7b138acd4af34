//! Per-asset context: mark price, oracle price, funding, open interest.

use crate::window::Timestamped;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerpAssetContext {
    pub time_ms: i64,
    pub oi_usd: f64,
    pub funding_rate: f64,
    pub mark_px: f64,
    pub oracle_px: Option<f64>,
}

impl PerpAssetContext {
    /// `(mark - oracle) / oracle * 100`, only defined when an oracle price
    /// is present.
    pub fn basis_pct(&self) -> Option<f64> {
        let oracle = self.oracle_px?;
        if oracle <= 0.0 {
            return None;
        }
        Some((self.mark_px - oracle) / oracle * 100.0)
    }

    /// Malformed-event guard: mark price must be finite and positive.
    pub fn is_valid(&self) -> bool {
        self.mark_px > 0.0 && self.mark_px.is_finite()
    }
}

impl Timestamped for PerpAssetContext {
    fn time_ms(&self) -> i64 {
        self.time_ms
    }
}
