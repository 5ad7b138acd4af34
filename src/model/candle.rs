//! OHLCV candle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub bucket_open_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume_base: f64,
    pub n_trades: u64,
}

impl Candle {
    pub fn open_at(bucket_open_ms: i64, price: f64, size: f64) -> Self {
        Self {
            bucket_open_ms,
            open: price,
            high: price,
            low: price,
            close: price,
            volume_base: size,
            n_trades: 1,
        }
    }

    pub fn absorb(&mut self, price: f64, size: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume_base += size;
        self.n_trades += 1;
    }

    pub fn return_pct(&self) -> f64 {
        if self.open == 0.0 {
            0.0
        } else {
            (self.close - self.open) / self.open * 100.0
        }
    }

    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => (self.high - self.low)
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.high - self.low,
        }
    }
}
