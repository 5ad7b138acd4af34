//! 1-minute candle builder and multi-timeframe aggregator (§4.5).
//!
//! Grounded on `candle_aggregator.py`: a single mutable in-progress
//! candle keyed by minute bucket, rolled into a capped history on bucket
//! transition, with 5m/15m/1h aggregation and per-timeframe ATR/realized
//! vol computed on demand.

use crate::model::Candle;
use crate::window::Capped;

const HISTORY_CAP: usize = 500;
const BUCKET_MS: i64 = 60_000;

pub struct CandleBuilder {
    current: Option<Candle>,
    history: Capped<Candle>,
}

impl Default for CandleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandleBuilder {
    pub fn new() -> Self {
        Self {
            current: None,
            history: Capped::new(HISTORY_CAP),
        }
    }

    pub fn on_trade(&mut self, time_ms: i64, price: f64, size: f64) {
        let bucket = (time_ms / BUCKET_MS) * BUCKET_MS;
        match &mut self.current {
            Some(c) if c.bucket_open_ms == bucket => {
                c.absorb(price, size);
            }
            Some(c) => {
                self.history.push(*c);
                self.current = Some(Candle::open_at(bucket, price, size));
            }
            None => {
                self.current = Some(Candle::open_at(bucket, price, size));
            }
        }
    }

    /// Closed 1m history plus the in-progress candle, most recent last.
    /// Used for both the raw `1m` timeframe and as the source series for
    /// higher-timeframe aggregation.
    pub fn all_candles(&self) -> Vec<Candle> {
        let mut out: Vec<Candle> = self.history.iter().copied().collect();
        if let Some(c) = self.current {
            out.push(c);
        }
        out
    }

    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Whether any trade has built at least one candle (used by the
    /// engine's `system_status.candles` freshness check).
    pub fn has_data(&self) -> bool {
        self.current.is_some() || !self.history.is_empty()
    }

    /// Seed closed-candle history from a backfill (§10.2), before any live
    /// trade has built a candle of its own. A no-op once live trades have
    /// started accumulating, so a late-arriving backfill response never
    /// clobbers state the stream has already built.
    pub fn seed_history(&mut self, candles: Vec<Candle>) {
        if self.has_data() {
            return;
        }
        for c in candles {
            self.history.push(c);
        }
    }
}

/// Group a 1m candle series into `tf_minutes`-wide buckets. Grouping key
/// is `floor(bucket_ms/60000 / M) · M` minutes, matching `candle_aggregator.py`.
pub fn aggregate(one_minute: &[Candle], tf_minutes: i64) -> Vec<Candle> {
    if tf_minutes <= 1 {
        return one_minute.to_vec();
    }
    let group_ms = tf_minutes * BUCKET_MS;
    let mut out: Vec<Candle> = Vec::new();

    for candle in one_minute {
        let group_key = (candle.bucket_open_ms / group_ms) * group_ms;
        match out.last_mut() {
            Some(last) if (last.bucket_open_ms / group_ms) * group_ms == group_key => {
                last.high = last.high.max(candle.high);
                last.low = last.low.min(candle.low);
                last.close = candle.close;
                last.volume_base += candle.volume_base;
                last.n_trades += candle.n_trades;
            }
            _ => out.push(Candle {
                bucket_open_ms: group_key,
                ..*candle
            }),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TfMetrics {
    pub return_pct: f64,
    pub volume_vs_avg: f64,
    pub atr: f64,
    pub realized_vol: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

/// True range per candle; the first candle in the series has no previous
/// close, so its TR is simply `high - low`.
fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut prev_close: Option<f64> = None;
    for c in candles {
        out.push(c.true_range(prev_close));
        prev_close = Some(c.close);
    }
    out
}

/// Mean of the last 14 true ranges (or fewer if unavailable); 0 with
/// fewer than 2 candles, per the graceful-degradation boundary case.
fn atr14(candles: &[Candle]) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }
    let trs = true_ranges(candles);
    let take = trs.len().min(14);
    let recent = &trs[trs.len() - take..];
    recent.iter().sum::<f64>() / recent.len() as f64
}

/// Sample (Bessel-corrected) std-dev of the last 20 per-period returns;
/// 0 with fewer than 2 candles.
fn realized_vol(candles: &[Candle]) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = candles.iter().map(|c| c.return_pct()).collect();
    let take = returns.len().min(20);
    let recent = &returns[returns.len() - take..];
    let n = recent.len() as f64;
    let mean = recent.iter().sum::<f64>() / n;
    if recent.len() < 2 {
        return 0.0;
    }
    let variance = recent.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Metrics over the last 100 candles of a given timeframe series.
pub fn metrics_for(series: &[Candle]) -> Option<TfMetrics> {
    let latest = series.last()?;
    let window = &series[series.len().saturating_sub(100)..];

    let mean_volume = window.iter().map(|c| c.volume_base).sum::<f64>() / window.len() as f64;
    let volume_vs_avg = if mean_volume > 0.0 {
        latest.volume_base / mean_volume
    } else {
        1.0
    };

    Some(TfMetrics {
        return_pct: latest.return_pct(),
        volume_vs_avg,
        atr: atr14(window),
        realized_vol: realized_vol(window),
        close: latest.close,
        high: latest.high,
        low: latest.low,
        volume: latest.volume_base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_rolls_candle_on_bucket_transition() {
        let mut b = CandleBuilder::new();
        b.on_trade(60_000, 10.0, 1.0);
        b.on_trade(90_000, 12.0, 2.0);
        b.on_trade(119_999, 11.0, 1.0);

        let open = b.current().unwrap();
        assert_eq!(open.bucket_open_ms, 60_000);
        assert_eq!(open.open, 10.0);
        assert_eq!(open.high, 12.0);
        assert_eq!(open.low, 10.0);
        assert_eq!(open.close, 11.0);
        assert_eq!(open.volume_base, 4.0);
        assert_eq!(open.n_trades, 3);

        b.on_trade(120_000, 13.0, 1.0);
        let current = b.current().unwrap();
        assert_eq!(current.bucket_open_ms, 120_000);
        assert_eq!(current.open, 13.0);
        assert_eq!(current.high, 13.0);

        let history = b.all_candles();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].close, 11.0);
    }

    #[test]
    fn aggregation_groups_by_timeframe() {
        let candles = vec![
            Candle::open_at(0, 10.0, 1.0),
            Candle { bucket_open_ms: 60_000, open: 11.0, high: 13.0, low: 9.0, close: 12.0, volume_base: 2.0, n_trades: 1 },
            Candle { bucket_open_ms: 120_000, open: 12.0, high: 12.0, low: 8.0, close: 9.0, volume_base: 3.0, n_trades: 1 },
        ];
        let agg = aggregate(&candles, 5);
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].open, 10.0);
        assert_eq!(agg[0].close, 9.0);
        assert_eq!(agg[0].high, 13.0);
        assert_eq!(agg[0].low, 8.0);
        assert_eq!(agg[0].volume_base, 6.0);
    }

    #[test]
    fn atr_zero_below_two_candles() {
        let candles = vec![Candle::open_at(0, 10.0, 1.0)];
        let m = metrics_for(&candles).unwrap();
        assert_eq!(m.atr, 0.0);
        assert_eq!(m.realized_vol, 0.0);
    }
}
