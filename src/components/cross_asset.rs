//! Cross-asset sentiment sidecar (§4.13). Grounded on
//! `cross_asset_context.py`: a capped rolling price history per sibling
//! asset, multi-lookback returns, and an aggregate sentiment read.
//!
//! This tracker is driven by the cross-asset sidecar task (§5), not by
//! the primary symbol's event stream; the engine reads its last-known
//! snapshot through an atomic cell at assembly time (§9's cross-task
//! hand-off redesign flag) and never blocks on it.

use crate::window::{Timestamped, Window};
use std::collections::BTreeMap;

const HISTORY_RETENTION_MS: i64 = 3_600_000; // ~1h at ≥1s cadence

#[derive(Debug, Clone, Copy)]
struct PricePoint {
    time_ms: i64,
    price: f64,
}

impl Timestamped for PricePoint {
    fn time_ms(&self) -> i64 {
        self.time_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolRegime {
    Low,
    Normal,
    High,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendRegime {
    Up,
    Down,
    Range,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
    Mixed,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssetReturns {
    pub return_1m: Option<f64>,
    pub return_5m: Option<f64>,
    pub return_15m: Option<f64>,
    pub return_1h: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct AssetContextRead {
    pub returns: AssetReturns,
    pub volatility_regime: VolRegime,
    pub trend_regime: TrendRegime,
}

pub struct CrossAssetConfig {
    pub low_vol_threshold_pct: f64,
    pub high_vol_threshold_pct: f64,
    pub trend_threshold_pct: f64,
}

struct AssetTracker {
    prices: Window<PricePoint>,
}

impl AssetTracker {
    fn new() -> Self {
        Self {
            prices: Window::new(HISTORY_RETENTION_MS),
        }
    }

    fn return_over(&self, now_ms: i64, window_ms: i64) -> Option<f64> {
        let oldest = self.prices.since(now_ms, window_ms).next()?;
        let latest = self.prices.back()?;
        if oldest.price == 0.0 {
            return None;
        }
        Some((latest.price - oldest.price) / oldest.price * 100.0)
    }
}

/// Tracks a fixed set of sibling assets independently of the primary
/// symbol's event stream.
pub struct CrossAssetTracker {
    assets: BTreeMap<String, AssetTracker>,
    cfg: CrossAssetConfig,
}

impl CrossAssetTracker {
    pub fn new(symbols: &[String], cfg: CrossAssetConfig) -> Self {
        let assets = symbols
            .iter()
            .map(|s| (s.clone(), AssetTracker::new()))
            .collect();
        Self { assets, cfg }
    }

    /// Called by the sidecar poll loop for each tracked symbol.
    pub fn on_price(&mut self, symbol: &str, now_ms: i64, price: f64) {
        if let Some(tracker) = self.assets.get_mut(symbol) {
            tracker.prices.push(now_ms, PricePoint { time_ms: now_ms, price });
        }
    }

    fn asset_read(&self, tracker: &AssetTracker, now_ms: i64) -> AssetContextRead {
        let returns = AssetReturns {
            return_1m: tracker.return_over(now_ms, 60_000),
            return_5m: tracker.return_over(now_ms, 300_000),
            return_15m: tracker.return_over(now_ms, 900_000),
            return_1h: tracker.return_over(now_ms, 3_600_000),
        };

        let volatility_regime = match returns.return_1h {
            None => VolRegime::Unknown,
            Some(r) if r.abs() >= self.cfg.high_vol_threshold_pct => VolRegime::High,
            Some(r) if r.abs() <= self.cfg.low_vol_threshold_pct => VolRegime::Low,
            Some(_) => VolRegime::Normal,
        };

        let trend_regime = match returns.return_15m {
            None => TrendRegime::Unknown,
            Some(r15) => {
                let confirmed_up = returns.return_5m.map(|r5| r5 >= 0.0).unwrap_or(true);
                let confirmed_down = returns.return_5m.map(|r5| r5 <= 0.0).unwrap_or(true);
                if r15 > self.cfg.trend_threshold_pct && confirmed_up {
                    TrendRegime::Up
                } else if r15 < -self.cfg.trend_threshold_pct && confirmed_down {
                    TrendRegime::Down
                } else {
                    TrendRegime::Range
                }
            }
        };

        AssetContextRead {
            returns,
            volatility_regime,
            trend_regime,
        }
    }

    /// One read per tracked asset, plus the aggregate market sentiment.
    pub fn read_all(&self, now_ms: i64) -> (BTreeMap<String, AssetContextRead>, MarketSentiment) {
        let reads: BTreeMap<String, AssetContextRead> = self
            .assets
            .iter()
            .map(|(symbol, tracker)| (symbol.clone(), self.asset_read(tracker, now_ms)))
            .collect();

        let sentiment = if reads.is_empty() {
            MarketSentiment::Unknown
        } else if reads.values().any(|r| r.trend_regime == TrendRegime::Unknown) {
            MarketSentiment::Unknown
        } else if reads.values().all(|r| r.trend_regime == TrendRegime::Up) {
            MarketSentiment::Bullish
        } else if reads.values().all(|r| r.trend_regime == TrendRegime::Down) {
            MarketSentiment::Bearish
        } else if reads.values().all(|r| r.trend_regime == TrendRegime::Range) {
            MarketSentiment::Neutral
        } else {
            MarketSentiment::Mixed
        };

        (reads, sentiment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CrossAssetConfig {
        CrossAssetConfig {
            low_vol_threshold_pct: 0.5,
            high_vol_threshold_pct: 2.0,
            trend_threshold_pct: 0.3,
        }
    }

    fn symbols() -> Vec<String> {
        vec!["BTC".to_string(), "ETH".to_string()]
    }

    #[test]
    fn unknown_before_any_history() {
        let t = CrossAssetTracker::new(&symbols(), cfg());
        let (reads, sentiment) = t.read_all(0);
        assert_eq!(reads["BTC"].trend_regime, TrendRegime::Unknown);
        assert_eq!(sentiment, MarketSentiment::Unknown);
    }

    #[test]
    fn bullish_when_all_assets_trend_up() {
        let mut t = CrossAssetTracker::new(&symbols(), cfg());
        for (sym, start) in [("BTC", 100.0), ("ETH", 10.0)] {
            t.on_price(sym, 0, start);
            t.on_price(sym, 900_000, start * 1.01);
        }
        let (reads, sentiment) = t.read_all(900_000);
        assert_eq!(reads["BTC"].trend_regime, TrendRegime::Up);
        assert_eq!(sentiment, MarketSentiment::Bullish);
    }

    #[test]
    fn mixed_when_assets_disagree() {
        let mut t = CrossAssetTracker::new(&symbols(), cfg());
        t.on_price("BTC", 0, 100.0);
        t.on_price("BTC", 900_000, 101.0);
        t.on_price("ETH", 0, 10.0);
        t.on_price("ETH", 900_000, 9.9);
        let (_, sentiment) = t.read_all(900_000);
        assert_eq!(sentiment, MarketSentiment::Mixed);
    }
}
