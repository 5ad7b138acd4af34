//! Historical backfill and volume-polling clients (§10.2, outside the
//! kernel). Both traits are infallible at the call site: a failure is
//! logged and leaves prior engine state untouched — the session degrades
//! to "no backfill yet" rather than failing to start (`Transient external
//! failure`, §7).

use tracing::warn;

use crate::engine::{Engine, VolumeSnapshot};
use crate::model::Candle;

/// Today's high/low/last observed before any live trade has arrived.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyRange {
    pub day_high: f64,
    pub day_low: f64,
    pub current_price: f64,
}

/// "Fetch the last N 1-minute candles" / "fetch today's high/low/last" —
/// called once at session startup to seed the candle aggregator and
/// session tracker before live events arrive, matching the source's
/// `preload_historical_data` hook.
pub trait CandleBackfill {
    async fn recent_candles(&self, symbol: &str, limit: usize) -> anyhow::Result<Vec<Candle>>;
    async fn daily_range(&self, symbol: &str) -> anyhow::Result<DailyRange>;
}

/// Refreshes the three `hyperliquid_*_volume_usd` scalars on its own
/// interval (§5's volume-updater sidecar).
pub trait VolumeSource {
    async fn fetch_volumes(&self, symbol: &str) -> anyhow::Result<VolumeSnapshot>;
}

/// Polled by the cross-asset sidecar (§5, §4.13) for each sibling symbol's
/// latest price; runs in parallel to the primary symbol's event stream and
/// never touches the primary engine's state directly.
pub trait CrossAssetSource {
    async fn latest_price(&self, symbol: &str) -> anyhow::Result<f64>;
}

/// Run both backfill calls and apply whatever succeeds to `engine`. Each
/// call is independent: a failed daily-range fetch doesn't prevent candle
/// history from seeding, and vice versa.
pub async fn seed_engine(engine: &mut Engine, backfill: &impl CandleBackfill, symbol: &str, now_ms: i64) {
    match backfill.recent_candles(symbol, 500).await {
        Ok(candles) if !candles.is_empty() => engine.seed_candles(candles),
        Ok(_) => {}
        Err(e) => warn!(symbol, error = %e, "candle backfill failed, starting with empty history"),
    }

    match backfill.daily_range(symbol).await {
        Ok(range) if range.current_price > 0.0 => {
            engine.seed_session(now_ms, range.day_high, range.day_low, range.current_price);
        }
        Ok(_) => {}
        Err(e) => warn!(symbol, error = %e, "daily range backfill failed, session will seed from live trades"),
    }
}

#[derive(Debug, serde::Deserialize)]
struct RestCandle {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    n: u64,
}

impl From<RestCandle> for Candle {
    fn from(c: RestCandle) -> Self {
        Candle {
            bucket_open_ms: c.t,
            open: c.o,
            high: c.h,
            low: c.l,
            close: c.c,
            volume_base: c.v,
            n_trades: c.n,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct RestDailyStats {
    high: f64,
    low: f64,
    last: f64,
}

#[derive(Debug, serde::Deserialize)]
struct RestVolumeStats {
    #[serde(rename = "volume24h")]
    volume_24h: f64,
    #[serde(rename = "volume1h")]
    volume_1h: f64,
    #[serde(rename = "volume4h")]
    volume_4h: f64,
}

/// Reference REST client: a thin `reqwest` wrapper, optionally paced by a
/// `governor` rate limiter (`rate_limited_backfill`) the way this
/// codebase's credentialed REST clients already throttle outbound calls.
pub struct RestBackfillClient {
    http: reqwest::Client,
    base_url: String,
    #[cfg(feature = "rate_limited_backfill")]
    limiter: governor::DefaultDirectRateLimiter,
}

impl RestBackfillClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            #[cfg(feature = "rate_limited_backfill")]
            limiter: governor::RateLimiter::direct(governor::Quota::per_second(
                std::num::NonZeroU32::new(5).unwrap(),
            )),
        }
    }

    #[cfg(feature = "rate_limited_backfill")]
    async fn throttle(&self) {
        self.limiter.until_ready().await;
    }

    #[cfg(not(feature = "rate_limited_backfill"))]
    async fn throttle(&self) {}
}

impl CandleBackfill for RestBackfillClient {
    async fn recent_candles(&self, symbol: &str, limit: usize) -> anyhow::Result<Vec<Candle>> {
        self.throttle().await;
        let url = format!("{}/candles?symbol={}&interval=1m&limit={}", self.base_url, symbol, limit);
        let raw: Vec<RestCandle> = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(raw.into_iter().map(Candle::from).collect())
    }

    async fn daily_range(&self, symbol: &str) -> anyhow::Result<DailyRange> {
        self.throttle().await;
        let url = format!("{}/ticker/24hr?symbol={}", self.base_url, symbol);
        let raw: RestDailyStats = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(DailyRange { day_high: raw.high, day_low: raw.low, current_price: raw.last })
    }
}

impl VolumeSource for RestBackfillClient {
    async fn fetch_volumes(&self, symbol: &str) -> anyhow::Result<VolumeSnapshot> {
        self.throttle().await;
        let url = format!("{}/ticker/volume?symbol={}", self.base_url, symbol);
        let raw: RestVolumeStats = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(VolumeSnapshot {
            last_24h_usd: raw.volume_24h,
            last_1h_usd: raw.volume_1h,
            last_4h_usd: raw.volume_4h,
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct RestPrice {
    price: f64,
}

impl CrossAssetSource for RestBackfillClient {
    async fn latest_price(&self, symbol: &str) -> anyhow::Result<f64> {
        self.throttle().await;
        let url = format!("{}/ticker/price?symbol={}", self.base_url, symbol);
        let raw: RestPrice = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(raw.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    struct FakeBackfill {
        candles: Vec<Candle>,
        range: DailyRange,
    }

    impl CandleBackfill for FakeBackfill {
        async fn recent_candles(&self, _symbol: &str, _limit: usize) -> anyhow::Result<Vec<Candle>> {
            Ok(self.candles.clone())
        }

        async fn daily_range(&self, _symbol: &str) -> anyhow::Result<DailyRange> {
            Ok(self.range)
        }
    }

    #[tokio::test]
    async fn seed_engine_applies_candles_and_range() {
        let mut engine = Engine::new(EngineConfig::default());
        let backfill = FakeBackfill {
            candles: vec![Candle::open_at(0, 10.0, 1.0)],
            range: DailyRange { day_high: 12.0, day_low: 9.0, current_price: 10.0 },
        };
        seed_engine(&mut engine, &backfill, "SOL", 0).await;
        let snap = engine.tick(0, None, None);
        assert_eq!(snap.session_context.daily_high, 12.0);
        assert_eq!(snap.session_context.daily_low, 9.0);
    }
}
