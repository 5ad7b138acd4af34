//! Consolidated analytics configuration.
//!
//! The original tracker-by-tracker construction scattered thresholds across
//! each component's constructor; this collects every tunable into one struct
//! loaded once via [`EngineConfig::from_env`], in the same
//! `std::env::var(..).unwrap_or_else(..)` idiom as [`crate::config::HttpConfig`].

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub symbol: String,
    pub snapshot_hz: f64,
    pub log_filter: String,
    pub fanout_bind_addr: String,

    // Session / VWAP
    pub session_duration_s: i64,
    pub vwap_window_s: i64,

    // Trade flow
    pub trade_flow_default_window_s: i64,
    pub trade_max_history_s: i64,
    pub bucket_schedule_usd: Vec<(f64, Option<f64>)>,
    pub sweep_ratio_threshold: f64,

    // Depth decay
    pub depth_decay_window_s: i64,

    // Momentum
    pub momentum_short_window_s: i64,
    pub momentum_long_window_s: i64,
    pub momentum_flat_threshold_pct: f64,

    // Liquidations
    pub large_trade_threshold_usd: f64,
    pub cascade_window_ms: i64,
    pub cascade_min_count: usize,
    pub liq_max_history_s: i64,

    // Volatility
    pub vol_low_pct: f64,
    pub vol_high_pct: f64,
    pub vol_history_window: usize,

    // Market context
    pub oi_window_s: i64,
    pub oi_flat_threshold_pct: f64,
    pub funding_flat_threshold: f64,
    pub basis_spike_threshold_pct: f64,
    pub context_max_history_s: i64,
    pub funding_periods_per_day: f64,

    // Regime
    pub trend_threshold_pct: f64,
    pub strong_trend_threshold_pct: f64,
    pub range_threshold_pct: f64,
    pub tight_spread_bps: f64,
    pub wide_spread_bps: f64,
    pub deep_book_usd: f64,
    pub thin_book_usd: f64,
    pub elevated_liq_count: u32,
    pub high_liq_count: u32,

    // Crowding
    pub crowding_threshold: f64,
    pub crowding_oi_velocity_threshold_pct: f64,
    pub crowding_funding_bullish_threshold: f64,
    pub crowding_basis_rich_threshold_pct: f64,

    // Slippage
    pub taker_fee_bps: f64,
    pub slippage_sizes_usd: Vec<f64>,

    // Cross-asset
    pub cross_asset_symbols: Vec<String>,
    pub cross_asset_low_vol_threshold_pct: f64,
    pub cross_asset_high_vol_threshold_pct: f64,
    pub cross_asset_trend_threshold_pct: f64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_or_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "SOL".to_string(),
            snapshot_hz: 1.0,
            log_filter: "info".to_string(),
            fanout_bind_addr: "0.0.0.0:8088".to_string(),

            session_duration_s: 86_400,
            vwap_window_s: 86_400,

            trade_flow_default_window_s: 30,
            trade_max_history_s: 900,
            bucket_schedule_usd: vec![
                (0.0, Some(1_000.0)),
                (1_000.0, Some(5_000.0)),
                (5_000.0, Some(10_000.0)),
                (10_000.0, Some(50_000.0)),
                (50_000.0, Some(250_000.0)),
                (250_000.0, None),
            ],
            sweep_ratio_threshold: 0.65,

            depth_decay_window_s: 15,

            momentum_short_window_s: 5,
            momentum_long_window_s: 20,
            momentum_flat_threshold_pct: 0.01,

            large_trade_threshold_usd: 10_000.0,
            cascade_window_ms: 5_000,
            cascade_min_count: 5,
            liq_max_history_s: 900,

            vol_low_pct: 33.0,
            vol_high_pct: 67.0,
            vol_history_window: 100,

            oi_window_s: 300,
            oi_flat_threshold_pct: 0.5,
            funding_flat_threshold: 1e-4,
            basis_spike_threshold_pct: 0.1,
            context_max_history_s: 900,
            funding_periods_per_day: 3.0,

            trend_threshold_pct: 0.1,
            strong_trend_threshold_pct: 0.5,
            range_threshold_pct: 0.05,
            tight_spread_bps: 5.0,
            wide_spread_bps: 20.0,
            deep_book_usd: 100_000.0,
            thin_book_usd: 20_000.0,
            elevated_liq_count: 3,
            high_liq_count: 10,

            crowding_threshold: 0.6,
            crowding_oi_velocity_threshold_pct: 0.5,
            crowding_funding_bullish_threshold: 0.0001,
            crowding_basis_rich_threshold_pct: 0.1,

            taker_fee_bps: 2.8,
            slippage_sizes_usd: vec![500.0, 1_000.0, 5_000.0],

            cross_asset_symbols: vec!["BTC".to_string(), "ETH".to_string()],
            cross_asset_low_vol_threshold_pct: 0.5,
            cross_asset_high_vol_threshold_pct: 2.0,
            cross_asset_trend_threshold_pct: 0.3,
        }
    }
}

impl EngineConfig {
    /// Load from environment, falling back to the defaults above for
    /// anything unset. Every field is independently overridable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            symbol: env_or_string("ENGINE_SYMBOL", &defaults.symbol),
            snapshot_hz: env_or("ENGINE_SNAPSHOT_HZ", defaults.snapshot_hz),
            log_filter: env_or_string("RUST_LOG", &defaults.log_filter),
            fanout_bind_addr: env_or_string("FANOUT_BIND_ADDR", &defaults.fanout_bind_addr),

            session_duration_s: env_or("SESSION_DURATION_S", defaults.session_duration_s),
            vwap_window_s: env_or("VWAP_WINDOW_S", defaults.vwap_window_s),

            trade_flow_default_window_s: env_or(
                "TRADE_FLOW_DEFAULT_WINDOW_S",
                defaults.trade_flow_default_window_s,
            ),
            trade_max_history_s: env_or("TRADE_MAX_HISTORY_S", defaults.trade_max_history_s),
            sweep_ratio_threshold: env_or(
                "SWEEP_RATIO_THRESHOLD",
                defaults.sweep_ratio_threshold,
            ),

            depth_decay_window_s: env_or("DEPTH_DECAY_WINDOW_S", defaults.depth_decay_window_s),

            momentum_short_window_s: env_or(
                "MOMENTUM_SHORT_WINDOW_S",
                defaults.momentum_short_window_s,
            ),
            momentum_long_window_s: env_or(
                "MOMENTUM_LONG_WINDOW_S",
                defaults.momentum_long_window_s,
            ),
            momentum_flat_threshold_pct: env_or(
                "MOMENTUM_FLAT_THRESHOLD_PCT",
                defaults.momentum_flat_threshold_pct,
            ),

            large_trade_threshold_usd: env_or(
                "LARGE_TRADE_THRESHOLD_USD",
                defaults.large_trade_threshold_usd,
            ),
            cascade_window_ms: env_or("CASCADE_WINDOW_MS", defaults.cascade_window_ms),
            cascade_min_count: env_or("CASCADE_MIN_COUNT", defaults.cascade_min_count),
            liq_max_history_s: env_or("LIQ_MAX_HISTORY_S", defaults.liq_max_history_s),

            vol_low_pct: env_or("VOL_LOW_PCT", defaults.vol_low_pct),
            vol_high_pct: env_or("VOL_HIGH_PCT", defaults.vol_high_pct),
            vol_history_window: env_or("VOL_HISTORY_WINDOW", defaults.vol_history_window),

            oi_window_s: env_or("OI_WINDOW_S", defaults.oi_window_s),
            oi_flat_threshold_pct: env_or(
                "OI_FLAT_THRESHOLD_PCT",
                defaults.oi_flat_threshold_pct,
            ),
            funding_flat_threshold: env_or(
                "FUNDING_FLAT_THRESHOLD",
                defaults.funding_flat_threshold,
            ),
            basis_spike_threshold_pct: env_or(
                "BASIS_SPIKE_THRESHOLD_PCT",
                defaults.basis_spike_threshold_pct,
            ),
            context_max_history_s: env_or(
                "CONTEXT_MAX_HISTORY_S",
                defaults.context_max_history_s,
            ),
            funding_periods_per_day: env_or(
                "FUNDING_PERIODS_PER_DAY",
                defaults.funding_periods_per_day,
            ),

            trend_threshold_pct: env_or("TREND_THRESHOLD_PCT", defaults.trend_threshold_pct),
            strong_trend_threshold_pct: env_or(
                "STRONG_TREND_THRESHOLD_PCT",
                defaults.strong_trend_threshold_pct,
            ),
            range_threshold_pct: env_or("RANGE_THRESHOLD_PCT", defaults.range_threshold_pct),
            tight_spread_bps: env_or("TIGHT_SPREAD_BPS", defaults.tight_spread_bps),
            wide_spread_bps: env_or("WIDE_SPREAD_BPS", defaults.wide_spread_bps),
            deep_book_usd: env_or("DEEP_BOOK_USD", defaults.deep_book_usd),
            thin_book_usd: env_or("THIN_BOOK_USD", defaults.thin_book_usd),
            elevated_liq_count: env_or("ELEVATED_LIQ_COUNT", defaults.elevated_liq_count),
            high_liq_count: env_or("HIGH_LIQ_COUNT", defaults.high_liq_count),

            crowding_threshold: env_or("CROWDING_THRESHOLD", defaults.crowding_threshold),
            crowding_oi_velocity_threshold_pct: env_or(
                "CROWDING_OI_VELOCITY_THRESHOLD_PCT",
                defaults.crowding_oi_velocity_threshold_pct,
            ),
            crowding_funding_bullish_threshold: env_or(
                "CROWDING_FUNDING_BULLISH_THRESHOLD",
                defaults.crowding_funding_bullish_threshold,
            ),
            crowding_basis_rich_threshold_pct: env_or(
                "CROWDING_BASIS_RICH_THRESHOLD_PCT",
                defaults.crowding_basis_rich_threshold_pct,
            ),

            taker_fee_bps: env_or("TAKER_FEE_BPS", defaults.taker_fee_bps),

            bucket_schedule_usd: defaults.bucket_schedule_usd.clone(),
            slippage_sizes_usd: defaults.slippage_sizes_usd.clone(),
            cross_asset_symbols: defaults.cross_asset_symbols.clone(),
            cross_asset_low_vol_threshold_pct: env_or(
                "CROSS_ASSET_LOW_VOL_THRESHOLD_PCT",
                defaults.cross_asset_low_vol_threshold_pct,
            ),
            cross_asset_high_vol_threshold_pct: env_or(
                "CROSS_ASSET_HIGH_VOL_THRESHOLD_PCT",
                defaults.cross_asset_high_vol_threshold_pct,
            ),
            cross_asset_trend_threshold_pct: env_or(
                "CROSS_ASSET_TREND_THRESHOLD_PCT",
                defaults.cross_asset_trend_threshold_pct,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.large_trade_threshold_usd, 10_000.0);
        assert_eq!(cfg.cascade_min_count, 5);
        assert_eq!(cfg.high_liq_count, 10);
        assert_eq!(cfg.momentum_flat_threshold_pct, 0.01);
    }
}
