//! Outbound per-second snapshot (§6). A flat, `serde`-serializable record
//! assembled once per tick by [`crate::engine::Engine::tick`].
//!
//! Per-component error isolation (§7, §9) is expressed with [`Section`]:
//! a component that has nothing to report serializes as
//! `{"error": "<short message>"}` instead of aborting the whole snapshot.

use crate::error::ComponentError;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Wraps a component's query result so a failed section renders as
/// `{"error": msg}` without preventing its siblings from serializing.
#[derive(Debug, Clone)]
pub enum Section<T> {
    Present(T),
    Missing(ComponentError),
}

impl<T> Section<T> {
    pub fn missing(err: ComponentError) -> Self {
        Self::Missing(err)
    }
}

impl<T> From<Option<T>> for Section<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Section::Present(v),
            None => Section::Missing(ComponentError::insufficient_data("no data yet")),
        }
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Section::Present(value) => value.serialize(serializer),
            Section::Missing(err) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &err.user_message())?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct Stats {
    pub events: u64,
    pub orderbook_updates: u64,
    pub trade_events: u64,
    pub market_context_updates: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Rate {
    pub messages_per_minute: u64,
    pub messages_last_10s: u64,
    pub average_per_minute: f64,
    pub total_messages: u64,
    pub uptime_seconds: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LevelWire {
    pub price: f64,
    pub size: f64,
    pub total_usd: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderbookSection {
    pub mid_price: Option<f64>,
    pub spread_bps: Option<f64>,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub l1_depth_bid: f64,
    pub l2_depth_bid: f64,
    pub l3_depth_bid: f64,
    pub l4_depth_bid: f64,
    pub l5_depth_bid: f64,
    pub l1_depth_ask: f64,
    pub l2_depth_ask: f64,
    pub l3_depth_ask: f64,
    pub l4_depth_ask: f64,
    pub l5_depth_ask: f64,
    pub l1_imbalance: f64,
    pub l5_imbalance: f64,
    pub bids: Vec<LevelWire>,
    pub asks: Vec<LevelWire>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TradeFlowSection {
    pub trade_count: u64,
    pub total_volume: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub buy_ratio: f64,
    pub sell_ratio: f64,
    pub sweep_direction: Option<&'static str>,
    pub largest: f64,
    pub median: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeFlowMulti {
    #[serde(rename = "30s")]
    pub s30: TradeFlowSection,
    #[serde(rename = "5m")]
    pub m5: TradeFlowSection,
    #[serde(rename = "15m")]
    pub m15: TradeFlowSection,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MomentumLeg {
    pub direction: &'static str,
    pub change_percent: f64,
    pub is_usable: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MomentumSection {
    pub short: MomentumLeg,
    pub long: MomentumLeg,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DepthDecaySection {
    pub bid_decay_percent: f64,
    pub ask_decay_percent: f64,
    pub bid_status: &'static str,
    pub ask_status: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LiquidationsSection {
    pub status: &'static str,
    pub long_liquidations: u32,
    pub short_liquidations: u32,
    pub total_long_volume: f64,
    pub total_short_volume: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LiquidationsMulti {
    #[serde(rename = "60s")]
    pub s60: LiquidationsSection,
    #[serde(rename = "5m")]
    pub m5: LiquidationsSection,
    #[serde(rename = "15m")]
    pub m15: LiquidationsSection,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MarketIndicatorsSection {
    pub oi: f64,
    pub oi_trend: &'static str,
    pub oi_velocity: f64,
    pub funding_rate: f64,
    pub funding_trend: &'static str,
    pub basis: Option<f64>,
    pub basis_status: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OiWindowWire {
    pub change_percent: f64,
    pub trend: &'static str,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OiMulti {
    #[serde(rename = "5m")]
    pub m5: OiWindowWire,
    #[serde(rename = "15m")]
    pub m15: OiWindowWire,
}

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct CandleMetricsWire {
    pub return_pct: f64,
    pub volume_vs_avg: f64,
    pub atr: f64,
    pub realized_vol: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CandlesSection {
    #[serde(rename = "1m")]
    pub m1: CandleMetricsWire,
    #[serde(rename = "5m")]
    pub m5: CandleMetricsWire,
    #[serde(rename = "15m")]
    pub m15: CandleMetricsWire,
    #[serde(rename = "1h")]
    pub h1: CandleMetricsWire,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VolatilitySection {
    pub atr_1m: f64,
    pub atr_5m: f64,
    pub realized_vol_1m: f64,
    pub realized_vol_5m: f64,
    pub regime: &'static str,
    pub percentile: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionContextSection {
    pub daily_high: f64,
    pub daily_low: f64,
    pub current_price: f64,
    pub pct_from_low: f64,
    pub pct_from_high: f64,
    pub pct_through_range: f64,
    pub session_vwap: Option<f64>,
    pub distance_from_vwap_bps: Option<f64>,
    pub session_volume_usd: f64,
    pub last_1h_volume_usd: f64,
    pub last_4h_volume_usd: f64,
    pub hyperliquid_24h_volume_usd: f64,
    pub hyperliquid_1h_volume_usd: f64,
    pub hyperliquid_4h_volume_usd: f64,
    pub session_duration_hours: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegimeSection {
    pub trend_regime: &'static str,
    pub trend_strength: f64,
    pub liquidity_regime: &'static str,
    pub market_regime: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SlippageLeg {
    pub avg_fill_price: f64,
    pub slippage_bps: f64,
    pub round_trip_cost_bps: f64,
    pub is_feasible: bool,
    pub liquidity_used_pct: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SlippagePair {
    pub buy: SlippageLeg,
    pub sell: SlippageLeg,
    pub spread_bps: f64,
    pub fee_bps: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlippageSection(pub BTreeMap<String, SlippagePair>);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModuleHealth {
    pub ok: bool,
    pub fresh: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Modules {
    pub orderbook: ModuleHealth,
    pub trades: ModuleHealth,
    pub liquidations: ModuleHealth,
    pub market_indicators: ModuleHealth,
    pub candles: ModuleHealth,
    pub session_context: ModuleHealth,
    pub hyperliquid_volumes: ModuleHealth,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SystemStatusSection {
    pub data_quality_ok: bool,
    pub feed_connected: bool,
    pub modules: Modules,
    pub last_check: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AssetContextWire {
    pub return_1m: Option<f64>,
    pub return_5m: Option<f64>,
    pub return_15m: Option<f64>,
    pub return_1h: Option<f64>,
    pub volatility_regime: &'static str,
    pub trend_regime: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossAssetContextSection {
    pub assets: BTreeMap<String, AssetContextWire>,
    pub market_sentiment: &'static str,
}

/// The full per-second snapshot pushed to downstream consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub stats: Stats,
    pub rate: Rate,
    pub orderbook: Section<OrderbookSection>,
    pub trade_flow: TradeFlowSection,
    pub trade_flow_multi: TradeFlowMulti,
    pub momentum: MomentumSection,
    pub depth_decay: Section<DepthDecaySection>,
    pub liquidations: LiquidationsSection,
    pub liquidations_multi: LiquidationsMulti,
    pub market_indicators: Section<MarketIndicatorsSection>,
    pub oi_multi: Section<OiMulti>,
    pub candles: Section<CandlesSection>,
    pub volatility: VolatilitySection,
    pub session_context: SessionContextSection,
    pub regime: RegimeSection,
    pub slippage: SlippageSection,
    pub crowding: CrowdingSectionOwned,
    pub system_status: SystemStatusSection,
    pub cross_asset_context: CrossAssetContextSection,
}

/// Owned variant of [`CrowdingSection`] (the borrowed form doesn't fit
/// cleanly into a struct returned by value from `tick`).
#[derive(Debug, Clone, Serialize)]
pub struct CrowdingSectionOwned {
    pub crowded_long: bool,
    pub crowded_short: bool,
    pub long_crowding_score: f64,
    pub short_crowding_score: f64,
    pub interpretation: String,
}
