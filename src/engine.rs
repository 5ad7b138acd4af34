//! Analytics orchestrator (§4.12). Owns one instance of every per-symbol
//! component tracker and assembles the per-second snapshot.
//!
//! Grounded on `api_server.py`'s `AnalyticsEngine`: construction from a
//! single config object, an exhaustive dispatch over the tagged event sum
//! type in place of the original's `type(event).__name__` branch, and a
//! fixed-order snapshot assembly (`get_analytics_data`) reused section for
//! section.

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::prelude::ToPrimitive;
use tracing::warn;

use crate::components::candles::{self, CandleBuilder};
use crate::components::crowding::{self, CrowdingConfig, CrowdingInputs};
use crate::components::cross_asset::{AssetContextRead, MarketSentiment};
use crate::components::depth_decay::{DecayStatus, DepthDecayTracker};
use crate::components::liquidations::{LiqStatus, LiquidationDetector, LiquidationRead};
use crate::components::market_context::{BasisStatus, MarketContextTracker, OiWindowRead, Trend};
use crate::components::momentum::{Direction, MomentumTracker};
use crate::components::orderbook_model::{self, Side, SlippageEstimate};
use crate::components::regime::{self, LiquidityRegime, MarketRegime, RegimeConfig, RegimeInputs, TrendRegime};
use crate::components::session::SessionTracker;
use crate::components::trade_flow::{TradeFlowStats, TradeFlowTracker};
use crate::components::volatility::{VolRegime, VolatilityTracker};
use crate::config::EngineConfig;
use crate::error::{ComponentError, IngestError};
use crate::model::{Candle, MarketEvent, OrderBookLevel, OrderBookSnapshot, Trade};
use crate::snapshot::{
    AssetContextWire, CandleMetricsWire, CandlesSection, CrossAssetContextSection, CrowdingSectionOwned,
    DepthDecaySection, LevelWire, LiquidationsMulti, LiquidationsSection, MarketIndicatorsSection,
    ModuleHealth, Modules, MomentumLeg, MomentumSection, OiMulti, OiWindowWire, OrderbookSection, Rate,
    RegimeSection, Section, SessionContextSection, SlippageLeg, SlippagePair, SlippageSection, Snapshot,
    Stats, SystemStatusSection, TradeFlowMulti, TradeFlowSection, VolatilitySection,
};

/// Latest known rolling venue-volume figures, refreshed by the backfill
/// sidecar (§10.2). `Default` (all zero) until the sidecar's first poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeSnapshot {
    pub last_24h_usd: f64,
    pub last_1h_usd: f64,
    pub last_4h_usd: f64,
}

/// One tick's worth of cross-asset sidecar output, read through an atomic
/// cell by the session's emit task (§5, §9).
pub type CrossAssetRead = (BTreeMap<String, AssetContextRead>, MarketSentiment);

/// Owns every component tracker for a single symbol and turns the event
/// stream into a per-second snapshot.
pub struct Engine {
    config: EngineConfig,

    book: Option<OrderBookSnapshot>,
    last_book_update_ms: Option<i64>,

    trade_flow: TradeFlowTracker,
    momentum: MomentumTracker,
    depth_decay: DepthDecayTracker,
    candles: CandleBuilder,
    volatility: VolatilityTracker,
    session: SessionTracker,
    market_context: MarketContextTracker,
    liquidations: LiquidationDetector,

    stats: Stats,
    total_messages: u64,
    ingest_errors: u64,
    recent_event_times: VecDeque<i64>,
    started_at_ms: Option<i64>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let trade_flow = TradeFlowTracker::new(
            config.trade_max_history_s,
            config.bucket_schedule_usd.clone(),
            config.sweep_ratio_threshold,
        );
        let momentum_retention_ms =
            (config.momentum_long_window_s.max(config.momentum_short_window_s) * 2 * 1000).max(60_000);
        let momentum = MomentumTracker::new(momentum_retention_ms, config.momentum_flat_threshold_pct);
        let depth_decay = DepthDecayTracker::new(config.depth_decay_window_s);
        let candles = CandleBuilder::new();
        let volatility = VolatilityTracker::new(config.vol_history_window, config.vol_low_pct, config.vol_high_pct);
        let session = SessionTracker::new(config.session_duration_s, config.vwap_window_s);
        let market_context = MarketContextTracker::new(
            config.context_max_history_s,
            config.oi_flat_threshold_pct,
            config.funding_flat_threshold,
            config.basis_spike_threshold_pct,
            config.funding_periods_per_day,
        );
        let liquidations = LiquidationDetector::new(
            config.large_trade_threshold_usd,
            config.cascade_window_ms,
            config.cascade_min_count,
            config.liq_max_history_s,
        );

        Self {
            config,
            book: None,
            last_book_update_ms: None,
            trade_flow,
            momentum,
            depth_decay,
            candles,
            volatility,
            session,
            market_context,
            liquidations,
            stats: Stats::default(),
            total_messages: 0,
            ingest_errors: 0,
            recent_event_times: VecDeque::new(),
            started_at_ms: None,
        }
    }

    pub fn ingest_error_count(&self) -> u64 {
        self.ingest_errors
    }

    /// Seed closed-candle history from a startup backfill (§10.2), before
    /// any live trade has built a candle of its own.
    pub fn seed_candles(&mut self, candles: Vec<Candle>) {
        self.candles.seed_history(candles);
    }

    /// Seed today's high/low/last price from a startup backfill (§10.2),
    /// before any live order-book update arrives.
    pub fn seed_session(&mut self, now_ms: i64, day_high: f64, day_low: f64, current_price: f64) {
        self.session.seed(now_ms, day_high, day_low, current_price);
    }

    /// Validate and dispatch one inbound event. A malformed event is
    /// rejected at this boundary — dropped, counted, logged — without
    /// touching any component state (§7).
    pub fn ingest(&mut self, now_ms: i64, event: MarketEvent) -> Result<(), IngestError> {
        if let Err(err) = validate(&event) {
            self.ingest_errors += 1;
            warn!(error = %err, "dropping malformed event");
            return Err(err);
        }

        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(now_ms);
        }
        self.stats.events += 1;
        self.total_messages += 1;
        self.recent_event_times.push_back(now_ms);
        let cutoff = now_ms - 60_000;
        while matches!(self.recent_event_times.front(), Some(t) if *t < cutoff) {
            self.recent_event_times.pop_front();
        }

        self.dispatch(now_ms, event);
        Ok(())
    }

    fn dispatch(&mut self, now_ms: i64, event: MarketEvent) {
        match event {
            MarketEvent::OrderBook(book) => self.on_orderbook(now_ms, book),
            MarketEvent::Trade(trade) => self.on_trade(now_ms, trade),
            MarketEvent::Context(ctx) => {
                self.stats.market_context_updates += 1;
                self.market_context.on_context(now_ms, ctx);
            }
        }
    }

    fn on_orderbook(&mut self, now_ms: i64, book: OrderBookSnapshot) {
        self.stats.orderbook_updates += 1;

        let prev_mid = self.book.as_ref().and_then(|b| b.mid());
        let new_mid = book.mid();
        let (l5_bid, l5_ask) = book.depth_usd(5);
        self.depth_decay.on_book_update(now_ms, l5_bid, l5_ask);

        if let Some(mid) = new_mid {
            if new_mid != prev_mid {
                self.momentum.on_mid(now_ms, mid);
            }
            self.session.on_price(now_ms, mid);
        }

        self.last_book_update_ms = Some(now_ms);
        self.book = Some(book);
    }

    fn on_trade(&mut self, now_ms: i64, trade: Trade) {
        self.stats.trade_events += 1;
        self.trade_flow.on_trade(now_ms, trade);
        self.liquidations.on_trade(now_ms, trade);
        self.session.on_trade(now_ms, trade);
        self.candles.on_trade(now_ms, trade.price_f64(), trade.size_f64());
    }

    /// Assemble the full per-second snapshot (§6). `volumes` and
    /// `cross_asset` are last-known sidecar reads, handed in by the
    /// session's emit task through atomic cells — `tick` never blocks
    /// waiting on either.
    pub fn tick(
        &mut self,
        now_ms: i64,
        volumes: Option<VolumeSnapshot>,
        cross_asset: Option<CrossAssetRead>,
    ) -> Snapshot {
        let rate = self.rate(now_ms);

        let orderbook_section = self.orderbook_section();

        let tf_default = self.trade_flow.stats(now_ms, self.config.trade_flow_default_window_s);
        let trade_flow_section = trade_flow_wire(&tf_default);
        let trade_flow_multi = TradeFlowMulti {
            s30: trade_flow_wire(&self.trade_flow.stats(now_ms, 30)),
            m5: trade_flow_wire(&self.trade_flow.stats(now_ms, 300)),
            m15: trade_flow_wire(&self.trade_flow.stats(now_ms, 900)),
        };

        let short_read = self.momentum.read(now_ms, self.config.momentum_short_window_s);
        let long_read = self.momentum.read(now_ms, self.config.momentum_long_window_s);
        let momentum_section = MomentumSection {
            short: MomentumLeg {
                direction: direction_str(short_read.direction),
                change_percent: short_read.change_percent,
                is_usable: short_read.is_usable,
            },
            long: MomentumLeg {
                direction: direction_str(long_read.direction),
                change_percent: long_read.change_percent,
                is_usable: long_read.is_usable,
            },
        };

        let depth_decay_section = match self.depth_decay.read(now_ms) {
            Some(r) => Section::Present(DepthDecaySection {
                bid_decay_percent: r.bid_decay_percent,
                ask_decay_percent: r.ask_decay_percent,
                bid_status: decay_status_str(r.bid_status),
                ask_status: decay_status_str(r.ask_status),
            }),
            None => Section::missing(ComponentError::insufficient_data("not enough history for depth decay")),
        };

        let liq_5m = self.liquidations.read(now_ms, 300);
        let liquidations_section = liq_wire(self.liquidations.read(now_ms, 60));
        let liquidations_multi = LiquidationsMulti {
            s60: liq_wire(self.liquidations.read(now_ms, 60)),
            m5: liq_wire(liq_5m),
            m15: liq_wire(self.liquidations.read(now_ms, 900)),
        };

        let mc_read = self.market_context.read(now_ms, self.config.oi_window_s);
        let market_indicators_section = match &mc_read {
            Some(r) => Section::Present(MarketIndicatorsSection {
                oi: r.oi,
                oi_trend: trend_str(r.oi_trend),
                oi_velocity: r.oi_velocity,
                funding_rate: r.funding_rate,
                funding_trend: trend_str(r.funding_trend),
                basis: r.basis,
                basis_status: basis_status_str(r.basis_status),
            }),
            None => Section::missing(ComponentError::insufficient_data("no market context received yet")),
        };
        let oi_multi_section = if mc_read.is_some() {
            Section::Present(OiMulti {
                m5: oi_window_wire(self.market_context.oi_window(now_ms, 300)),
                m15: oi_window_wire(self.market_context.oi_window(now_ms, 900)),
            })
        } else {
            Section::missing(ComponentError::insufficient_data("no market context received yet"))
        };

        let one_min = self.candles.all_candles();
        let five_min = candles::aggregate(&one_min, 5);
        let fifteen_min = candles::aggregate(&one_min, 15);
        let one_hour = candles::aggregate(&one_min, 60);
        let m1 = candles::metrics_for(&one_min);
        let m5 = candles::metrics_for(&five_min);
        let m15 = candles::metrics_for(&fifteen_min);
        let h1 = candles::metrics_for(&one_hour);

        let candles_section = match (m1, m5) {
            (Some(m1v), Some(m5v)) => {
                self.volatility.update(m1v.atr, m5v.atr);
                Section::Present(CandlesSection {
                    m1: candle_wire(Some(m1v)),
                    m5: candle_wire(Some(m5v)),
                    m15: candle_wire(m15),
                    h1: candle_wire(h1),
                })
            }
            _ => Section::missing(ComponentError::insufficient_data("no candles built yet")),
        };

        let vol_read = self.volatility.read(
            m1.map(|m| m.realized_vol).unwrap_or(0.0),
            m5.map(|m| m.realized_vol).unwrap_or(0.0),
        );
        let volatility_section = VolatilitySection {
            atr_1m: vol_read.atr_1m,
            atr_5m: vol_read.atr_5m,
            realized_vol_1m: vol_read.realized_vol_1m,
            realized_vol_5m: vol_read.realized_vol_5m,
            regime: vol_regime_str(vol_read.regime),
            percentile: vol_read.percentile,
        };

        let volumes = volumes.unwrap_or_default();
        let session_read = self.session.read(now_ms);
        let session_context_section = SessionContextSection {
            daily_high: session_read.daily_high,
            daily_low: session_read.daily_low,
            current_price: session_read.current_price,
            pct_from_low: session_read.pct_from_low,
            pct_from_high: session_read.pct_from_high,
            pct_through_range: session_read.pct_through_range,
            session_vwap: session_read.session_vwap,
            distance_from_vwap_bps: session_read.distance_from_vwap_bps,
            session_volume_usd: session_read.session_volume_usd,
            last_1h_volume_usd: session_read.last_1h_volume_usd,
            last_4h_volume_usd: session_read.last_4h_volume_usd,
            hyperliquid_24h_volume_usd: volumes.last_24h_usd,
            hyperliquid_1h_volume_usd: volumes.last_1h_usd,
            hyperliquid_4h_volume_usd: volumes.last_4h_usd,
            session_duration_hours: session_read.session_duration_hours,
        };

        let regime_cfg = RegimeConfig {
            trend_threshold_pct: self.config.trend_threshold_pct,
            strong_trend_threshold_pct: self.config.strong_trend_threshold_pct,
            range_threshold_pct: self.config.range_threshold_pct,
            tight_spread_bps: self.config.tight_spread_bps,
            wide_spread_bps: self.config.wide_spread_bps,
            deep_book_usd: self.config.deep_book_usd,
            thin_book_usd: self.config.thin_book_usd,
            elevated_liq_count: self.config.elevated_liq_count,
            high_liq_count: self.config.high_liq_count,
        };
        let regime_inputs = RegimeInputs {
            ret_1m: m1.map(|m| m.return_pct).unwrap_or(0.0),
            ret_5m: m5.map(|m| m.return_pct).unwrap_or(0.0),
            ret_15m: m15.map(|m| m.return_pct),
            spread_bps: self.book.as_ref().and_then(|b| b.spread_bps()).unwrap_or(0.0),
            l5_bid: self.book.as_ref().map(|b| b.depth_usd(5).0).unwrap_or(0.0),
            l5_ask: self.book.as_ref().map(|b| b.depth_usd(5).1).unwrap_or(0.0),
            vol_regime: vol_read.regime,
            buy_ratio: tf_default.buy_ratio,
            liq_count: liq_5m.long_liquidations + liq_5m.short_liquidations,
            long_liq: liq_5m.long_liquidations,
            short_liq: liq_5m.short_liquidations,
        };
        let regime_read = regime::classify(&regime_inputs, &regime_cfg);
        let regime_section = RegimeSection {
            trend_regime: trend_regime_str(regime_read.trend_regime),
            trend_strength: regime_read.trend_strength,
            liquidity_regime: liquidity_regime_str(regime_read.liquidity_regime),
            market_regime: market_regime_str(regime_read.market_regime),
        };

        let slippage_section = self.slippage_section();

        let crowding_cfg = CrowdingConfig {
            crowding_threshold: self.config.crowding_threshold,
            oi_velocity_threshold_pct: self.config.crowding_oi_velocity_threshold_pct,
            funding_bullish_threshold: self.config.crowding_funding_bullish_threshold,
            basis_rich_threshold_pct: self.config.crowding_basis_rich_threshold_pct,
        };
        let crowding_section = match &mc_read {
            Some(r) => {
                let inputs = CrowdingInputs {
                    oi_trend: r.oi_trend,
                    oi_velocity_pct: r.oi_velocity,
                    funding_rate: r.funding_rate,
                    basis_pct: r.basis,
                };
                let read = crowding::classify(&inputs, &crowding_cfg);
                CrowdingSectionOwned {
                    crowded_long: read.crowded_long,
                    crowded_short: read.crowded_short,
                    long_crowding_score: read.long_crowding_score,
                    short_crowding_score: read.short_crowding_score,
                    interpretation: crowding::interpretation(&read),
                }
            }
            None => CrowdingSectionOwned {
                crowded_long: false,
                crowded_short: false,
                long_crowding_score: 0.0,
                short_crowding_score: 0.0,
                interpretation: "no market context received yet".to_string(),
            },
        };

        let feed_fresh = self.last_book_update_ms.map(|t| now_ms - t <= 5_000).unwrap_or(false);
        let modules = Modules {
            orderbook: ModuleHealth { ok: self.book.is_some(), fresh: feed_fresh },
            trades: ModuleHealth { ok: true, fresh: tf_default.trade_count > 0 },
            liquidations: ModuleHealth { ok: true, fresh: self.liquidations.has_recent_trades() },
            market_indicators: ModuleHealth { ok: true, fresh: self.market_context.has_data() },
            candles: ModuleHealth { ok: true, fresh: self.candles.has_data() },
            session_context: ModuleHealth { ok: true, fresh: self.session.is_initialized() },
            hyperliquid_volumes: ModuleHealth {
                ok: true,
                fresh: volumes.last_24h_usd > 0.0 || volumes.last_1h_usd > 0.0,
            },
        };
        let system_status_section = SystemStatusSection {
            data_quality_ok: modules.orderbook.ok && modules.orderbook.fresh,
            feed_connected: self.book.is_some() && feed_fresh,
            modules,
            last_check: now_ms,
        };

        let (cross_asset_reads, sentiment) =
            cross_asset.unwrap_or_else(|| (BTreeMap::new(), MarketSentiment::Unknown));
        let assets_wire: BTreeMap<String, AssetContextWire> = cross_asset_reads
            .into_iter()
            .map(|(symbol, read)| {
                (
                    symbol,
                    AssetContextWire {
                        return_1m: read.returns.return_1m,
                        return_5m: read.returns.return_5m,
                        return_15m: read.returns.return_15m,
                        return_1h: read.returns.return_1h,
                        volatility_regime: cross_vol_regime_str(read.volatility_regime),
                        trend_regime: cross_trend_regime_str(read.trend_regime),
                    },
                )
            })
            .collect();
        let cross_asset_context_section = CrossAssetContextSection {
            assets: assets_wire,
            market_sentiment: market_sentiment_str(sentiment),
        };

        Snapshot {
            stats: self.stats,
            rate,
            orderbook: orderbook_section,
            trade_flow: trade_flow_section,
            trade_flow_multi,
            momentum: momentum_section,
            depth_decay: depth_decay_section,
            liquidations: liquidations_section,
            liquidations_multi,
            market_indicators: market_indicators_section,
            oi_multi: oi_multi_section,
            candles: candles_section,
            volatility: volatility_section,
            session_context: session_context_section,
            regime: regime_section,
            slippage: slippage_section,
            crowding: crowding_section,
            system_status: system_status_section,
            cross_asset_context: cross_asset_context_section,
        }
    }

    fn rate(&self, now_ms: i64) -> Rate {
        let uptime_seconds = self
            .started_at_ms
            .map(|start| (now_ms - start).max(0) as f64 / 1000.0)
            .unwrap_or(0.0);
        let cutoff_10s = now_ms - 10_000;
        let messages_last_10s = self.recent_event_times.iter().filter(|&&t| t >= cutoff_10s).count() as u64;
        let messages_per_minute = self.recent_event_times.len() as u64;
        let average_per_minute = if uptime_seconds > 0.0 {
            self.total_messages as f64 / (uptime_seconds / 60.0)
        } else {
            0.0
        };
        Rate {
            messages_per_minute,
            messages_last_10s,
            average_per_minute,
            total_messages: self.total_messages,
            uptime_seconds,
        }
    }

    fn orderbook_section(&self) -> Section<OrderbookSection> {
        match &self.book {
            Some(book) => {
                let (l1_depth_bid, l1_depth_ask) = book.depth_usd(1);
                let (l2_depth_bid, l2_depth_ask) = book.depth_usd(2);
                let (l3_depth_bid, l3_depth_ask) = book.depth_usd(3);
                let (l4_depth_bid, l4_depth_ask) = book.depth_usd(4);
                let (l5_depth_bid, l5_depth_ask) = book.depth_usd(5);
                Section::Present(OrderbookSection {
                    mid_price: book.mid(),
                    spread_bps: book.spread_bps(),
                    best_bid: book.bids.best().and_then(|l| l.price.to_f64()),
                    best_ask: book.asks.best().and_then(|l| l.price.to_f64()),
                    l1_depth_bid,
                    l2_depth_bid,
                    l3_depth_bid,
                    l4_depth_bid,
                    l5_depth_bid,
                    l1_depth_ask,
                    l2_depth_ask,
                    l3_depth_ask,
                    l4_depth_ask,
                    l5_depth_ask,
                    l1_imbalance: book.imbalance(1),
                    l5_imbalance: book.imbalance(5),
                    bids: book.bids.0.iter().take(5).map(level_wire).collect(),
                    asks: book.asks.0.iter().take(5).map(level_wire).collect(),
                })
            }
            None => Section::missing(ComponentError::insufficient_data("no order book received yet")),
        }
    }

    fn slippage_section(&self) -> SlippageSection {
        let mut map = BTreeMap::new();
        for &size in &self.config.slippage_sizes_usd {
            let pair = match &self.book {
                Some(book) => SlippagePair {
                    buy: slippage_leg_wire(orderbook_model::estimate_slippage(
                        book,
                        Side::Buy,
                        size,
                        self.config.taker_fee_bps,
                    )),
                    sell: slippage_leg_wire(orderbook_model::estimate_slippage(
                        book,
                        Side::Sell,
                        size,
                        self.config.taker_fee_bps,
                    )),
                    spread_bps: book.spread_bps().unwrap_or(0.0),
                    fee_bps: self.config.taker_fee_bps,
                },
                None => SlippagePair {
                    buy: slippage_leg_wire(None),
                    sell: slippage_leg_wire(None),
                    spread_bps: 0.0,
                    fee_bps: self.config.taker_fee_bps,
                },
            };
            map.insert(usd_key(size), pair);
        }
        SlippageSection(map)
    }
}

fn validate(event: &MarketEvent) -> Result<(), IngestError> {
    match event {
        MarketEvent::Trade(t) if !t.is_valid() => {
            Err(IngestError::InvalidValue("trade price/size must be positive".into()))
        }
        MarketEvent::OrderBook(b) if !b.is_valid() => {
            Err(IngestError::Malformed("orderbook levels not monotone or non-positive".into()))
        }
        MarketEvent::Context(c) if !c.is_valid() => {
            Err(IngestError::InvalidValue("mark price must be positive".into()))
        }
        _ => Ok(()),
    }
}

fn level_wire(level: &OrderBookLevel) -> LevelWire {
    LevelWire {
        price: level.price.to_f64().unwrap_or(0.0),
        size: level.size.to_f64().unwrap_or(0.0),
        total_usd: level.notional_f64(),
    }
}

fn trade_flow_wire(stats: &TradeFlowStats) -> TradeFlowSection {
    TradeFlowSection {
        trade_count: stats.trade_count,
        total_volume: stats.total_volume,
        buy_volume: stats.buy_volume,
        sell_volume: stats.sell_volume,
        buy_ratio: stats.buy_ratio,
        sell_ratio: stats.sell_ratio,
        sweep_direction: stats.sweep_direction,
        largest: stats.largest,
        median: stats.median,
        average: stats.average,
    }
}

fn liq_wire(read: LiquidationRead) -> LiquidationsSection {
    LiquidationsSection {
        status: liq_status_str(read.status()),
        long_liquidations: read.long_liquidations,
        short_liquidations: read.short_liquidations,
        total_long_volume: read.total_long_volume,
        total_short_volume: read.total_short_volume,
    }
}

fn oi_window_wire(read: Option<OiWindowRead>) -> OiWindowWire {
    match read {
        Some(r) => OiWindowWire { change_percent: r.change_percent, velocity: r.velocity_pct_per_min, trend: trend_str(r.trend) },
        None => OiWindowWire { change_percent: 0.0, velocity: 0.0, trend: "flat" },
    }
}

fn candle_wire(metrics: Option<candles::TfMetrics>) -> CandleMetricsWire {
    metrics
        .map(|m| CandleMetricsWire {
            return_pct: m.return_pct,
            volume_vs_avg: m.volume_vs_avg,
            atr: m.atr,
            realized_vol: m.realized_vol,
            close: m.close,
            high: m.high,
            low: m.low,
            volume: m.volume,
        })
        .unwrap_or_default()
}

fn slippage_leg_wire(estimate: Option<SlippageEstimate>) -> SlippageLeg {
    match estimate {
        Some(e) => SlippageLeg {
            avg_fill_price: e.avg_fill_price,
            slippage_bps: e.slippage_bps,
            round_trip_cost_bps: e.round_trip_cost_bps,
            is_feasible: e.is_feasible,
            liquidity_used_pct: e.liquidity_used_pct,
        },
        None => SlippageLeg {
            avg_fill_price: 0.0,
            slippage_bps: 0.0,
            round_trip_cost_bps: 0.0,
            is_feasible: false,
            liquidity_used_pct: 0.0,
        },
    }
}

/// `500 -> "$500"`, `1000 -> "$1k"`. Matches the wire key format used by
/// the slippage section (§6).
fn usd_key(v: f64) -> String {
    if v >= 1000.0 && (v / 1000.0).fract().abs() < 1e-9 {
        format!("${}k", (v / 1000.0) as i64)
    } else {
        format!("${}", v as i64)
    }
}

fn direction_str(d: Direction) -> &'static str {
    match d {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Flat => "flat",
    }
}

fn decay_status_str(s: DecayStatus) -> &'static str {
    match s {
        DecayStatus::Ok => "ok",
        DecayStatus::Medium => "medium",
        DecayStatus::High => "high",
        DecayStatus::Critical => "critical",
    }
}

fn liq_status_str(s: LiqStatus) -> &'static str {
    match s {
        LiqStatus::Normal => "normal",
        LiqStatus::Elevated => "elevated",
        LiqStatus::High => "high",
    }
}

fn trend_str(t: Trend) -> &'static str {
    match t {
        Trend::Up => "up",
        Trend::Down => "down",
        Trend::Flat => "flat",
    }
}

fn basis_status_str(s: BasisStatus) -> &'static str {
    match s {
        BasisStatus::Premium => "premium",
        BasisStatus::Discount => "discount",
        BasisStatus::Normal => "normal",
    }
}

fn vol_regime_str(r: VolRegime) -> &'static str {
    match r {
        VolRegime::Low => "low",
        VolRegime::Normal => "normal",
        VolRegime::High => "high",
    }
}

fn trend_regime_str(t: TrendRegime) -> &'static str {
    match t {
        TrendRegime::Up => "up",
        TrendRegime::Down => "down",
        TrendRegime::Range => "range",
    }
}

fn liquidity_regime_str(l: LiquidityRegime) -> &'static str {
    match l {
        LiquidityRegime::High => "high",
        LiquidityRegime::Normal => "normal",
        LiquidityRegime::Thin => "thin",
    }
}

fn market_regime_str(m: MarketRegime) -> &'static str {
    match m {
        MarketRegime::ShortSqueeze => "short_squeeze",
        MarketRegime::Crash => "crash",
        MarketRegime::LiquidationEvent => "liquidation_event",
        MarketRegime::Trend => "trend",
        MarketRegime::Chop => "chop",
        MarketRegime::Normal => "normal",
    }
}

fn cross_vol_regime_str(r: crate::components::cross_asset::VolRegime) -> &'static str {
    use crate::components::cross_asset::VolRegime::*;
    match r {
        Low => "low",
        Normal => "normal",
        High => "high",
        Unknown => "unknown",
    }
}

fn cross_trend_regime_str(r: crate::components::cross_asset::TrendRegime) -> &'static str {
    use crate::components::cross_asset::TrendRegime::*;
    match r {
        Up => "up",
        Down => "down",
        Range => "range",
        Unknown => "unknown",
    }
}

fn market_sentiment_str(s: MarketSentiment) -> &'static str {
    match s {
        MarketSentiment::Bullish => "bullish",
        MarketSentiment::Bearish => "bearish",
        MarketSentiment::Neutral => "neutral",
        MarketSentiment::Mixed => "mixed",
        MarketSentiment::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderBookSide, PerpAssetContext, TradeSide};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lvl(p: &str, s: &str) -> OrderBookLevel {
        OrderBookLevel::new(dec(p), dec(s), 1)
    }

    fn book(time_ms: i64, bid: &str, ask: &str) -> OrderBookSnapshot {
        OrderBookSnapshot {
            coin: "SOL".into(),
            time_ms,
            bids: OrderBookSide(vec![lvl(bid, "10"), lvl("99.0", "10")]),
            asks: OrderBookSide(vec![lvl(ask, "10"), lvl("101.0", "10")]),
        }
    }

    fn trade(time_ms: i64, price: &str, size: &str, side: TradeSide) -> Trade {
        Trade { time_ms, price: dec(price), size_base: dec(size), side }
    }

    #[test]
    fn rejects_malformed_trade_without_touching_state() {
        let mut engine = Engine::new(EngineConfig::default());
        let bad = MarketEvent::Trade(trade(0, "0", "1", TradeSide::Buy));
        assert!(engine.ingest(0, bad).is_err());
        assert_eq!(engine.ingest_error_count(), 1);
        assert_eq!(engine.stats.events, 0);
    }

    #[test]
    fn orderbook_scenario_reflects_in_snapshot() {
        let mut engine = Engine::new(EngineConfig::default());
        engine
            .ingest(1_000, MarketEvent::OrderBook(book(1_000, "100.0", "100.1")))
            .unwrap();
        let snap = engine.tick(1_000, None, None);
        match snap.orderbook {
            Section::Present(ob) => {
                assert!((ob.mid_price.unwrap() - 100.05).abs() < 1e-9);
                assert!(ob.spread_bps.unwrap() > 0.0);
            }
            Section::Missing(_) => panic!("expected orderbook section to be present"),
        }
    }

    #[test]
    fn missing_components_render_as_error_sections() {
        let mut engine = Engine::new(EngineConfig::default());
        let snap = engine.tick(0, None, None);
        assert!(matches!(snap.orderbook, Section::Missing(_)));
        assert!(matches!(snap.depth_decay, Section::Missing(_)));
        assert!(matches!(snap.candles, Section::Missing(_)));
        assert!(matches!(snap.market_indicators, Section::Missing(_)));
        assert_eq!(snap.trade_flow.trade_count, 0);
        assert!(!snap.system_status.data_quality_ok);
    }

    #[test]
    fn liquidation_cascade_feeds_liquidations_and_liq_count() {
        let mut engine = Engine::new(EngineConfig::default());
        for t in [0, 1_000, 2_000, 3_000, 4_000] {
            engine
                .ingest(t, MarketEvent::Trade(trade(t, "1", "3000", TradeSide::Sell)))
                .unwrap();
        }
        let snap = engine.tick(4_000, None, None);
        assert_eq!(snap.liquidations.long_liquidations, 1);
        assert_eq!(snap.liquidations_multi.m5.long_liquidations, 1);
    }

    #[test]
    fn context_event_populates_market_indicators_and_crowding() {
        let mut engine = Engine::new(EngineConfig::default());
        let ctx = PerpAssetContext {
            time_ms: 0,
            oi_usd: 1_000_000.0,
            funding_rate: 0.0003,
            mark_px: 101.0,
            oracle_px: Some(100.0),
        };
        engine.ingest(0, MarketEvent::Context(ctx)).unwrap();
        let snap = engine.tick(0, None, None);
        match snap.market_indicators {
            Section::Present(mi) => assert_eq!(mi.basis_status, "premium"),
            Section::Missing(_) => panic!("expected market indicators to be present"),
        }
        assert!(snap.crowding.long_crowding_score > 0.0);
    }
}
