//! End-to-end session scenarios driving `Engine` through its public API
//! the way a live session would: order-book replace, trades, and context
//! ticks feeding into one assembled snapshot per second.

use rust_decimal::Decimal;
use std::str::FromStr;

use perp_analytics_engine::backfill::{self, CandleBackfill, DailyRange};
use perp_analytics_engine::config::EngineConfig;
use perp_analytics_engine::engine::{Engine, VolumeSnapshot};
use perp_analytics_engine::model::{
    Candle, MarketEvent, OrderBookLevel, OrderBookSide, OrderBookSnapshot, PerpAssetContext, Trade, TradeSide,
};
use perp_analytics_engine::snapshot::Section;

fn px(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn book(time_ms: i64, bid: &str, ask: &str) -> OrderBookSnapshot {
    OrderBookSnapshot {
        coin: "SOL".to_string(),
        time_ms,
        bids: OrderBookSide(vec![OrderBookLevel::new(px(bid), px("10"), 3)]),
        asks: OrderBookSide(vec![OrderBookLevel::new(px(ask), px("10"), 3)]),
    }
}

fn trade(time_ms: i64, price: &str, size: &str, side: TradeSide) -> Trade {
    Trade { time_ms, price: px(price), size_base: px(size), side }
}

#[test]
fn full_tick_assembles_every_section_from_live_events() {
    let mut engine = Engine::new(EngineConfig::default());

    engine.ingest(0, MarketEvent::OrderBook(book(0, "100", "100.1"))).unwrap();
    engine.ingest(1_000, MarketEvent::Trade(trade(1_000, "100.05", "2", TradeSide::Buy))).unwrap();
    engine
        .ingest(
            1_500,
            MarketEvent::Context(PerpAssetContext {
                time_ms: 1_500,
                oi_usd: 1_000_000.0,
                funding_rate: 0.0001,
                mark_px: 100.05,
                oracle_px: Some(100.0),
            }),
        )
        .unwrap();

    let snapshot = engine.tick(2_000, None, None);

    assert_eq!(snapshot.stats.events, 3);
    assert_eq!(snapshot.stats.orderbook_updates, 1);
    assert_eq!(snapshot.stats.trade_events, 1);
    assert_eq!(snapshot.stats.market_context_updates, 1);

    match &snapshot.orderbook {
        Section::Present(ob) => assert!((ob.mid_price.unwrap() - 100.05).abs() < 1e-6),
        Section::Missing(_) => panic!("orderbook section should be present after a book update"),
    }
    match &snapshot.market_indicators {
        Section::Present(mi) => assert!((mi.funding_rate - 0.0001).abs() < 1e-9),
        Section::Missing(_) => panic!("market indicators should be present after a context update"),
    }
    assert_eq!(snapshot.trade_flow.trade_count, 1);
}

#[test]
fn malformed_trade_is_rejected_without_corrupting_state() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.ingest(0, MarketEvent::OrderBook(book(0, "100", "100.1"))).unwrap();

    let bad = MarketEvent::Trade(trade(1_000, "0", "1", TradeSide::Buy));
    assert!(engine.ingest(1_000, bad).is_err());
    assert_eq!(engine.ingest_error_count(), 1);

    let snapshot = engine.tick(2_000, None, None);
    assert_eq!(snapshot.trade_flow.trade_count, 0);
    assert_eq!(snapshot.stats.orderbook_updates, 1);
}

#[test]
fn components_render_as_error_sections_before_any_data_arrives() {
    let mut engine = Engine::new(EngineConfig::default());
    let snapshot = engine.tick(0, None, None);

    assert!(matches!(snapshot.orderbook, Section::Missing(_)));
    assert!(matches!(snapshot.market_indicators, Section::Missing(_)));
    assert!(matches!(snapshot.candles, Section::Missing(_)));
}

#[test]
fn volume_and_cross_asset_sidecars_populate_their_sections() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.ingest(0, MarketEvent::OrderBook(book(0, "100", "100.1"))).unwrap();

    let volumes = VolumeSnapshot { last_24h_usd: 5_000_000.0, last_1h_usd: 200_000.0, last_4h_usd: 800_000.0 };
    let snapshot = engine.tick(1_000, Some(volumes), None);

    assert_eq!(snapshot.session_context.hyperliquid_24h_volume_usd, 5_000_000.0);
    assert_eq!(snapshot.session_context.hyperliquid_1h_volume_usd, 200_000.0);
    assert_eq!(snapshot.session_context.hyperliquid_4h_volume_usd, 800_000.0);
}

#[test]
fn candle_build_closes_and_reopens_on_bucket_boundary() {
    let mut engine = Engine::new(EngineConfig::default());

    engine.ingest(60_000, MarketEvent::Trade(trade(60_000, "10", "1", TradeSide::Buy))).unwrap();
    engine.ingest(90_000, MarketEvent::Trade(trade(90_000, "12", "2", TradeSide::Sell))).unwrap();
    engine.ingest(119_999, MarketEvent::Trade(trade(119_999, "11", "1", TradeSide::Buy))).unwrap();

    let mid_tick = engine.tick(119_999, None, None);
    let m1 = mid_tick.candles;
    match m1 {
        Section::Present(c) => {
            assert_eq!(c.m1.close, 11.0);
            assert_eq!(c.m1.high, 12.0);
            assert_eq!(c.m1.low, 10.0);
            assert_eq!(c.m1.volume, 4.0);
        }
        Section::Missing(_) => panic!("candles should be present once a bucket has trades"),
    }

    engine.ingest(120_000, MarketEvent::Trade(trade(120_000, "13", "1", TradeSide::Buy))).unwrap();
    let snapshot = engine.tick(120_000, None, None);
    match snapshot.candles {
        Section::Present(c) => {
            assert_eq!(c.m1.open, 13.0);
            assert_eq!(c.m1.close, 13.0);
        }
        Section::Missing(_) => panic!("candles should be present after the new bucket opens"),
    }
}

#[test]
fn trade_flow_sweep_detected_over_default_window() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.ingest(0, MarketEvent::Trade(trade(0, "100", "100", TradeSide::Buy))).unwrap();
    engine.ingest(1_000, MarketEvent::Trade(trade(1_000, "100", "100", TradeSide::Buy))).unwrap();
    engine.ingest(2_000, MarketEvent::Trade(trade(2_000, "100", "100", TradeSide::Buy))).unwrap();
    engine.ingest(3_000, MarketEvent::Trade(trade(3_000, "100", "100", TradeSide::Buy))).unwrap();
    engine.ingest(4_000, MarketEvent::Trade(trade(4_000, "100", "50", TradeSide::Sell))).unwrap();

    let snapshot = engine.tick(10_000, None, None);
    assert!((snapshot.trade_flow.buy_ratio - 40_000.0 / 45_000.0).abs() < 1e-6);
    assert_eq!(snapshot.trade_flow.sweep_direction, Some("up"));
}

#[test]
fn session_reset_keeps_vwap_queue_but_resets_extremes() {
    let config = EngineConfig { session_duration_s: 60, ..EngineConfig::default() };
    let mut engine = Engine::new(config);

    engine.ingest(0, MarketEvent::Trade(trade(0, "100", "1", TradeSide::Buy))).unwrap();
    engine.ingest(30_000, MarketEvent::Trade(trade(30_000, "110", "1", TradeSide::Buy))).unwrap();
    engine.ingest(60_000, MarketEvent::Trade(trade(60_000, "90", "1", TradeSide::Buy))).unwrap();

    let snapshot = engine.tick(60_000, None, None);
    assert_eq!(snapshot.session_context.daily_high, 90.0);
    assert_eq!(snapshot.session_context.daily_low, 90.0);
    assert_eq!(snapshot.session_context.current_price, 90.0);

    let expected_vwap = (100.0 * 100.0 + 110.0 * 110.0 + 90.0 * 90.0) / (100.0 + 110.0 + 90.0);
    assert!((snapshot.session_context.session_vwap.unwrap() - expected_vwap).abs() < 1e-6);
}

#[tokio::test]
async fn backfill_seed_then_live_trade_keeps_vwap_queue_and_updates_extremes() {
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

    let backfill_client = FakeBackfill {
        candles: vec![Candle::open_at(0, 100.0, 1.0)],
        range: DailyRange { day_high: 105.0, day_low: 95.0, current_price: 100.0 },
    };

    let mut engine = Engine::new(EngineConfig::default());
    backfill::seed_engine(&mut engine, &backfill_client, "SOL", 0).await;

    engine.ingest(1_000, MarketEvent::Trade(trade(1_000, "110", "1", TradeSide::Buy))).unwrap();

    let snapshot = engine.tick(2_000, None, None);
    assert_eq!(snapshot.session_context.daily_high, 110.0);
    assert_eq!(snapshot.session_context.daily_low, 95.0);
}
