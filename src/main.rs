//! Process entry point: wires the transport, backfill, analytics kernel,
//! fan-out, and optional durable sink together per §5's concurrency model.
//!
//! Grounded on this codebase's `main.rs` shutdown pattern (a broadcast
//! channel fanned out to every spawned task, `tokio::signal::ctrl_c` as
//! the trigger) and `orderbook/analytics/storage/mod.rs`'s sidecar-task
//! shape, now applied to the ingest/emit split instead of a single gRPC
//! server loop.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use perp_analytics_engine::backfill::{self, CandleBackfill, CrossAssetSource, RestBackfillClient, VolumeSource};
use perp_analytics_engine::components::cross_asset::{CrossAssetConfig, CrossAssetTracker};
use perp_analytics_engine::config::EngineConfig;
use perp_analytics_engine::engine::{CrossAssetRead, Engine, VolumeSnapshot};
use perp_analytics_engine::model::MarketEvent;
use perp_analytics_engine::sink::{NoopSink, SnapshotSink};
use perp_analytics_engine::transport::{MarketDataSource, WebSocketMarketDataSource};

#[cfg(feature = "fanout")]
use perp_analytics_engine::fanout::{self, FanoutState};
#[cfg(feature = "durable_sink")]
use perp_analytics_engine::sink::RocksDbSink;

use tokio::sync::{broadcast, mpsc, Mutex};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

struct CliArgs {
    symbol: String,
    ws_url: String,
    rest_base_url: Option<String>,
    fanout_bind_addr: String,
    durable_sink_path: Option<String>,
    volume_poll_s: u64,
    cross_asset_poll_s: u64,
}

fn parse_args(args: &[String], defaults: &EngineConfig) -> CliArgs {
    let mut cli = CliArgs {
        symbol: defaults.symbol.clone(),
        ws_url: "wss://api.example-exchange.com/ws".to_string(),
        rest_base_url: None,
        fanout_bind_addr: defaults.fanout_bind_addr.clone(),
        durable_sink_path: None,
        volume_poll_s: 60,
        cross_asset_poll_s: 5,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--symbol" => {
                if i + 1 < args.len() {
                    cli.symbol = args[i + 1].clone();
                    i += 1;
                }
            }
            "--ws-url" => {
                if i + 1 < args.len() {
                    cli.ws_url = args[i + 1].clone();
                    i += 1;
                }
            }
            "--rest-base-url" => {
                if i + 1 < args.len() {
                    cli.rest_base_url = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--fanout-addr" => {
                if i + 1 < args.len() {
                    cli.fanout_bind_addr = args[i + 1].clone();
                    i += 1;
                }
            }
            "--durable-sink-path" => {
                if i + 1 < args.len() {
                    cli.durable_sink_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--volume-poll-s" => {
                if i + 1 < args.len() {
                    cli.volume_poll_s = args[i + 1].parse().unwrap_or(cli.volume_poll_s);
                    i += 1;
                }
            }
            "--cross-asset-poll-s" => {
                if i + 1 < args.len() {
                    cli.cross_asset_poll_s = args[i + 1].parse().unwrap_or(cli.cross_asset_poll_s);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }
    cli
}

fn print_usage() {
    println!("perp-analytics-engine - real-time market-microstructure analytics kernel");
    println!();
    println!("USAGE:");
    println!("    perp-analytics-engine [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --symbol <SYM>              Symbol to track (default: ENGINE_SYMBOL or SOL)");
    println!("    --ws-url <URL>              Market data WebSocket URL");
    println!("    --rest-base-url <URL>       REST base URL for candle/volume/cross-asset backfill");
    println!("    --fanout-addr <ADDR>        Outbound WebSocket fan-out bind address");
    println!("    --durable-sink-path <PATH>  RocksDB path for durable snapshot append (requires durable_sink feature)");
    println!("    --volume-poll-s <SECS>      Volume-updater sidecar interval (default: 60)");
    println!("    --cross-asset-poll-s <SECS> Cross-asset sidecar interval (default: 5)");
    println!("    --help, -h                  Print this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    RUST_LOG                    Logging filter (default: info)");
    println!("    ENGINE_SYMBOL, SESSION_DURATION_S, TRADE_MAX_HISTORY_S, ...");
    println!("                                Any EngineConfig field — see config/engine.rs");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_filter.clone()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args, &config);

    tracing::info!(symbol = %cli.symbol, "starting perp-analytics-engine session");

    let engine = Engine::new(EngineConfig { symbol: cli.symbol.clone(), ..config.clone() });
    let engine = Arc::new(Mutex::new(engine));

    let rest_client = cli.rest_base_url.as_ref().map(|url| RestBackfillClient::new(url.clone()));

    if let Some(client) = &rest_client {
        let mut guard = engine.lock().await;
        backfill::seed_engine(&mut guard, client, &cli.symbol, now_ms()).await;
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    {
        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received shutdown signal (Ctrl+C)");
                let _ = signal_tx.send(());
            }
        });
    }

    // Transport: normalizes wire messages into MarketEvent, reconnecting
    // with backoff internally (§10.1). The ingest task below never blocks
    // on I/O — it only ever awaits this channel.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<MarketEvent>();
    let source: Box<dyn MarketDataSource> = Box::new(WebSocketMarketDataSource::new(cli.symbol.clone(), cli.ws_url.clone()));
    let transport_handle = source.spawn(event_tx);

    // Sidecar atomic cells (§5, §9): written by their own tasks, read by
    // the emit task without ever blocking on sidecar I/O.
    let volumes_cell: Arc<RwLock<VolumeSnapshot>> = Arc::new(RwLock::new(VolumeSnapshot::default()));
    let cross_asset_cell: Arc<RwLock<Option<CrossAssetRead>>> = Arc::new(RwLock::new(None));

    #[cfg(feature = "fanout")]
    let fanout_state = FanoutState::new();
    #[cfg(feature = "fanout")]
    {
        let (tx, _rx) = broadcast::channel(64);
        fanout_state.register(cli.symbol.clone(), tx);
    }

    #[cfg(feature = "durable_sink")]
    let sink: Arc<dyn SnapshotSink> = match &cli.durable_sink_path {
        Some(path) => match RocksDbSink::open(path) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::error!(error = %e, "failed to open durable sink, falling back to no-op");
                Arc::new(NoopSink)
            }
        },
        None => Arc::new(NoopSink),
    };
    #[cfg(not(feature = "durable_sink"))]
    let sink: Arc<dyn SnapshotSink> = Arc::new(NoopSink);

    // Ingest task (§5.1): drains normalized events strictly in transport
    // order, applying each synchronously to the shared engine.
    let ingest_handle = {
        let engine = engine.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("ingest task shutting down");
                        break;
                    }
                    event = event_rx.recv() => {
                        match event {
                            Some(event) => {
                                let mut guard = engine.lock().await;
                                let _ = guard.ingest(now_ms(), event);
                            }
                            None => {
                                tracing::warn!("event channel closed, ingest task stopping");
                                break;
                            }
                        }
                    }
                }
            }
        })
    };

    // Volume-updater sidecar (§5): periodic REST poll, never consulted
    // synchronously by the emit task beyond a cell read.
    let volume_handle = rest_client.as_ref().map(|_| {
        let client = RestBackfillClient::new(cli.rest_base_url.clone().unwrap());
        let symbol = cli.symbol.clone();
        let cell = volumes_cell.clone();
        let interval_s = cli.volume_poll_s.max(60);
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_s));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        match client.fetch_volumes(&symbol).await {
                            Ok(v) => *cell.write().unwrap() = v,
                            Err(e) => tracing::warn!(error = %e, "volume sidecar poll failed, keeping last-good values"),
                        }
                    }
                }
            }
        })
    });

    // Cross-asset sidecar (§5, §4.13): polls sibling symbols independently
    // of the primary event stream and writes a fully-computed read into
    // its cell so the emit task never touches the tracker directly.
    let cross_asset_handle = rest_client.map(|client| {
        let cell = cross_asset_cell.clone();
        let interval_s = cli.cross_asset_poll_s.max(1);
        let mut tracker = CrossAssetTracker::new(
            &config.cross_asset_symbols,
            CrossAssetConfig {
                low_vol_threshold_pct: config.cross_asset_low_vol_threshold_pct,
                high_vol_threshold_pct: config.cross_asset_high_vol_threshold_pct,
                trend_threshold_pct: config.cross_asset_trend_threshold_pct,
            },
        );
        let symbols = config.cross_asset_symbols.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_s));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        let tick_ms = now_ms();
                        for symbol in &symbols {
                            match client.latest_price(symbol).await {
                                Ok(price) => tracker.on_price(symbol, tick_ms, price),
                                Err(e) => tracing::warn!(symbol, error = %e, "cross-asset sidecar poll failed"),
                            }
                        }
                        *cell.write().unwrap() = Some(tracker.read_all(tick_ms));
                    }
                }
            }
        })
    });

    // Emit task (§5.2): every second, takes a coherent read of every
    // component and publishes one snapshot. A missed tick is skipped, not
    // caught up.
    let emit_handle = {
        let engine = engine.clone();
        let symbol = cli.symbol.clone();
        let period = Duration::from_secs_f64(1.0 / config.snapshot_hz.max(0.001));
        let mut shutdown_rx = shutdown_tx.subscribe();
        #[cfg(feature = "fanout")]
        let fanout_state = fanout_state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("emit task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let tick_ms = now_ms();
                        let volumes = *volumes_cell.read().unwrap();
                        let cross_asset = cross_asset_cell.read().unwrap().clone();
                        let snapshot = {
                            let mut guard = engine.lock().await;
                            guard.tick(tick_ms, Some(volumes), cross_asset)
                        };

                        if let Err(e) = sink.append(&symbol, tick_ms, &snapshot) {
                            tracing::warn!(error = %e, "durable sink append failed, keeping in-memory state only");
                        }

                        #[cfg(feature = "fanout")]
                        {
                            let snapshot = Arc::new(snapshot);
                            fanout_state.publish(&symbol, snapshot);
                        }
                        #[cfg(not(feature = "fanout"))]
                        {
                            let _ = snapshot;
                        }
                    }
                }
            }
        })
    };

    #[cfg(feature = "fanout")]
    let fanout_serve_handle = {
        let bind_addr = cli.fanout_bind_addr.clone();
        let state = fanout_state.clone();
        tokio::spawn(async move {
            if let Err(e) = fanout::serve(&bind_addr, state).await {
                tracing::error!(error = %e, "fan-out server exited");
            }
        })
    };

    // Session teardown (§5): wait for shutdown, then drain every spawned
    // task. Idempotent — a second Ctrl+C while draining is a no-op since
    // the broadcast channel has already fired.
    let _ = ingest_handle.await;
    let _ = emit_handle.await;
    if let Some(h) = volume_handle {
        let _ = h.await;
    }
    if let Some(h) = cross_asset_handle {
        let _ = h.await;
    }
    transport_handle.abort();
    #[cfg(feature = "fanout")]
    fanout_serve_handle.abort();

    tracing::info!("session stopped");
    Ok(())
}
