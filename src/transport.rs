//! Reference transport adapter (§10.1, outside the analytics kernel).
//!
//! The kernel depends only on [`MarketDataSource`] — "a stream of
//! normalized events in, nothing out." [`WebSocketMarketDataSource`] is one
//! concrete way to satisfy it, grounded on the depth-stream client's
//! exponential-backoff reconnect loop and ping/pong keepalive handling.
//! Wire messages are parsed into [`MarketEvent`] at this boundary; anything
//! that fails to parse is a malformed event and never reaches the kernel.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::model::{
    MarketEvent, OrderBookLevel, OrderBookSide, OrderBookSnapshot, PerpAssetContext, Trade, TradeSide,
};

const MAX_RECONNECT_DELAY_SECS: u64 = 30;

/// "A stream of normalized events in, nothing out." The kernel never
/// depends on a concrete exchange client, only this trait.
pub trait MarketDataSource: Send + 'static {
    /// Spawn the source's connection-management loop. Normalized events
    /// are pushed onto `sender` until the source either closes normally or
    /// its handle is aborted; reconnection, parsing, and backoff are
    /// entirely the implementation's concern.
    fn spawn(self: Box<Self>, sender: mpsc::UnboundedSender<MarketEvent>) -> tokio::task::JoinHandle<()>;
}

/// Wire envelope for the inbound event protocol (§6).
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireEvent {
    #[serde(rename = "l2_book")]
    L2Book {
        coin: String,
        time_ms: i64,
        bids: Vec<WireLevel>,
        asks: Vec<WireLevel>,
    },
    #[serde(rename = "trade")]
    Trade {
        time_ms: i64,
        px: Decimal,
        sz: Decimal,
        side: String,
    },
    #[serde(rename = "context")]
    Context {
        time_ms: i64,
        mark_px: f64,
        oracle_px: Option<f64>,
        funding: f64,
        open_interest: f64,
    },
}

#[derive(Debug, Deserialize)]
struct WireLevel {
    px: Decimal,
    sz: Decimal,
    #[serde(default)]
    n: u32,
}

/// Parse one wire message into a normalized event. Anything that fails to
/// deserialize, or names an unrecognized trade side, is a malformed event
/// (§7) — the caller logs and drops it rather than forwarding it.
fn parse_event(text: &str) -> Result<MarketEvent, String> {
    let wire: WireEvent = serde_json::from_str(text).map_err(|e| e.to_string())?;
    match wire {
        WireEvent::L2Book { coin, time_ms, bids, asks } => Ok(MarketEvent::OrderBook(OrderBookSnapshot {
            coin,
            time_ms,
            bids: OrderBookSide(bids.into_iter().map(|l| OrderBookLevel::new(l.px, l.sz, l.n)).collect()),
            asks: OrderBookSide(asks.into_iter().map(|l| OrderBookLevel::new(l.px, l.sz, l.n)).collect()),
        })),
        WireEvent::Trade { time_ms, px, sz, side } => {
            let side = match side.as_str() {
                "B" => TradeSide::Buy,
                "A" => TradeSide::Sell,
                other => return Err(format!("unrecognized trade side '{other}'")),
            };
            Ok(MarketEvent::Trade(Trade { time_ms, price: px, size_base: sz, side }))
        }
        WireEvent::Context { time_ms, mark_px, oracle_px, funding, open_interest } => {
            Ok(MarketEvent::Context(PerpAssetContext {
                time_ms,
                oi_usd: open_interest,
                funding_rate: funding,
                mark_px,
                oracle_px,
            }))
        }
    }
}

/// WebSocket-backed reference implementation of [`MarketDataSource`].
pub struct WebSocketMarketDataSource {
    symbol: String,
    url: String,
}

impl WebSocketMarketDataSource {
    pub fn new(symbol: impl Into<String>, url: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), url: url.into() }
    }

    /// Connect once and process messages until disconnection. Reconnection
    /// and backoff live in `spawn`; this only ever returns `Err` — a clean
    /// `Close` frame is still treated as "try again" at this layer.
    async fn connect_and_process(
        &self,
        sender: &mpsc::UnboundedSender<MarketEvent>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(symbol = %self.symbol, url = %self.url, "connecting to market data stream");
        let (ws_stream, _) = connect_async(&self.url).await?;
        info!(symbol = %self.symbol, "market data stream connected");

        let (mut write, mut read) = ws_stream.split();

        let ping_symbol = self.symbol.clone();
        let ping_handle = tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(30)).await;
                debug!(symbol = %ping_symbol, "sending keepalive ping");
            }
        });

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match parse_event(&text) {
                    Ok(event) => {
                        if sender.send(event).is_err() {
                            info!(symbol = %self.symbol, "event receiver dropped, closing stream");
                            break;
                        }
                    }
                    Err(reason) => {
                        warn!(symbol = %self.symbol, reason = %reason, "dropping malformed wire message");
                    }
                },
                Ok(Message::Ping(data)) => {
                    if write.send(Message::Pong(data)).await.is_err() {
                        warn!(symbol = %self.symbol, "failed to send pong");
                        break;
                    }
                }
                Ok(Message::Pong(_)) => debug!(symbol = %self.symbol, "received pong"),
                Ok(Message::Close(frame)) => {
                    info!(symbol = %self.symbol, frame = ?frame, "close frame received");
                    break;
                }
                Ok(Message::Binary(_)) => warn!(symbol = %self.symbol, "unexpected binary message"),
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    error!(symbol = %self.symbol, error = %e, "market data stream error");
                    break;
                }
            }
        }

        ping_handle.abort();
        Err("market data stream disconnected".into())
    }
}

impl MarketDataSource for WebSocketMarketDataSource {
    fn spawn(self: Box<Self>, sender: mpsc::UnboundedSender<MarketEvent>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut retry_count = 0u32;
            loop {
                match self.connect_and_process(&sender).await {
                    Ok(()) => {
                        info!(symbol = %self.symbol, "market data stream closed normally");
                        break;
                    }
                    Err(e) => {
                        let delay_secs = std::cmp::min(2_u64.pow(retry_count), MAX_RECONNECT_DELAY_SECS);
                        warn!(
                            symbol = %self.symbol,
                            error = %e,
                            retry_count,
                            delay_secs,
                            "market data stream disconnected, reconnecting"
                        );
                        sleep(Duration::from_secs(delay_secs)).await;
                        retry_count += 1;
                        if retry_count > 10 {
                            retry_count = 0;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_l2_book_trade_and_context() {
        let book = parse_event(
            r#"{"type":"l2_book","coin":"SOL","time_ms":1000,
                "bids":[{"px":"100.0","sz":"1","n":1}],
                "asks":[{"px":"100.1","sz":"1","n":1}]}"#,
        )
        .unwrap();
        assert!(matches!(book, MarketEvent::OrderBook(_)));

        let trade = parse_event(r#"{"type":"trade","time_ms":1000,"px":"10","sz":"1","side":"B"}"#).unwrap();
        match trade {
            MarketEvent::Trade(t) => assert_eq!(t.side, TradeSide::Buy),
            _ => panic!("expected trade"),
        }

        let ctx = parse_event(
            r#"{"type":"context","time_ms":1000,"mark_px":101.0,"oracle_px":100.0,
                "funding":0.0001,"open_interest":1000000.0}"#,
        )
        .unwrap();
        assert!(matches!(ctx, MarketEvent::Context(_)));
    }

    #[test]
    fn rejects_unrecognized_trade_side() {
        let err = parse_event(r#"{"type":"trade","time_ms":0,"px":"1","sz":"1","side":"X"}"#).unwrap_err();
        assert!(err.contains("unrecognized trade side"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_event("not json").is_err());
    }
}
