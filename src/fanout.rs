//! Outbound WebSocket fan-out (reference sink, §10.3).
//!
//! One `tokio::sync::broadcast` channel per symbol; each 1 Hz snapshot is
//! serialized once and pushed to every subscriber. A client that falls
//! behind the channel's capacity is disconnected rather than allowed to
//! back-pressure the emit task — the same axum + CORS layering this
//! codebase's HTTP transport uses, simplified from its JSON-RPC session
//! protocol down to a plain broadcast subscribe.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::snapshot::Snapshot;

/// Registry of per-symbol broadcast channels, shared by the axum router
/// and every session that publishes into it.
#[derive(Clone, Default)]
pub struct FanoutState {
    channels: Arc<RwLock<BTreeMap<String, broadcast::Sender<Arc<Snapshot>>>>>,
}

impl FanoutState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session's outbound channel under its symbol. A second
    /// registration for the same symbol replaces the first.
    pub fn register(&self, symbol: String, sender: broadcast::Sender<Arc<Snapshot>>) {
        self.channels.write().unwrap().insert(symbol, sender);
    }

    fn channel_for(&self, symbol: &str) -> Option<broadcast::Sender<Arc<Snapshot>>> {
        self.channels.read().unwrap().get(symbol).cloned()
    }

    /// Push one tick's snapshot to every subscriber of `symbol`. A no-op if
    /// nobody registered that symbol or nobody is currently subscribed.
    pub fn publish(&self, symbol: &str, snapshot: Arc<Snapshot>) {
        if let Some(sender) = self.channel_for(symbol) {
            let _ = sender.send(snapshot);
        }
    }
}

/// Bind and serve the fan-out endpoint until the process shuts down.
/// `GET /ws/{symbol}` upgrades to a WebSocket that streams that symbol's
/// snapshots at whatever cadence the session's emit task publishes them.
pub async fn serve(bind_addr: &str, state: FanoutState) -> anyhow::Result<()> {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = Router::new().route("/ws/{symbol}", get(ws_handler)).layer(cors).with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "fan-out WebSocket listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ws_handler(
    Path(symbol): Path<String>,
    State(state): State<FanoutState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    match state.channel_for(&symbol) {
        Some(sender) => ws.on_upgrade(move |socket| handle_socket(socket, symbol, sender)),
        None => (StatusCode::NOT_FOUND, format!("no session running for symbol '{symbol}'")).into_response(),
    }
}

async fn handle_socket(mut socket: WebSocket, symbol: String, sender: broadcast::Sender<Arc<Snapshot>>) {
    let client_id = uuid::Uuid::new_v4();
    debug!(%client_id, %symbol, "fan-out client connected");
    let mut rx = sender.subscribe();

    loop {
        match rx.recv().await {
            Ok(snapshot) => {
                let payload = match serde_json::to_string(&*snapshot) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(%client_id, error = %e, "failed to serialize snapshot, skipping tick");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(%client_id, %symbol, skipped, "client fell behind fan-out capacity, disconnecting");
                break;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    debug!(%client_id, %symbol, "fan-out client disconnected");
}
