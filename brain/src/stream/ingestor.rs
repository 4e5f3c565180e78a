//! Persistent WebSocket ingest loop (spec §4.D).
//!
//! Subscribes to trade and quote prints for the four-symbol universe and
//! dispatches them into the Indicator Store. Reconnects with the backoff
//! ladder 1s/2s/5s, capped at 30s, resetting to 1s after any connection
//! that stays up more than 60s — the same shape as the teacher's
//! `services/market_data.rs` stream loop.

use crate::broker::client::BrokerClient;
use crate::gateclient::client::GateClient;
use crate::gateclient::sync_state::GateSyncState;
use crate::indicators::store::IndicatorStore;
use crate::position::manager::PositionManager;
use crate::regime::{self, RegimeInputs};
use crate::strategies::common::ThrottleState;
use crate::strategies::dispatch;
use crate::stream::session_window::{in_session_window, now_eastern};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use options_engine_core::types::UNIVERSE;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

const BACKOFF_LADDER: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(5),
];
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const STABLE_CONNECTION_THRESHOLD: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamMessage {
    Trade {
        symbol: String,
        price: f64,
        size: f64,
        ts: chrono::DateTime<Utc>,
    },
    Quote {
        symbol: String,
        bid: f64,
        ask: f64,
        ts: chrono::DateTime<Utc>,
    },
}

fn stream_url(ws_base: &str, token: &str) -> String {
    format!("{ws_base}/v1/stream?token={token}")
}

/// Runs forever. Pauses outside the trading-session window rather than
/// holding an idle socket open, and resumes cleanly at the next window.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    broker: Arc<BrokerClient>,
    store: Arc<IndicatorStore>,
    gate: Arc<GateClient>,
    gate_sync: Arc<GateSyncState>,
    throttle: Arc<Mutex<ThrottleState>>,
    positions: Arc<Mutex<PositionManager>>,
    ws_base: String,
) {
    let mut backoff_idx = 0usize;

    loop {
        if !in_session_window(now_eastern()) {
            tokio::time::sleep(Duration::from_secs(30)).await;
            continue;
        }

        let token = match broker.create_stream_session().await {
            Ok(t) => t,
            Err(err) => {
                log::warn!("failed to create stream session: {err}");
                sleep_backoff(&mut backoff_idx).await;
                continue;
            }
        };

        let url = stream_url(&ws_base, &token);
        let connected_at = tokio::time::Instant::now();
        match tokio_tungstenite::connect_async(&url).await {
            Ok((mut ws, _resp)) => {
                log::info!("stream connected");
                if let Err(err) = subscribe(&mut ws).await {
                    log::warn!("stream subscribe failed: {err}");
                }

                while let Some(msg) = ws.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if let Some(symbol) = handle_message(&store, &text) {
                                evaluate_strategies(&symbol, &store, &broker, &gate, &gate_sync, &throttle, &positions).await;
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(err) => {
                            log::warn!("stream read error: {err}");
                            break;
                        }
                    }
                    if !in_session_window(now_eastern()) {
                        break;
                    }
                }
            }
            Err(err) => {
                log::warn!("stream connect failed: {err}");
            }
        }

        if connected_at.elapsed() >= STABLE_CONNECTION_THRESHOLD {
            backoff_idx = 0;
        }
        sleep_backoff(&mut backoff_idx).await;
    }
}

async fn subscribe(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let payload = serde_json::json!({
        "action": "subscribe",
        "symbols": UNIVERSE,
        "channels": ["trades", "quotes"],
    });
    ws.send(Message::Text(payload.to_string())).await
}

/// Feeds the Indicator Store and, for trade prints, returns the symbol
/// that should now be run through the strategy gates (spec §4.E: "on
/// every trade event, for the event's symbol").
fn handle_message(store: &IndicatorStore, text: &str) -> Option<String> {
    match serde_json::from_str::<StreamMessage>(text) {
        Ok(StreamMessage::Trade { symbol, price, size, ts }) => {
            store.on_trade(&symbol, price, size, ts);
            Some(symbol)
        }
        Ok(StreamMessage::Quote { symbol, bid, ask, ts }) => {
            store.on_quote(&symbol, bid, ask, ts);
            None
        }
        Err(err) => {
            log::debug!("ignoring unparseable stream message: {err}");
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn evaluate_strategies(
    symbol: &str,
    store: &IndicatorStore,
    broker: &BrokerClient,
    gate: &GateClient,
    gate_sync: &GateSyncState,
    throttle: &Mutex<ThrottleState>,
    positions: &Arc<Mutex<PositionManager>>,
) {
    let now = Utc::now();
    // The Brain does not own the restricted-date calendar (spec §3
    // ownership: the Gate exclusively owns Restricted Dates) — it is
    // mirrored here from the Gate's heartbeat acknowledgement so
    // EVENT_RISK classification doesn't lag a whole proposal round trip
    // behind the Gate's own calendar-lock check (spec §4.H step 9), which
    // remains the authoritative enforcement point.
    let inputs = RegimeInputs {
        vix: store.vix(now),
        adx_spy: store.adx("SPY", 14),
        today_is_restricted: gate_sync.is_restricted(now_eastern().date_naive()),
    };
    let regime = regime::classify(&inputs);

    let mut guard = throttle.lock().await;
    dispatch::evaluate_symbol(symbol, regime, store, broker, gate, &mut guard, positions).await;
}

async fn sleep_backoff(idx: &mut usize) {
    let delay = BACKOFF_LADDER.get(*idx).copied().unwrap_or(BACKOFF_CAP);
    log::info!("reconnecting in {delay:?}");
    tokio::time::sleep(delay).await;
    if *idx < BACKOFF_LADDER.len() {
        *idx += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_embeds_token() {
        assert_eq!(
            stream_url("wss://example.com", "abc123"),
            "wss://example.com/v1/stream?token=abc123"
        );
    }

    #[test]
    fn trade_message_parses() {
        let text = r#"{"type":"trade","symbol":"SPY","price":430.5,"size":10.0,"ts":"2026-01-02T15:00:00Z"}"#;
        match serde_json::from_str::<StreamMessage>(text).unwrap() {
            StreamMessage::Trade { symbol, price, .. } => {
                assert_eq!(symbol, "SPY");
                assert_eq!(price, 430.5);
            }
            _ => panic!("expected trade"),
        }
    }
}
