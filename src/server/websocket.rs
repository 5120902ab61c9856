//! WebSocket handler — replays recent events on connect, then relays live
//! broadcasts from the event bus.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::Arc;

use super::AppState;

pub(super) async fn handler_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe_ws();
    ws.on_upgrade(|socket| ws_loop(socket, state, event_rx))
}

async fn ws_loop(
    mut socket: WebSocket,
    state: Arc<AppState>,
    mut event_rx: tokio::sync::broadcast::Receiver<String>,
) {
    // Snapshot so a reconnecting client catches up before live traffic.
    let recent = state.event_bus.recent_events(20);
    let snapshot = json!({ "type": "snapshot", "events": recent }).to_string();
    if socket.send(Message::Text(snapshot.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            result = event_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if socket.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(_) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }
}
