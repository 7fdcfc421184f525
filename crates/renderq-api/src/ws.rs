//! WebSocket handling for real-time updates.
//!
//! Each connection receives every [`JobEvent`] as a JSON text frame. Events
//! are hints: clients re-fetch `/jobs` or `/job/{id}` to see the new state.
//! A client that falls behind the event buffer gets a `resync` message and
//! should reload everything it shows.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use renderq_core::JobEvent;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before the upgrade completes so no event slips in between.
    let events = state.tracker.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(socket: WebSocket, events: broadcast::Receiver<JobEvent>) {
    let (sink, stream) = socket.split();
    forward_events(sink, stream, events).await;
}

/// Pump job events into `sink` until the client closes `stream` or the
/// notifier goes away.
///
/// Inbound frames other than Close are ignored.
pub async fn forward_events<S, R, E>(
    mut sink: S,
    mut stream: R,
    mut events: broadcast::Receiver<JobEvent>,
) where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let conn_id = uuid::Uuid::new_v4();
    info!(conn_id = %conn_id, "WebSocket connection established");

    loop {
        tokio::select! {
            event = events.recv() => {
                let message = match event {
                    Ok(event) => {
                        debug!(
                            conn_id = %conn_id,
                            job_id = ?event.job_id(),
                            "Forwarding job event"
                        );
                        WsMessage::Event(event)
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(conn_id = %conn_id, skipped, "WebSocket client lagged");
                        WsMessage::Control(Control::Resync)
                    }
                    Err(RecvError::Closed) => break,
                };
                let Ok(json) = serde_json::to_string(&message) else {
                    continue;
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    debug!(conn_id = %conn_id, "WebSocket sink closed");
                    break;
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        }
    }

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WsMessage {
    Event(JobEvent),
    Control(Control),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Control {
    Resync,
}
