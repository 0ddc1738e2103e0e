//! The `/ws` endpoint: handshake, select loop, and teardown.
//!
//! A connection must authenticate with its first frame. On success it is
//! admitted to the registry and enters the select loop: inbound frames are
//! parsed and dispatched, outbound events are drained from the session
//! channel, and heartbeat pings go out on a timer. Closing the transport
//! removes the session immediately, so in-flight pushes to this connection
//! fail over to the unreachable branch instead of blocking teardown.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;

use wardlink_core::Identity;
use wardlink_hub::{ClientEvent, ErrorCode, ServerEvent, SessionHandle};

use crate::AppState;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let Some(identity) = handshake(&mut sender, &mut receiver, &state).await else {
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    let identity_id = identity.id.clone();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(32);
    let handle = SessionHandle::new(tx);
    let conn_id = handle.conn_id();
    let ctx = state.hub.admit(identity, handle).await;

    tracing::info!(identity_id = %identity_id, conn_id = %conn_id, "Connection admitted");

    let mut heartbeat = interval(Duration::from_secs(state.heartbeat_secs));

    loop {
        tokio::select! {
            // Inbound frames from the client
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => state.hub.dispatch(&ctx, event).await,
                            Err(e) => {
                                // Reject the event, keep the connection.
                                let error = ServerEvent::Error {
                                    code: ErrorCode::MalformedEvent,
                                    message: e.to_string(),
                                };
                                if !send_event(&mut sender, &error).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(conn_id = %conn_id, "Client closed WebSocket");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            // Outbound events queued for this session
            event = rx.recv() => {
                match event {
                    Some(ServerEvent::SessionReplaced) => {
                        send_event(&mut sender, &ServerEvent::SessionReplaced).await;
                        tracing::debug!(conn_id = %conn_id, "Session superseded, closing");
                        break;
                    }
                    Some(event) => {
                        if !send_event(&mut sender, &event).await {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Keep the connection warm
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Guarded by conn_id: if this connection was superseded, its successor's
    // registration survives this removal.
    state.hub.registry().remove(&identity_id, conn_id).await;
    tracing::info!(identity_id = %identity_id, conn_id = %conn_id, "Connection closed");
}

/// Run the connect handshake.
///
/// The first text frame must be an `authenticate` event carrying a valid
/// credential; anything else gets an `auth-error` event and `None`, and the
/// caller closes without admitting the connection.
async fn handshake(
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
) -> Option<Identity> {
    loop {
        match receiver.next().await? {
            Ok(Message::Text(text)) => {
                let token = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::Authenticate { token }) => token,
                    Ok(_) => {
                        reject(sender, "first event must be authenticate").await;
                        return None;
                    }
                    Err(_) => {
                        reject(sender, "malformed handshake event").await;
                        return None;
                    }
                };

                return match state.validator.validate(&token) {
                    Ok(identity) => Some(identity),
                    Err(e) => {
                        tracing::debug!(error = %e, "Credential rejected");
                        reject(sender, &e.to_string()).await;
                        None
                    }
                };
            }
            Ok(Message::Ping(data)) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    return None;
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

async fn reject(sender: &mut SplitSink<WebSocket, Message>, message: &str) {
    let event = ServerEvent::AuthError {
        message: message.to_string(),
    };
    send_event(sender, &event).await;
}

/// Serialize and send one event. Returns `false` when the socket is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &ServerEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server event");
            true
        }
    }
}
