//! WebSocket transport tests against a real listener, covering the connect
//! handshake contract and malformed-frame handling after admission.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use wardlink_auth::{Claims, CredentialValidator, mint_token};
use wardlink_bus::DisabledTaskPublisher;
use wardlink_core::{Identity, Priority, StaffRole};
use wardlink_hub::Hub;
use wardlink_server::{AppState, build_app};

const SECRET: &str = "ws-test-secret";

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, oneshot::Sender<()>, JoinHandle<()>) {
    let state = AppState {
        hub: Arc::new(Hub::new(Priority::High, Arc::new(DisabledTaskPublisher))),
        validator: Arc::new(CredentialValidator::new(SECRET)),
        heartbeat_secs: 30,
    };
    let app = build_app(state);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("ws://{addr}/ws"), tx, server)
}

fn token_for(id: &str, name: &str) -> String {
    let identity = Identity::new(id, name, StaffRole::Nurse, "ICU");
    mint_token(SECRET, &Claims::for_identity(&identity, 300)).unwrap()
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping heartbeat traffic. `None` once the
/// server has closed the connection.
async fn next_event(ws: &mut WsClient) -> Option<Value> {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

#[tokio::test]
async fn test_first_frame_must_be_authenticate() {
    let (url, shutdown, server) = start_server().await;
    let (mut ws, _) = connect_async(&url).await.unwrap();

    send_json(&mut ws, json!({ "event": "list-online-identities" })).await;

    let event = next_event(&mut ws).await.unwrap();
    assert_eq!(event["event"], "auth-error");

    // Not admitted: the server closes without further events.
    assert!(next_event(&mut ws).await.is_none());

    let _ = shutdown.send(());
    let _ = server.await;
}

#[tokio::test]
async fn test_bad_credential_is_rejected_and_closed() {
    let (url, shutdown, server) = start_server().await;
    let (mut ws, _) = connect_async(&url).await.unwrap();

    send_json(
        &mut ws,
        json!({ "event": "authenticate", "data": { "token": "not-a-credential" } }),
    )
    .await;

    let event = next_event(&mut ws).await.unwrap();
    assert_eq!(event["event"], "auth-error");
    assert!(next_event(&mut ws).await.is_none());

    let _ = shutdown.send(());
    let _ = server.await;
}

#[tokio::test]
async fn test_valid_credential_gets_admission_snapshot() {
    let (url, shutdown, server) = start_server().await;
    let (mut ws, _) = connect_async(&url).await.unwrap();

    send_json(
        &mut ws,
        json!({ "event": "authenticate", "data": { "token": token_for("u-a", "Avery Chen") } }),
    )
    .await;

    let event = next_event(&mut ws).await.unwrap();
    assert_eq!(event["event"], "authenticated");
    assert_eq!(event["data"]["identity"]["id"], "u-a");
    assert_eq!(event["data"]["online"].as_array().unwrap().len(), 1);
    assert_eq!(event["data"]["online"][0]["status"], "available");

    let _ = shutdown.send(());
    let _ = server.await;
}

#[tokio::test]
async fn test_malformed_event_is_rejected_but_connection_survives() {
    let (url, shutdown, server) = start_server().await;
    let (mut ws, _) = connect_async(&url).await.unwrap();

    send_json(
        &mut ws,
        json!({ "event": "authenticate", "data": { "token": token_for("u-a", "Avery Chen") } }),
    )
    .await;
    let event = next_event(&mut ws).await.unwrap();
    assert_eq!(event["event"], "authenticated");

    ws.send(Message::Text("{ this is not an event".to_string()))
        .await
        .unwrap();

    let event = next_event(&mut ws).await.unwrap();
    assert_eq!(event["event"], "error");
    assert_eq!(event["data"]["code"], "malformed-event");

    // Same socket keeps serving well-formed events.
    send_json(&mut ws, json!({ "event": "list-online-identities" })).await;
    let event = next_event(&mut ws).await.unwrap();
    assert_eq!(event["event"], "online-identities");
    assert_eq!(event["data"]["identities"][0]["id"], "u-a");

    let _ = shutdown.send(());
    let _ = server.await;
}
