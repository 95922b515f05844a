//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use raidroom_encounter::domain::template::shadow_drake;
use raidroom_oracle::Oracle;
use raidroom_session::application::actor::{RoomActor, RoomHandle};
use raidroom_session::application::config::RoomConfig;
use raidroom_session::application::room::Room;
use raidroom_test_support::{MockRng, fixed_clock};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

use raidroom_api::routes;
use raidroom_api::state::AppState;

/// Client side of a test WebSocket.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Room timing for wall-clock tests: a normal window, near-instant pauses.
pub fn quick_config() -> RoomConfig {
    RoomConfig {
        phase_pause: Duration::from_millis(10),
        reset_delay: Duration::from_millis(10),
        oracle_timeout: Duration::from_secs(5),
        ..RoomConfig::default()
    }
}

/// Spawn a room actor with a fixed clock and `MockRng`.
pub fn spawn_room(oracle: Arc<dyn Oracle>, config: RoomConfig) -> (RoomHandle, JoinHandle<()>) {
    let room = Room::new(shadow_drake().unwrap(), config);
    RoomActor::spawn(room, oracle, Arc::new(fixed_clock()), Box::new(MockRng))
}

/// Build the full app router around `handle`. Uses the same route structure
/// as `main.rs`.
pub fn build_test_app(handle: RoomHandle) -> Router {
    routes::app(AppState::new(handle))
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Serve `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Open a WebSocket to `/ws`.
pub async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

/// Send a JSON text frame.
pub async fn send(client: &mut Client, message: &Value) {
    client
        .send(Message::Text(message.to_string().into()))
        .await
        .unwrap();
}

/// Send a raw text frame.
pub async fn send_raw(client: &mut Client, text: &str) {
    client.send(Message::Text(text.into())).await.unwrap();
}

/// A `join` command for a character with the given health.
pub fn join_command(name: &str, max_health: i64) -> Value {
    json!({
        "type": "join",
        "character": {
            "name": name,
            "description": "A test adventurer.",
            "background_info": { "personality": "Brave" },
            "game_stats": {
                "base_stats": { "general": { "max_health": max_health } },
                "abilities": [],
                "statusEffects": []
            }
        }
    })
}

/// Next JSON text frame. Fails the test after five seconds.
pub async fn next_event(client: &mut Client) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str::<Value>(text.as_str()).unwrap(),
                Some(Ok(_)) => {}
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    })
    .await;
    match frame {
        Ok(value) => value,
        Err(_) => panic!("timed out waiting for an event"),
    }
}

/// Reads events until one matches `done`, returning everything seen
/// including that event.
pub async fn collect_until<F>(client: &mut Client, done: F) -> Vec<Value>
where
    F: Fn(&Value) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let event = next_event(client).await;
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

/// Reads events until a log message with exactly `text`.
pub async fn collect_until_log(client: &mut Client, text: &str) -> Vec<Value> {
    collect_until(client, |e| e["type"] == "log_message" && e["text"] == text).await
}

/// Reads events until one with the given `type`.
pub async fn collect_until_type(client: &mut Client, kind: &str) -> Vec<Value> {
    collect_until(client, |e| e["type"] == kind).await
}
