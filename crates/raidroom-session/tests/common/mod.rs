//! Shared helpers for room actor integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use raidroom_core::id::ConnectionId;
use raidroom_core::rng::DeterministicRng;
use raidroom_encounter::domain::template::shadow_drake;
use raidroom_oracle::Oracle;
use raidroom_session::application::actor::{RoomActor, RoomHandle};
use raidroom_session::application::config::RoomConfig;
use raidroom_session::application::hub::EventReceiver;
use raidroom_session::application::room::Room;
use raidroom_session::domain::messages::ServerEvent;
use raidroom_test_support::{MockRng, character, fixed_clock};
use tokio::task::JoinHandle;

/// Spawns a room with the default configuration and `MockRng`.
pub fn spawn_room(oracle: Arc<dyn Oracle>) -> (RoomHandle, JoinHandle<()>) {
    spawn_room_with_rng(oracle, Box::new(MockRng))
}

/// Spawns a room with the default configuration and the given RNG.
pub fn spawn_room_with_rng(
    oracle: Arc<dyn Oracle>,
    rng: Box<dyn DeterministicRng>,
) -> (RoomHandle, JoinHandle<()>) {
    let room = Room::new(shadow_drake().unwrap(), RoomConfig::default());
    RoomActor::spawn(room, oracle, Arc::new(fixed_clock()), rng)
}

/// Connects and joins a fresh connection.
pub async fn join(handle: &RoomHandle, name: &str, max_health: i64) -> (ConnectionId, EventReceiver) {
    let id = ConnectionId::new();
    let events = handle.connect(id).await.unwrap();
    handle.join(id, character(name, max_health)).await.unwrap();
    (id, events)
}

/// Text of a log event.
pub fn log_text(event: &ServerEvent) -> Option<&str> {
    match event {
        ServerEvent::LogMessage(entry) => Some(entry.text.as_str()),
        _ => None,
    }
}

/// Receives events until one satisfies `done`, returning everything seen
/// including that event. Fails the test after ten virtual minutes.
pub async fn collect_until<F>(events: &mut EventReceiver, done: F) -> Vec<ServerEvent>
where
    F: Fn(&ServerEvent) -> bool,
{
    let mut seen = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(600), async {
        while let Some(event) = events.recv().await {
            let finished = done(&event);
            seen.push(event);
            if finished {
                return true;
            }
        }
        false
    })
    .await;
    assert_eq!(result, Ok(true), "condition not met; saw {seen:#?}");
    seen
}

/// Receives events until a log entry with exactly `text` arrives.
pub async fn collect_until_log(events: &mut EventReceiver, text: &str) -> Vec<ServerEvent> {
    collect_until(events, |event| log_text(event) == Some(text)).await
}

/// Log texts among `events`, in order.
pub fn log_texts(events: &[ServerEvent]) -> Vec<&str> {
    events.iter().filter_map(log_text).collect()
}
