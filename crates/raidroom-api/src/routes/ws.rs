//! WebSocket transport.
//!
//! Each accepted socket gets a fresh [`ConnectionId`], registers with the
//! room actor, and is split into a writer task (room events and local errors
//! to JSON text frames) and a reader loop (text frames to room commands).
//! Closing the socket disconnects the connection from the room.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::{Router, routing::get};
use futures::sink::SinkExt;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use raidroom_core::error::DomainError;
use raidroom_core::id::ConnectionId;
use raidroom_session::application::actor::RoomHandle;
use raidroom_session::application::hub::EventReceiver;
use raidroom_session::domain::messages::{ClientCommand, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Queue depth for errors generated by the transport itself.
const LOCAL_QUEUE_CAPACITY: usize = 16;

/// Returns the WebSocket router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(websocket_handler))
}

/// GET /ws
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.room))
}

async fn handle_socket(socket: WebSocket, room: RoomHandle) {
    let conn_id = ConnectionId::new();
    let events = match room.connect(conn_id).await {
        Ok(events) => events,
        Err(e) => {
            warn!(connection_id = %conn_id, "rejecting socket: {e}");
            return;
        }
    };
    info!(connection_id = %conn_id, "WebSocket connected");

    let (sink, stream) = socket.split();
    let (local_tx, local_rx) = mpsc::channel(LOCAL_QUEUE_CAPACITY);

    let writer = tokio::spawn(write_events(sink, events, local_rx));

    read_commands(stream, conn_id, &room, &local_tx).await;

    if let Err(e) = room.disconnect(conn_id).await {
        debug!(connection_id = %conn_id, "disconnect not delivered: {e}");
    }
    writer.abort();
    info!(connection_id = %conn_id, "WebSocket disconnected");
}

/// Forwards room events and transport errors to the socket until either
/// source closes or a write fails.
async fn write_events(
    mut sink: SplitSink<WebSocket, Message>,
    mut events: EventReceiver,
    mut local: mpsc::Receiver<ServerEvent>,
) {
    loop {
        let event = tokio::select! {
            Some(event) = events.recv() => event,
            Some(event) = local.recv() => event,
            else => break,
        };

        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to serialize event: {e}");
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(text.into())).await {
            debug!("socket write failed: {e}");
            break;
        }
    }
}

async fn read_commands(
    mut stream: SplitStream<WebSocket>,
    conn_id: ConnectionId,
    room: &RoomHandle,
    local: &mpsc::Sender<ServerEvent>,
) {
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!(connection_id = %conn_id, "WebSocket receive error: {e}");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                let command = match serde_json::from_str::<ClientCommand>(text.as_str()) {
                    Ok(command) => command,
                    Err(e) => {
                        debug!(connection_id = %conn_id, "unparseable command: {e}");
                        let reply = ServerEvent::error(
                            "invalid_message",
                            format!("invalid message format: {e}"),
                        );
                        if local.try_send(reply).is_err() {
                            warn!(connection_id = %conn_id, "local queue full, dropping error");
                        }
                        continue;
                    }
                };
                if let Err(e) = dispatch(room, conn_id, command).await {
                    warn!(connection_id = %conn_id, "room rejected command: {e}");
                    break;
                }
            }
            Message::Binary(data) => {
                debug!(connection_id = %conn_id, bytes = data.len(), "ignoring binary frame");
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

async fn dispatch(
    room: &RoomHandle,
    conn_id: ConnectionId,
    command: ClientCommand,
) -> Result<(), DomainError> {
    match command {
        ClientCommand::Join { character } => room.join(conn_id, character).await,
        ClientCommand::SubmitAction { text } => room.submit_action(conn_id, text).await,
        ClientCommand::Start => room.start(conn_id).await,
    }
}
