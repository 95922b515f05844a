//! Shared application state.

use raidroom_session::application::actor::RoomHandle;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the room actor. Every read and write goes through it.
    pub room: RoomHandle,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(room: RoomHandle) -> Self {
        Self { room }
    }
}
