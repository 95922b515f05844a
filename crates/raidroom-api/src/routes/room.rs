//! Read-only room inspection.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use raidroom_session::application::room::RoomView;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/room
#[instrument(skip(state))]
async fn get_room(State(state): State<AppState>) -> Result<Json<RoomView>, ApiError> {
    let view = state.room.view().await?;
    Ok(Json(view))
}

/// Returns the router for room inspection.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_room))
}
