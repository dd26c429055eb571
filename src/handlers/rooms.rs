use axum::{extract::{Path, State}, http::StatusCode, Json};
use tracing::debug;

use crate::models::{ErrorResponse, RoomListResponse, RoomSummaryResponse};
use crate::ws::roommeta::RoomSnapshot;
use crate::ws::wscolab::ColabHub;
use crate::AppState;

fn summarize(hub: &ColabHub, room: RoomSnapshot) -> RoomSummaryResponse {
    RoomSummaryResponse {
        cleanup_pending: hub.cleanup().is_pending(&room.name),
        has_document: hub.docs().get(&room.name).is_some(),
        name: room.name,
        created_at: room.created_at,
        last_activity_at: room.last_activity_at,
        member_count: room.member_count as u32,
    }
}

/// List all live rooms
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomListResponse> {
    let rooms = state
        .hub
        .rooms()
        .snapshot()
        .into_iter()
        .map(|room| summarize(&state.hub, room))
        .collect::<Vec<_>>();
    debug!("Listing {} room(s)", rooms.len());
    Json(RoomListResponse { rooms })
}

/// Get a single room
pub async fn get_room(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RoomSummaryResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.hub.rooms().get(&name) {
        Some(room) => Ok(Json(summarize(&state.hub, room))),
        None => Err(ErrorResponse::reply(
            StatusCode::NOT_FOUND,
            format!("Room '{}' not found", name),
        )),
    }
}
