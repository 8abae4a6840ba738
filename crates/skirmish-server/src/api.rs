use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use skirmish_core::game::GameMode;
use skirmish_core::room::is_valid_room_code;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub rooms: usize,
    pub players: usize,
    pub connections: usize,
}

/// Server-wide room, player and connection counts.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (rooms, players) = state.rooms.read().await.stats();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        rooms,
        players,
        connections: state.ws_connection_count.load(Ordering::Relaxed),
    })
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub code: String,
    pub mode: GameMode,
    pub players: usize,
    pub waiting: bool,
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    if !is_valid_room_code(&code) {
        return Err(AppError::BadRequest(format!("Malformed room code: {code}")));
    }
    let rooms = state.rooms.read().await;
    let info = rooms
        .room_info(&code)
        .ok_or_else(|| AppError::NotFound(format!("Room {code} not found")))?;
    Ok(Json(RoomResponse {
        code: info.code,
        mode: info.mode,
        players: info.players,
        waiting: info.waiting,
    }))
}
