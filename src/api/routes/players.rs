use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{NewPlayer, Player};

pub async fn list_players(State(state): State<AppState>) -> Result<Json<Vec<Player>>, ApiError> {
    Ok(Json(state.store.list_players().await?))
}

pub async fn create_player(
    State(state): State<AppState>,
    Json(player): Json<NewPlayer>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let stored = state.store.insert_player(&player).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
