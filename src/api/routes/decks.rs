use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{Deck, NewDeck};

/// All decks, grouped by owning player.
pub async fn list_decks(State(state): State<AppState>) -> Result<Json<Vec<Deck>>, ApiError> {
    Ok(Json(state.store.list_decks(true).await?))
}

pub async fn list_player_decks(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Deck>>, ApiError> {
    Ok(Json(state.store.list_decks_for_player(&name).await?))
}

pub async fn create_deck(
    State(state): State<AppState>,
    Json(deck): Json<NewDeck>,
) -> Result<(StatusCode, Json<Deck>), ApiError> {
    let stored = state.store.insert_deck(&deck).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
