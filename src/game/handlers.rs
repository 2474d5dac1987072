use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::UserClaims;
use crate::game::service::{GameView, NukeResult};
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Tracker player ids in seating order.
    pub player_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtractRequest {
    pub target_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NukeRequest {
    pub detonator_id: String,
    /// Survivor choice resolving an earlier conflict response.
    #[serde(default)]
    pub survivor_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub applied: bool,
    pub game: GameView,
}

/// Nuke outcomes carry their own status codes: a conflict answers 409 with
/// the candidate list so the client can ask for a survivor and retry.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NukeResponse {
    Applied { game: GameView },
    Conflict { candidates: Vec<String> },
    NotApplied { game: GameView },
}

impl IntoResponse for NukeResponse {
    fn into_response(self) -> Response {
        let status = match &self {
            NukeResponse::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::OK,
        };
        (status, Json(self)).into_response()
    }
}

/// POST /trackers/{tracker_id}/games
#[instrument(name = "create_game", skip(state, claims, request))]
pub async fn create_game(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(tracker_id): Path<String>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<GameView>, AppError> {
    info!(
        user_id = %claims.user_id,
        tracker_id = %tracker_id,
        participants = request.player_ids.len(),
        "Creating game"
    );

    let view = state
        .game_service
        .create_game(&tracker_id, &request.player_ids)
        .await?;
    Ok(Json(view))
}

/// GET /games/{game_id}
#[instrument(name = "get_game", skip(state))]
pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    let view = state.game_service.view(&game_id).await?;
    Ok(Json(view))
}

/// POST /games/{game_id}/subtract
#[instrument(name = "subtract_life", skip(state, claims, request))]
pub async fn subtract_life(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(game_id): Path<String>,
    Json(request): Json<SubtractRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    info!(
        user_id = %claims.user_id,
        game_id = %game_id,
        target_id = %request.target_id,
        "Subtracting a life"
    );

    let result = state
        .game_service
        .subtract_life(&game_id, &request.target_id)
        .await?;
    Ok(Json(ActionResponse {
        applied: result.applied,
        game: result.game,
    }))
}

/// POST /games/{game_id}/nuke
#[instrument(name = "detonate_nuke", skip(state, claims, request))]
pub async fn detonate_nuke(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(game_id): Path<String>,
    Json(request): Json<NukeRequest>,
) -> Result<NukeResponse, AppError> {
    info!(
        user_id = %claims.user_id,
        game_id = %game_id,
        detonator_id = %request.detonator_id,
        "Detonating nuke"
    );

    let result = state
        .game_service
        .detonate_nuke(
            &game_id,
            &request.detonator_id,
            request.survivor_id.as_deref(),
        )
        .await?;
    Ok(match result {
        NukeResult::Applied(game) => NukeResponse::Applied { game },
        NukeResult::Conflict { candidates } => NukeResponse::Conflict { candidates },
        NukeResult::NotApplied(game) => NukeResponse::NotApplied { game },
    })
}

/// POST /games/{game_id}/undo
#[instrument(name = "undo_round", skip(state, _claims))]
pub async fn undo(
    State(state): State<AppState>,
    Extension(_claims): Extension<UserClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    let view = state.game_service.undo(&game_id).await?;
    Ok(Json(view))
}

/// POST /games/{game_id}/redo
#[instrument(name = "redo_round", skip(state, _claims))]
pub async fn redo(
    State(state): State<AppState>,
    Extension(_claims): Extension<UserClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    let view = state.game_service.redo(&game_id).await?;
    Ok(Json(view))
}

/// POST /games/{game_id}/reset
#[instrument(name = "reset_game", skip(state, claims))]
pub async fn reset(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    info!(user_id = %claims.user_id, game_id = %game_id, "Resetting game");
    let view = state.game_service.reset(&game_id).await?;
    Ok(Json(view))
}

/// POST /games/{game_id}/cancel
#[instrument(name = "cancel_game", skip(state, claims))]
pub async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    info!(user_id = %claims.user_id, game_id = %game_id, "Cancelling game");
    let view = state.game_service.cancel(&game_id).await?;
    Ok(Json(view))
}
