use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::TokenConfig;
use crate::game::repository::GameRepository;
use crate::game::service::GameService;
use crate::leaderboard::service::LeaderboardService;
use crate::tracker::repository::TrackerRepository;
use crate::tracker::service::TrackerService;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub tracker_service: Arc<TrackerService>,
    pub game_service: Arc<GameService>,
    pub leaderboard_service: Arc<LeaderboardService>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        tracker_repository: Arc<dyn TrackerRepository>,
        game_repository: Arc<dyn GameRepository>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            tracker_service: Arc::new(TrackerService::new(tracker_repository.clone())),
            game_service: Arc::new(GameService::new(
                game_repository.clone(),
                tracker_repository,
            )),
            leaderboard_service: Arc::new(LeaderboardService::new(game_repository)),
            token_config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
