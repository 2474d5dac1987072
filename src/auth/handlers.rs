use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::shared::{AppError, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Chosen display name; a generated pet name is used when omitted.
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
}

/// POST /auth/session
///
/// Issues a signed session token. This is the minimal stand-in for the
/// external authentication collaborator so the API can be exercised end to
/// end; everything past token validation trusts the carried identity.
#[instrument(name = "create_session", skip(state, request))]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let username = match request.username {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => petname::Petnames::default().generate_one(2, "-"),
    };
    let user_id = Uuid::new_v4().to_string();

    let token = state
        .token_config
        .create_token(user_id.clone(), username.clone())?;

    info!(user_id = %user_id, username = %username, "Session created");
    Ok(Json(SessionResponse {
        token,
        user_id,
        username,
    }))
}
