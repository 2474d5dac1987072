use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::auth::UserClaims;
use crate::shared::{AppError, AppState};
use crate::tracker::models::{NewTrackerPlayer, TrackerType};
use crate::tracker::service::TrackerView;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackerRequest {
    pub name: String,
    pub tracker_type: TrackerType,
    pub players: Vec<NewTrackerPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveTrackerRequest {
    #[serde(default = "default_archived")]
    pub archived: bool,
}

fn default_archived() -> bool {
    true
}

/// POST /trackers
#[instrument(name = "create_tracker", skip(state, claims, request))]
pub async fn create_tracker(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(request): Json<CreateTrackerRequest>,
) -> Result<Json<TrackerView>, AppError> {
    info!(user_id = %claims.user_id, name = %request.name, "Creating tracker");

    let view = state
        .tracker_service
        .create_tracker(
            &request.name,
            request.tracker_type,
            &claims.user_id,
            request.players,
        )
        .await?;
    Ok(Json(view))
}

/// GET /trackers/{tracker_id}
#[instrument(name = "get_tracker", skip(state))]
pub async fn get_tracker(
    State(state): State<AppState>,
    Path(tracker_id): Path<String>,
) -> Result<Json<TrackerView>, AppError> {
    let view = state.tracker_service.get_tracker(&tracker_id).await?;
    Ok(Json(view))
}

/// POST /trackers/{tracker_id}/archive
#[instrument(name = "archive_tracker", skip(state, claims))]
pub async fn archive_tracker(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(tracker_id): Path<String>,
    Json(request): Json<ArchiveTrackerRequest>,
) -> Result<Json<TrackerView>, AppError> {
    info!(
        user_id = %claims.user_id,
        tracker_id = %tracker_id,
        archived = request.archived,
        "Updating tracker archive flag"
    );

    let view = state
        .tracker_service
        .set_archived(&tracker_id, request.archived)
        .await?;
    Ok(Json(view))
}
