use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::str::FromStr;
use tracing::instrument;

use crate::leaderboard::metrics::Metric;
use crate::leaderboard::ranking::RankedEntry;
use crate::shared::{AppError, AppState};
use crate::tracker::models::TrackerType;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    /// Comma-separated tracker ids narrowing the corpus.
    #[serde(default)]
    pub tracker_ids: Option<String>,
}

/// GET /leaderboard/{tracker_type}/{metric}
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path((tracker_type, metric)): Path<(String, String)>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<RankedEntry>>, AppError> {
    let tracker_type = TrackerType::from_str(&tracker_type)
        .map_err(|_| AppError::BadRequest(format!("Unknown tracker type: {}", tracker_type)))?;
    let metric = Metric::from_str(&metric)
        .map_err(|_| AppError::BadRequest(format!("Unknown metric: {}", metric)))?;

    let tracker_ids: Option<Vec<String>> = query.tracker_ids.map(|ids| {
        ids.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    });

    let board = state
        .leaderboard_service
        .compute(tracker_type, metric, tracker_ids.as_deref())
        .await?;
    Ok(Json(board))
}
