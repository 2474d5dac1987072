use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::shared::AppError;
use crate::tracker::models::{NewTrackerPlayer, TrackerModel, TrackerPlayerModel, TrackerType};
use crate::tracker::repository::TrackerRepository;

/// A tracker together with its player roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerView {
    pub tracker: TrackerModel,
    pub players: Vec<TrackerPlayerModel>,
}

pub struct TrackerService {
    repository: Arc<dyn TrackerRepository>,
}

impl TrackerService {
    pub fn new(repository: Arc<dyn TrackerRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, players))]
    pub async fn create_tracker(
        &self,
        name: &str,
        tracker_type: TrackerType,
        created_by: &str,
        players: Vec<NewTrackerPlayer>,
    ) -> Result<TrackerView, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Tracker name cannot be empty".to_string(),
            ));
        }
        if players.len() < 2 {
            return Err(AppError::BadRequest(
                "A tracker needs at least two players".to_string(),
            ));
        }
        if players.iter().any(|p| p.display_name.trim().is_empty()) {
            return Err(AppError::BadRequest(
                "Player display names cannot be empty".to_string(),
            ));
        }

        let tracker = TrackerModel::new(
            name.trim().to_string(),
            tracker_type,
            created_by.to_string(),
        );
        let tracker = self.repository.create_tracker(&tracker, &players).await?;
        debug!(tracker_id = %tracker.id, "Tracker created");
        self.get_tracker(&tracker.id).await
    }

    pub async fn get_tracker(&self, tracker_id: &str) -> Result<TrackerView, AppError> {
        let tracker = self
            .repository
            .get_tracker(tracker_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tracker not found: {}", tracker_id)))?;
        let players = self.repository.list_players(tracker_id).await?;
        Ok(TrackerView { tracker, players })
    }

    #[instrument(skip(self))]
    pub async fn set_archived(
        &self,
        tracker_id: &str,
        archived: bool,
    ) -> Result<TrackerView, AppError> {
        self.repository.set_archived(tracker_id, archived).await?;
        self.get_tracker(tracker_id).await
    }
}
