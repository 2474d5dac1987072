use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::shared::AppError;
use crate::tracker::models::{NewTrackerPlayer, TrackerModel, TrackerPlayerModel, TrackerType};

#[async_trait]
pub trait TrackerRepository: Send + Sync {
    /// Creates the tracker with its player roster. Duplicate display names
    /// within one tracker violate a constraint and are rejected.
    async fn create_tracker(
        &self,
        tracker: &TrackerModel,
        players: &[NewTrackerPlayer],
    ) -> Result<TrackerModel, AppError>;

    async fn get_tracker(&self, tracker_id: &str) -> Result<Option<TrackerModel>, AppError>;

    async fn list_players(&self, tracker_id: &str) -> Result<Vec<TrackerPlayerModel>, AppError>;

    async fn set_archived(&self, tracker_id: &str, archived: bool) -> Result<(), AppError>;
}

#[derive(Clone)]
struct StoredTracker {
    tracker: TrackerModel,
    players: Vec<TrackerPlayerModel>,
}

/// In-memory implementation for development and testing.
#[derive(Default)]
pub struct InMemoryTrackerRepository {
    trackers: Arc<RwLock<HashMap<String, StoredTracker>>>,
}

impl InMemoryTrackerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackerRepository for InMemoryTrackerRepository {
    #[instrument(skip(self, tracker, players))]
    async fn create_tracker(
        &self,
        tracker: &TrackerModel,
        players: &[NewTrackerPlayer],
    ) -> Result<TrackerModel, AppError> {
        let mut names = std::collections::HashSet::new();
        for player in players {
            if !names.insert(player.display_name.as_str()) {
                warn!(tracker_id = %tracker.id, "Duplicate participant display name");
                return Err(AppError::Conflict(
                    "Participant names must be unique".to_string(),
                ));
            }
        }

        let players = players
            .iter()
            .map(|p| TrackerPlayerModel {
                id: Uuid::new_v4().to_string(),
                tracker_id: tracker.id.clone(),
                display_name: p.display_name.clone(),
                user_id: p.user_id.clone(),
            })
            .collect();

        let mut trackers = self.trackers.write().await;
        trackers.insert(
            tracker.id.clone(),
            StoredTracker {
                tracker: tracker.clone(),
                players,
            },
        );
        debug!(tracker_id = %tracker.id, "Tracker created in memory");
        Ok(tracker.clone())
    }

    async fn get_tracker(&self, tracker_id: &str) -> Result<Option<TrackerModel>, AppError> {
        let trackers = self.trackers.read().await;
        Ok(trackers.get(tracker_id).map(|t| t.tracker.clone()))
    }

    async fn list_players(&self, tracker_id: &str) -> Result<Vec<TrackerPlayerModel>, AppError> {
        let trackers = self.trackers.read().await;
        Ok(trackers
            .get(tracker_id)
            .map(|t| t.players.clone())
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn set_archived(&self, tracker_id: &str, archived: bool) -> Result<(), AppError> {
        let mut trackers = self.trackers.write().await;
        let stored = trackers
            .get_mut(tracker_id)
            .ok_or_else(|| AppError::NotFound(format!("Tracker not found: {}", tracker_id)))?;
        stored.tracker.archived = archived;
        debug!(tracker_id = %tracker_id, archived, "Tracker archive flag updated in memory");
        Ok(())
    }
}

/// PostgreSQL implementation. The per-tracker display name uniqueness lives
/// in a unique index on (tracker_id, display_name).
pub struct PostgresTrackerRepository {
    pool: PgPool,
}

impl PostgresTrackerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_tracker(row: &sqlx::postgres::PgRow) -> Result<TrackerModel, AppError> {
        let tracker_type: String = row.get("tracker_type");
        let tracker_type = tracker_type
            .parse::<TrackerType>()
            .map_err(|e| AppError::DatabaseError(format!("Bad tracker type: {}", e)))?;
        Ok(TrackerModel {
            id: row.get("id"),
            join_code: row.get("join_code"),
            name: row.get("name"),
            tracker_type,
            archived: row.get("archived"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl TrackerRepository for PostgresTrackerRepository {
    #[instrument(skip(self, tracker, players))]
    async fn create_tracker(
        &self,
        tracker: &TrackerModel,
        players: &[NewTrackerPlayer],
    ) -> Result<TrackerModel, AppError> {
        debug!(tracker_id = %tracker.id, "Creating tracker in database");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO trackers (id, join_code, name, tracker_type, archived, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&tracker.id)
        .bind(&tracker.join_code)
        .bind(&tracker.name)
        .bind(tracker.tracker_type.to_string())
        .bind(tracker.archived)
        .bind(&tracker.created_by)
        .bind(tracker.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert tracker");
            AppError::DatabaseError(e.to_string())
        })?;

        for player in players {
            sqlx::query(
                "INSERT INTO tracker_players (id, tracker_id, display_name, user_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&tracker.id)
            .bind(&player.display_name)
            .bind(&player.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    warn!(tracker_id = %tracker.id, "Duplicate participant display name");
                    AppError::Conflict("Participant names must be unique".to_string())
                }
                _ => {
                    warn!(error = %e, "Failed to insert tracker player");
                    AppError::DatabaseError(e.to_string())
                }
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        debug!(tracker_id = %tracker.id, "Tracker created in database");
        Ok(tracker.clone())
    }

    #[instrument(skip(self))]
    async fn get_tracker(&self, tracker_id: &str) -> Result<Option<TrackerModel>, AppError> {
        let row = sqlx::query(
            "SELECT id, join_code, name, tracker_type, archived, created_by, created_at \
             FROM trackers WHERE id = $1",
        )
        .bind(tracker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(|r| Self::row_to_tracker(&r)).transpose()
    }

    #[instrument(skip(self))]
    async fn list_players(&self, tracker_id: &str) -> Result<Vec<TrackerPlayerModel>, AppError> {
        let rows = sqlx::query(
            "SELECT id, tracker_id, display_name, user_id FROM tracker_players \
             WHERE tracker_id = $1 ORDER BY display_name",
        )
        .bind(tracker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| TrackerPlayerModel {
                id: row.get("id"),
                tracker_id: row.get("tracker_id"),
                display_name: row.get("display_name"),
                user_id: row.get("user_id"),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn set_archived(&self, tracker_id: &str, archived: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE trackers SET archived = $2 WHERE id = $1")
            .bind(tracker_id)
            .bind(archived)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, tracker_id = %tracker_id, "Failed to update archive flag");
                AppError::DatabaseError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Tracker not found: {}",
                tracker_id
            )));
        }
        debug!(tracker_id = %tracker_id, archived, "Tracker archive flag updated in database");
        Ok(())
    }
}
