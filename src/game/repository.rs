use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::game::models::{
    CompletedGame, GameData, GameModel, GameParticipantModel, GameRoundModel, GameStatus,
    NewParticipant,
};
use crate::game::round::RoundSnapshot;
use crate::shared::AppError;
use crate::tracker::models::TrackerType;

/// Persistence boundary for games, their participants, and their round logs.
///
/// Round mutations (`create_round`, `delete_rounds_after`) are accepted only
/// for ACTIVE games. This is the one invariant enforced at the persistence
/// boundary: a stale client finishing an action after the game already ended
/// gets a rejection rather than corrupting a terminal game.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Creates the game, its participants, and the round 0 snapshot.
    async fn create_game(
        &self,
        tracker_id: &str,
        participants: &[NewParticipant],
    ) -> Result<GameModel, AppError>;

    async fn get_game(&self, game_id: &str) -> Result<Option<GameModel>, AppError>;

    async fn list_participants(
        &self,
        game_id: &str,
    ) -> Result<Vec<GameParticipantModel>, AppError>;

    async fn list_rounds(&self, game_id: &str) -> Result<Vec<GameRoundModel>, AppError>;

    /// Fails if the game is missing, not ACTIVE, or the round already exists.
    async fn create_round(
        &self,
        game_id: &str,
        round: u32,
        data: &RoundSnapshot,
    ) -> Result<(), AppError>;

    /// Deletes all rounds with `round > after`; ACTIVE games only. Returns
    /// the number of deleted rounds.
    async fn delete_rounds_after(&self, game_id: &str, after: u32) -> Result<u64, AppError>;

    async fn update_game_status(
        &self,
        game_id: &str,
        status: GameStatus,
        game_data: Option<&GameData>,
    ) -> Result<(), AppError>;

    /// Completed games of one tracker type, with participants and full round
    /// logs, for leaderboard replay. `tracker_ids` narrows to a subset of
    /// trackers when given.
    async fn list_completed_games(
        &self,
        tracker_type: TrackerType,
        tracker_ids: Option<&[String]>,
    ) -> Result<Vec<CompletedGame>, AppError>;
}

#[derive(Clone)]
struct StoredGame {
    game: GameModel,
    participants: Vec<GameParticipantModel>,
    rounds: Vec<GameRoundModel>,
}

/// In-memory implementation for development and testing. Data lives for the
/// process lifetime only.
#[derive(Default)]
pub struct InMemoryGameRepository {
    games: Arc<RwLock<HashMap<String, StoredGame>>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    #[instrument(skip(self, participants))]
    async fn create_game(
        &self,
        tracker_id: &str,
        participants: &[NewParticipant],
    ) -> Result<GameModel, AppError> {
        let game_id = Uuid::new_v4().to_string();
        let participants: Vec<GameParticipantModel> = participants
            .iter()
            .map(|p| GameParticipantModel {
                id: Uuid::new_v4().to_string(),
                game_id: game_id.clone(),
                display_name: p.display_name.clone(),
                user_id: p.user_id.clone(),
            })
            .collect();

        let seat_ids: Vec<String> = participants.iter().map(|p| p.id.clone()).collect();
        let game = GameModel {
            id: game_id.clone(),
            tracker_id: tracker_id.to_string(),
            status: GameStatus::Active,
            game_data: None,
            created_at: Utc::now(),
        };

        let stored = StoredGame {
            game: game.clone(),
            participants,
            rounds: vec![GameRoundModel {
                game_id: game_id.clone(),
                round: 0,
                data: RoundSnapshot::initial(&seat_ids),
            }],
        };

        let mut games = self.games.write().await;
        games.insert(game_id.clone(), stored);
        debug!(game_id = %game_id, tracker_id = %tracker_id, "Game created in memory");
        Ok(game)
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        let games = self.games.read().await;
        Ok(games.get(game_id).map(|g| g.game.clone()))
    }

    async fn list_participants(
        &self,
        game_id: &str,
    ) -> Result<Vec<GameParticipantModel>, AppError> {
        let games = self.games.read().await;
        Ok(games
            .get(game_id)
            .map(|g| g.participants.clone())
            .unwrap_or_default())
    }

    async fn list_rounds(&self, game_id: &str) -> Result<Vec<GameRoundModel>, AppError> {
        let games = self.games.read().await;
        let mut rounds = games
            .get(game_id)
            .map(|g| g.rounds.clone())
            .unwrap_or_default();
        rounds.sort_by_key(|r| r.round);
        Ok(rounds)
    }

    #[instrument(skip(self, data))]
    async fn create_round(
        &self,
        game_id: &str,
        round: u32,
        data: &RoundSnapshot,
    ) -> Result<(), AppError> {
        let mut games = self.games.write().await;
        let stored = games
            .get_mut(game_id)
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", game_id)))?;

        if stored.game.status != GameStatus::Active {
            warn!(game_id = %game_id, status = %stored.game.status, "Round rejected for inactive game");
            return Err(AppError::Conflict("Game is no longer active".to_string()));
        }
        if stored.rounds.iter().any(|r| r.round == round) {
            warn!(game_id = %game_id, round, "Round already recorded");
            return Err(AppError::Conflict(format!(
                "Round {} already recorded",
                round
            )));
        }

        stored.rounds.push(GameRoundModel {
            game_id: game_id.to_string(),
            round,
            data: data.clone(),
        });
        debug!(game_id = %game_id, round, "Round appended in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_rounds_after(&self, game_id: &str, after: u32) -> Result<u64, AppError> {
        let mut games = self.games.write().await;
        let stored = games
            .get_mut(game_id)
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", game_id)))?;

        if stored.game.status != GameStatus::Active {
            warn!(game_id = %game_id, status = %stored.game.status, "Round deletion rejected for inactive game");
            return Err(AppError::Conflict("Game is no longer active".to_string()));
        }

        let before = stored.rounds.len();
        stored.rounds.retain(|r| r.round <= after);
        let removed = (before - stored.rounds.len()) as u64;
        debug!(game_id = %game_id, after, removed, "Rounds deleted in memory");
        Ok(removed)
    }

    #[instrument(skip(self, game_data))]
    async fn update_game_status(
        &self,
        game_id: &str,
        status: GameStatus,
        game_data: Option<&GameData>,
    ) -> Result<(), AppError> {
        let mut games = self.games.write().await;
        let stored = games
            .get_mut(game_id)
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", game_id)))?;

        stored.game.status = status;
        if let Some(data) = game_data {
            stored.game.game_data = Some(data.clone());
        }
        debug!(game_id = %game_id, status = %status, "Game status updated in memory");
        Ok(())
    }

    async fn list_completed_games(
        &self,
        tracker_type: TrackerType,
        tracker_ids: Option<&[String]>,
    ) -> Result<Vec<CompletedGame>, AppError> {
        let games = self.games.read().await;
        let mut completed: Vec<CompletedGame> = games
            .values()
            .filter(|g| g.game.status == GameStatus::Completed)
            .filter(|g| {
                g.game
                    .game_data
                    .as_ref()
                    .is_some_and(|d| d.game_type == tracker_type)
            })
            .filter(|g| {
                tracker_ids
                    .map(|ids| ids.contains(&g.game.tracker_id))
                    .unwrap_or(true)
            })
            .map(|g| {
                let mut rounds = g.rounds.clone();
                rounds.sort_by_key(|r| r.round);
                CompletedGame {
                    game: g.game.clone(),
                    participants: g.participants.clone(),
                    rounds,
                }
            })
            .collect();
        completed.sort_by(|a, b| a.game.created_at.cmp(&b.game.created_at));
        Ok(completed)
    }
}

/// PostgreSQL implementation. Round data and game summaries are stored as
/// JSONB columns; the ACTIVE-only guard is checked right before each round
/// mutation.
pub struct PostgresGameRepository {
    pool: PgPool,
}

impl PostgresGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn require_active(&self, game_id: &str) -> Result<(), AppError> {
        let row = sqlx::query("SELECT status FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let status: String = row
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", game_id)))?
            .get("status");
        if status != GameStatus::Active.to_string() {
            return Err(AppError::Conflict("Game is no longer active".to_string()));
        }
        Ok(())
    }

    fn row_to_game(row: &sqlx::postgres::PgRow) -> Result<GameModel, AppError> {
        let status: String = row.get("status");
        let status = status
            .parse::<GameStatus>()
            .map_err(|e| AppError::DatabaseError(format!("Bad game status: {}", e)))?;
        let game_data: Option<serde_json::Value> = row.get("game_data");
        let game_data = game_data
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AppError::DatabaseError(format!("Bad game data: {}", e)))?;
        Ok(GameModel {
            id: row.get("id"),
            tracker_id: row.get("tracker_id"),
            status,
            game_data,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl GameRepository for PostgresGameRepository {
    #[instrument(skip(self, participants))]
    async fn create_game(
        &self,
        tracker_id: &str,
        participants: &[NewParticipant],
    ) -> Result<GameModel, AppError> {
        debug!(tracker_id = %tracker_id, "Creating game in database");

        let game_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO games (id, tracker_id, status, game_data, created_at) VALUES ($1, $2, $3, NULL, $4)",
        )
        .bind(&game_id)
        .bind(tracker_id)
        .bind(GameStatus::Active.to_string())
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert game");
            AppError::DatabaseError(e.to_string())
        })?;

        let mut seat_ids = Vec::with_capacity(participants.len());
        for participant in participants {
            let participant_id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO game_participants (id, game_id, display_name, user_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(&participant_id)
            .bind(&game_id)
            .bind(&participant.display_name)
            .bind(&participant.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to insert game participant");
                AppError::DatabaseError(e.to_string())
            })?;
            seat_ids.push(participant_id);
        }

        let round_zero = RoundSnapshot::initial(&seat_ids);
        let data = serde_json::to_value(&round_zero)
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        sqlx::query("INSERT INTO game_rounds (game_id, round, data) VALUES ($1, 0, $2)")
            .bind(&game_id)
            .bind(&data)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to insert round 0");
                AppError::DatabaseError(e.to_string())
            })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        debug!(game_id = %game_id, "Game created in database");
        Ok(GameModel {
            id: game_id,
            tracker_id: tracker_id.to_string(),
            status: GameStatus::Active,
            game_data: None,
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn get_game(&self, game_id: &str) -> Result<Option<GameModel>, AppError> {
        let row = sqlx::query(
            "SELECT id, tracker_id, status, game_data, created_at FROM games WHERE id = $1",
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(|r| Self::row_to_game(&r)).transpose()
    }

    #[instrument(skip(self))]
    async fn list_participants(
        &self,
        game_id: &str,
    ) -> Result<Vec<GameParticipantModel>, AppError> {
        let rows = sqlx::query(
            "SELECT id, game_id, display_name, user_id FROM game_participants WHERE game_id = $1 ORDER BY id",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| GameParticipantModel {
                id: row.get("id"),
                game_id: row.get("game_id"),
                display_name: row.get("display_name"),
                user_id: row.get("user_id"),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_rounds(&self, game_id: &str) -> Result<Vec<GameRoundModel>, AppError> {
        let rows = sqlx::query(
            "SELECT game_id, round, data FROM game_rounds WHERE game_id = $1 ORDER BY round",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let round: i32 = row.get("round");
                let data: serde_json::Value = row.get("data");
                let data = serde_json::from_value(data)
                    .map_err(|e| AppError::DatabaseError(format!("Bad round data: {}", e)))?;
                Ok(GameRoundModel {
                    game_id: row.get("game_id"),
                    round: round as u32,
                    data,
                })
            })
            .collect()
    }

    #[instrument(skip(self, data))]
    async fn create_round(
        &self,
        game_id: &str,
        round: u32,
        data: &RoundSnapshot,
    ) -> Result<(), AppError> {
        self.require_active(game_id).await?;

        let payload =
            serde_json::to_value(data).map_err(|e| AppError::DatabaseError(e.to_string()))?;
        sqlx::query("INSERT INTO game_rounds (game_id, round, data) VALUES ($1, $2, $3)")
            .bind(game_id)
            .bind(round as i32)
            .bind(&payload)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    warn!(game_id = %game_id, round, "Round already recorded");
                    AppError::Conflict(format!("Round {} already recorded", round))
                }
                _ => {
                    warn!(error = %e, game_id = %game_id, "Failed to insert round");
                    AppError::DatabaseError(e.to_string())
                }
            })?;

        debug!(game_id = %game_id, round, "Round appended in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_rounds_after(&self, game_id: &str, after: u32) -> Result<u64, AppError> {
        self.require_active(game_id).await?;

        let result = sqlx::query("DELETE FROM game_rounds WHERE game_id = $1 AND round > $2")
            .bind(game_id)
            .bind(after as i32)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, game_id = %game_id, "Failed to delete rounds");
                AppError::DatabaseError(e.to_string())
            })?;

        let removed = result.rows_affected();
        debug!(game_id = %game_id, after, removed, "Rounds deleted in database");
        Ok(removed)
    }

    #[instrument(skip(self, game_data))]
    async fn update_game_status(
        &self,
        game_id: &str,
        status: GameStatus,
        game_data: Option<&GameData>,
    ) -> Result<(), AppError> {
        let payload = game_data
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE games SET status = $2, game_data = COALESCE($3, game_data) WHERE id = $1",
        )
        .bind(game_id)
        .bind(status.to_string())
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, game_id = %game_id, "Failed to update game status");
            AppError::DatabaseError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Game not found: {}", game_id)));
        }
        debug!(game_id = %game_id, status = %status, "Game status updated in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_completed_games(
        &self,
        tracker_type: TrackerType,
        tracker_ids: Option<&[String]>,
    ) -> Result<Vec<CompletedGame>, AppError> {
        let rows = match tracker_ids {
            Some(ids) => sqlx::query(
                "SELECT id, tracker_id, status, game_data, created_at FROM games \
                 WHERE status = 'COMPLETED' AND game_data->>'gameType' = $1 AND tracker_id = ANY($2) \
                 ORDER BY created_at",
            )
            .bind(tracker_type.to_string())
            .bind(ids)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                "SELECT id, tracker_id, status, game_data, created_at FROM games \
                 WHERE status = 'COMPLETED' AND game_data->>'gameType' = $1 \
                 ORDER BY created_at",
            )
            .bind(tracker_type.to_string())
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let mut completed = Vec::with_capacity(rows.len());
        for row in rows {
            let game = Self::row_to_game(&row)?;
            let participants = self.list_participants(&game.id).await?;
            let rounds = self.list_rounds(&game.id).await?;
            completed.push(CompletedGame {
                game,
                participants,
                rounds,
            });
        }
        Ok(completed)
    }
}
