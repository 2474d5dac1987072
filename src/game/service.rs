use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::game::models::{GameModel, GameParticipantModel, NewParticipant};
use crate::game::repository::GameRepository;
use crate::game::round::RoundSnapshot;
use crate::game::session::{GameSession, PreparedAction};
use crate::shared::AppError;
use crate::tracker::models::TrackerType;
use crate::tracker::repository::TrackerRepository;

/// Full game state as served to clients: the persisted record plus the
/// session's view of history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game: GameModel,
    pub participants: Vec<GameParticipantModel>,
    pub rounds: Vec<RoundSnapshot>,
    pub current_round: u32,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Outcome of a subtract-life request. `applied` is false when the action
/// targeted an eliminated player and produced no round.
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub applied: bool,
    pub game: GameView,
}

/// Outcome of a nuke request.
#[derive(Debug, Clone)]
pub enum NukeResult {
    Applied(GameView),
    /// A survivor must be chosen among the candidates and the request
    /// repeated with that choice.
    Conflict { candidates: Vec<String> },
    NotApplied(GameView),
}

/// Orchestrates game sessions against the persistence boundary.
///
/// One session object exists per game; every mutation runs as
/// prepare (pure) -> persist -> commit, with a rollback to idle whenever
/// persistence rejects the change. The sessions map is locked for the whole
/// unit of work, which serializes mutations the same way the UI serializes
/// them by disabling buttons while a request is in flight.
pub struct GameService {
    games: Arc<dyn GameRepository>,
    trackers: Arc<dyn TrackerRepository>,
    sessions: RwLock<HashMap<String, GameSession>>,
}

impl GameService {
    pub fn new(games: Arc<dyn GameRepository>, trackers: Arc<dyn TrackerRepository>) -> Self {
        Self {
            games,
            trackers,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a game for a tracker from a selection of its players. The
    /// selection order becomes the seating order.
    #[instrument(skip(self, player_ids))]
    pub async fn create_game(
        &self,
        tracker_id: &str,
        player_ids: &[String],
    ) -> Result<GameView, AppError> {
        let tracker = self
            .trackers
            .get_tracker(tracker_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tracker not found: {}", tracker_id)))?;

        if tracker.archived {
            return Err(AppError::Conflict(
                "Tracker is archived and cannot start new games".to_string(),
            ));
        }
        if tracker.tracker_type != TrackerType::Schwimmen {
            return Err(AppError::BadRequest(
                "Only Schwimmen games are supported".to_string(),
            ));
        }
        if player_ids.len() < 2 {
            return Err(AppError::BadRequest(
                "A game needs at least two participants".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for id in player_ids {
            if !seen.insert(id.as_str()) {
                return Err(AppError::BadRequest(
                    "Participants must be unique".to_string(),
                ));
            }
        }

        let tracker_players = self.trackers.list_players(tracker_id).await?;
        let mut participants = Vec::with_capacity(player_ids.len());
        for id in player_ids {
            let player = tracker_players
                .iter()
                .find(|p| &p.id == id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("Unknown tracker player: {}", id))
                })?;
            participants.push(NewParticipant {
                display_name: player.display_name.clone(),
                user_id: player.user_id.clone(),
            });
        }

        let game = self.games.create_game(tracker_id, &participants).await?;
        debug!(game_id = %game.id, tracker_id = %tracker_id, "Game created");
        self.view(&game.id).await
    }

    /// Read-only view of a game, hydrating its session if needed.
    pub async fn view(&self, game_id: &str) -> Result<GameView, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = self.session_mut(&mut sessions, game_id).await?;
        let (cursor, can_undo, can_redo, rounds) = (
            session.cursor(),
            session.can_undo(),
            session.can_redo(),
            session.rounds().to_vec(),
        );
        drop(sessions);
        self.assemble_view(game_id, rounds, cursor, can_undo, can_redo)
            .await
    }

    /// Applies a subtract-life action at the session's cursor position.
    #[instrument(skip(self))]
    pub async fn subtract_life(
        &self,
        game_id: &str,
        target_id: &str,
    ) -> Result<ActionResult, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = self.session_mut(&mut sessions, game_id).await?;

        session.begin_subtract()?;
        let prepared = session.prepare_subtract(target_id)?;
        let applied = self
            .persist_prepared(game_id, session, prepared)
            .await?
            .is_some();
        let (cursor, can_undo, can_redo, rounds) = (
            session.cursor(),
            session.can_undo(),
            session.can_redo(),
            session.rounds().to_vec(),
        );
        drop(sessions);

        let game = self
            .assemble_view(game_id, rounds, cursor, can_undo, can_redo)
            .await?;
        Ok(ActionResult { applied, game })
    }

    /// Detonates a nuke at the session's cursor position. Without a survivor
    /// choice, two simultaneous eliminations surface as a conflict and
    /// nothing is persisted.
    #[instrument(skip(self))]
    pub async fn detonate_nuke(
        &self,
        game_id: &str,
        detonator_id: &str,
        survivor_id: Option<&str>,
    ) -> Result<NukeResult, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = self.session_mut(&mut sessions, game_id).await?;

        session.begin_nuke()?;
        let prepared = match session.prepare_nuke(detonator_id, survivor_id)? {
            PreparedAction::Conflict(candidates) => {
                debug!(game_id = %game_id, ?candidates, "Nuke requires a survivor choice");
                return Ok(NukeResult::Conflict { candidates });
            }
            other => other,
        };

        let applied = self
            .persist_prepared(game_id, session, prepared)
            .await?
            .is_some();
        let (cursor, can_undo, can_redo, rounds) = (
            session.cursor(),
            session.can_undo(),
            session.can_redo(),
            session.rounds().to_vec(),
        );
        drop(sessions);

        let game = self
            .assemble_view(game_id, rounds, cursor, can_undo, can_redo)
            .await?;
        Ok(if applied {
            NukeResult::Applied(game)
        } else {
            NukeResult::NotApplied(game)
        })
    }

    pub async fn undo(&self, game_id: &str) -> Result<GameView, AppError> {
        self.navigate(game_id, |session| session.undo()).await
    }

    pub async fn redo(&self, game_id: &str) -> Result<GameView, AppError> {
        self.navigate(game_id, |session| session.redo()).await
    }

    /// Discards every round beyond 0 and restarts the game from scratch.
    #[instrument(skip(self))]
    pub async fn reset(&self, game_id: &str) -> Result<GameView, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = self.session_mut(&mut sessions, game_id).await?;

        session.begin_reset()?;
        if let Err(err) = self.games.delete_rounds_after(game_id, 0).await {
            warn!(game_id = %game_id, error = %err, "Reset rejected by persistence");
            session.rollback();
            return Err(err);
        }
        session.commit_reset();
        let (cursor, can_undo, can_redo, rounds) = (
            session.cursor(),
            session.can_undo(),
            session.can_redo(),
            session.rounds().to_vec(),
        );
        drop(sessions);
        self.assemble_view(game_id, rounds, cursor, can_undo, can_redo)
            .await
    }

    /// Cancels the game. Terminal: the round log is preserved but the game
    /// leaves leaderboard aggregation and accepts no further play.
    #[instrument(skip(self))]
    pub async fn cancel(&self, game_id: &str) -> Result<GameView, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = self.session_mut(&mut sessions, game_id).await?;

        session.begin_cancel()?;
        if let Err(err) = self
            .games
            .update_game_status(game_id, crate::game::models::GameStatus::Cancelled, None)
            .await
        {
            warn!(game_id = %game_id, error = %err, "Cancel rejected by persistence");
            session.rollback();
            return Err(err);
        }
        session.commit_cancel();
        let (cursor, can_undo, can_redo, rounds) = (
            session.cursor(),
            session.can_undo(),
            session.can_redo(),
            session.rounds().to_vec(),
        );
        drop(sessions);
        self.assemble_view(game_id, rounds, cursor, can_undo, can_redo)
            .await
    }

    async fn navigate<F>(&self, game_id: &str, op: F) -> Result<GameView, AppError>
    where
        F: FnOnce(&mut GameSession) -> Result<u32, crate::game::session::SessionError>,
    {
        let mut sessions = self.sessions.write().await;
        let session = self.session_mut(&mut sessions, game_id).await?;
        op(session)?;
        let (cursor, can_undo, can_redo, rounds) = (
            session.cursor(),
            session.can_undo(),
            session.can_redo(),
            session.rounds().to_vec(),
        );
        drop(sessions);
        self.assemble_view(game_id, rounds, cursor, can_undo, can_redo)
            .await
    }

    /// Persists a prepared append: branch deletion first, then the new
    /// round, then any completion summary. A rejection at any step rolls the
    /// session back; the persisted state is authoritative.
    async fn persist_prepared(
        &self,
        game_id: &str,
        session: &mut GameSession,
        prepared: PreparedAction,
    ) -> Result<Option<RoundSnapshot>, AppError> {
        let PreparedAction::Append {
            snapshot,
            discard_after,
        } = prepared
        else {
            return Ok(None);
        };

        if let Some(after) = discard_after {
            if let Err(err) = self.games.delete_rounds_after(game_id, after).await {
                warn!(game_id = %game_id, error = %err, "History branch rejected by persistence");
                session.rollback();
                return Err(err);
            }
        }
        if let Err(err) = self
            .games
            .create_round(game_id, snapshot.round_number, &snapshot)
            .await
        {
            warn!(game_id = %game_id, error = %err, "Round append rejected by persistence");
            session.rollback();
            return Err(err);
        }

        let committed = snapshot.clone();
        if let Some(game_data) = session.commit_round(snapshot) {
            debug!(game_id = %game_id, winner = %game_data.winner, "Game completed");
            self.games
                .update_game_status(
                    game_id,
                    crate::game::models::GameStatus::Completed,
                    Some(&game_data),
                )
                .await?;
        }
        Ok(Some(committed))
    }

    async fn session_mut<'a>(
        &self,
        sessions: &'a mut HashMap<String, GameSession>,
        game_id: &str,
    ) -> Result<&'a mut GameSession, AppError> {
        if !sessions.contains_key(game_id) {
            let game = self
                .games
                .get_game(game_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", game_id)))?;
            let tracker = self
                .trackers
                .get_tracker(&game.tracker_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Tracker not found: {}", game.tracker_id))
                })?;
            let rounds: Vec<RoundSnapshot> = self
                .games
                .list_rounds(game_id)
                .await?
                .into_iter()
                .map(|r| r.data)
                .collect();
            if rounds.is_empty() {
                return Err(AppError::DatabaseError(format!(
                    "Game has no recorded rounds: {}",
                    game_id
                )));
            }
            sessions.insert(
                game_id.to_string(),
                GameSession::new(
                    game.id.clone(),
                    tracker.tracker_type,
                    game.status,
                    game.game_data.clone(),
                    rounds,
                ),
            );
        }
        sessions.get_mut(game_id).ok_or(AppError::Internal)
    }

    async fn assemble_view(
        &self,
        game_id: &str,
        rounds: Vec<RoundSnapshot>,
        current_round: u32,
        can_undo: bool,
        can_redo: bool,
    ) -> Result<GameView, AppError> {
        let game = self
            .games
            .get_game(game_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", game_id)))?;
        let participants = self.games.list_participants(game_id).await?;
        Ok(GameView {
            game,
            participants,
            rounds,
            current_round,
            can_undo,
            can_redo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::models::GameStatus;
    use crate::game::repository::InMemoryGameRepository;
    use crate::tracker::models::{NewTrackerPlayer, TrackerModel};
    use crate::tracker::repository::{InMemoryTrackerRepository, TrackerRepository};

    async fn setup() -> (GameService, Arc<InMemoryGameRepository>, String, Vec<String>) {
        let games = Arc::new(InMemoryGameRepository::new());
        let trackers = Arc::new(InMemoryTrackerRepository::new());

        let tracker = TrackerModel::new(
            "Friday night".to_string(),
            TrackerType::Schwimmen,
            "user-owner".to_string(),
        );
        let players = vec![
            NewTrackerPlayer {
                display_name: "Alice".to_string(),
                user_id: Some("user-a".to_string()),
            },
            NewTrackerPlayer {
                display_name: "Bob".to_string(),
                user_id: Some("user-b".to_string()),
            },
            NewTrackerPlayer {
                display_name: "Cara".to_string(),
                user_id: None,
            },
        ];
        let tracker = trackers.create_tracker(&tracker, &players).await.unwrap();
        let player_ids: Vec<String> = trackers
            .list_players(&tracker.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id.clone())
            .collect();

        let service = GameService::new(games.clone(), trackers);
        (service, games, tracker.id, player_ids)
    }

    fn seat_ids(view: &GameView) -> Vec<String> {
        view.rounds[0]
            .players
            .iter()
            .map(|p| p.player_id.clone())
            .collect()
    }

    #[tokio::test]
    async fn create_game_validates_participants() {
        let (service, _games, tracker_id, player_ids) = setup().await;

        let too_few = service.create_game(&tracker_id, &player_ids[..1]).await;
        assert!(matches!(too_few, Err(AppError::BadRequest(_))));

        let duplicated = service
            .create_game(
                &tracker_id,
                &[player_ids[0].clone(), player_ids[0].clone()],
            )
            .await;
        assert!(matches!(duplicated, Err(AppError::BadRequest(_))));

        let unknown = service
            .create_game(&tracker_id, &[player_ids[0].clone(), "ghost".to_string()])
            .await;
        assert!(matches!(unknown, Err(AppError::BadRequest(_))));

        let view = service.create_game(&tracker_id, &player_ids).await.unwrap();
        assert_eq!(view.game.status, GameStatus::Active);
        assert_eq!(view.rounds.len(), 1);
        assert_eq!(view.participants.len(), 3);
    }

    #[tokio::test]
    async fn subtract_persists_rounds_and_completion() {
        let (service, games, tracker_id, player_ids) = setup().await;
        let view = service
            .create_game(&tracker_id, &player_ids[..2])
            .await
            .unwrap();
        let game_id = view.game.id.clone();
        let seats = seat_ids(&view);

        // Four hits eliminate the second seat: 3 -> 2 -> 1 -> swim -> out.
        for _ in 0..3 {
            let result = service.subtract_life(&game_id, &seats[1]).await.unwrap();
            assert!(result.applied);
            assert_eq!(result.game.game.status, GameStatus::Active);
        }
        let final_hit = service.subtract_life(&game_id, &seats[1]).await.unwrap();
        assert!(final_hit.applied);
        assert_eq!(final_hit.game.game.status, GameStatus::Completed);

        let data = final_hit.game.game.game_data.clone().unwrap();
        assert_eq!(data.winner, seats[0]);
        assert!(!data.win_by_nuke);

        // Completion reached persistence, and the round log has all 5 rounds.
        let stored = games.get_game(&game_id).await.unwrap().unwrap();
        assert_eq!(stored.status, GameStatus::Completed);
        assert_eq!(games.list_rounds(&game_id).await.unwrap().len(), 5);

        // Terminal game accepts no further actions.
        let rejected = service.subtract_life(&game_id, &seats[0]).await;
        assert!(matches!(rejected, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn subtract_on_dead_target_is_not_applied() {
        let (service, games, tracker_id, player_ids) = setup().await;
        let view = service.create_game(&tracker_id, &player_ids).await.unwrap();
        let game_id = view.game.id.clone();
        let seats = seat_ids(&view);

        for _ in 0..4 {
            service.subtract_life(&game_id, &seats[2]).await.unwrap();
        }

        let result = service.subtract_life(&game_id, &seats[2]).await.unwrap();
        assert!(!result.applied);
        assert_eq!(games.list_rounds(&game_id).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn nuke_conflict_suspends_without_persisting() {
        let (service, games, tracker_id, player_ids) = setup().await;
        let view = service.create_game(&tracker_id, &player_ids).await.unwrap();
        let game_id = view.game.id.clone();
        let seats = seat_ids(&view);

        // Bring seats 1 and 2 down to one life each.
        for seat in [&seats[1], &seats[2]] {
            service.subtract_life(&game_id, seat).await.unwrap();
            service.subtract_life(&game_id, seat).await.unwrap();
        }
        let rounds_before = games.list_rounds(&game_id).await.unwrap().len();

        let outcome = service.detonate_nuke(&game_id, &seats[0], None).await.unwrap();
        let NukeResult::Conflict { candidates } = outcome else {
            panic!("expected a conflict");
        };
        assert_eq!(candidates, vec![seats[1].clone(), seats[2].clone()]);
        assert_eq!(
            games.list_rounds(&game_id).await.unwrap().len(),
            rounds_before
        );

        // Supplying the survivor resolves the suspension.
        let resolved = service
            .detonate_nuke(&game_id, &seats[0], Some(&seats[1]))
            .await
            .unwrap();
        let NukeResult::Applied(game) = resolved else {
            panic!("expected the nuke to apply");
        };
        let latest = game.rounds.last().unwrap();
        assert_eq!(latest.player_swimming.as_deref(), Some(seats[1].as_str()));
        assert_eq!(latest.nuke_by.as_deref(), Some(seats[0].as_str()));
    }

    #[tokio::test]
    async fn acting_in_the_past_rewrites_persisted_history() {
        let (service, games, tracker_id, player_ids) = setup().await;
        let view = service.create_game(&tracker_id, &player_ids).await.unwrap();
        let game_id = view.game.id.clone();
        let seats = seat_ids(&view);

        for target in [&seats[0], &seats[1], &seats[2], &seats[0], &seats[1]] {
            service.subtract_life(&game_id, target).await.unwrap();
        }

        // Walk back to round 2, then take a different action.
        for _ in 0..3 {
            service.undo(&game_id).await.unwrap();
        }
        let result = service.subtract_life(&game_id, &seats[2]).await.unwrap();
        assert!(result.applied);

        let rounds = games.list_rounds(&game_id).await.unwrap();
        assert_eq!(
            rounds.iter().map(|r| r.round).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(!result.game.can_redo);
        assert_eq!(result.game.current_round, 3);
    }

    #[tokio::test]
    async fn stale_session_rolls_back_on_persistence_rejection() {
        let (service, games, tracker_id, player_ids) = setup().await;
        let view = service.create_game(&tracker_id, &player_ids).await.unwrap();
        let game_id = view.game.id.clone();
        let seats = seat_ids(&view);

        // The game ends behind the session's back.
        games
            .update_game_status(&game_id, GameStatus::Cancelled, None)
            .await
            .unwrap();

        let rejected = service.subtract_life(&game_id, &seats[0]).await;
        assert!(matches!(rejected, Err(AppError::Conflict(_))));

        // The session reverted to idle: a later attempt fails the same way
        // instead of being stuck mid-action.
        let again = service.subtract_life(&game_id, &seats[0]).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn reset_requires_progress_and_truncates() {
        let (service, games, tracker_id, player_ids) = setup().await;
        let view = service.create_game(&tracker_id, &player_ids).await.unwrap();
        let game_id = view.game.id.clone();
        let seats = seat_ids(&view);

        let nothing = service.reset(&game_id).await;
        assert!(matches!(nothing, Err(AppError::Conflict(_))));

        service.subtract_life(&game_id, &seats[0]).await.unwrap();
        service.subtract_life(&game_id, &seats[1]).await.unwrap();

        let view = service.reset(&game_id).await.unwrap();
        assert_eq!(view.rounds.len(), 1);
        assert_eq!(view.current_round, 0);
        assert_eq!(games.list_rounds(&game_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_is_terminal_and_blocks_play() {
        let (service, games, tracker_id, player_ids) = setup().await;
        let view = service.create_game(&tracker_id, &player_ids).await.unwrap();
        let game_id = view.game.id.clone();
        let seats = seat_ids(&view);

        service.subtract_life(&game_id, &seats[0]).await.unwrap();
        let cancelled = service.cancel(&game_id).await.unwrap();
        assert_eq!(cancelled.game.status, GameStatus::Cancelled);

        // Rounds are preserved.
        assert_eq!(games.list_rounds(&game_id).await.unwrap().len(), 2);

        let rejected = service.subtract_life(&game_id, &seats[1]).await;
        assert!(matches!(rejected, Err(AppError::Conflict(_))));
        let rejected = service.cancel(&game_id).await;
        assert!(matches!(rejected, Err(AppError::Conflict(_))));
    }
}
