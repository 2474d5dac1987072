//! Session controller for one in-progress game.
//!
//! A `GameSession` owns the in-memory round history, the round cursor used
//! for undo/redo navigation, and the action-mode state machine. All rule
//! evaluation is delegated to the pure engine; the session decides what the
//! accepted snapshot means for history (append, branch, completion) and
//! leaves persistence to the service driving it.

use crate::game::engine::{self, NukeOutcome, SubtractOutcome};
use crate::game::models::{GameData, GameStatus};
use crate::game::round::RoundSnapshot;
use crate::tracker::models::TrackerType;

/// The "what is the user about to do" state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionMode {
    #[default]
    Idle,
    AwaitingSubtractTarget,
    AwaitingNukeTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("game is not active")]
    NotActive,
    #[error("another action is already in progress")]
    ActionInProgress,
    #[error("no matching action is in progress")]
    NoActionInProgress,
    #[error("round history is unavailable while an action is in progress")]
    HistoryLocked,
    #[error("there are no recorded rounds to reset")]
    NothingToReset,
}

impl From<SessionError> for crate::shared::AppError {
    fn from(err: SessionError) -> Self {
        crate::shared::AppError::Conflict(err.to_string())
    }
}

/// A pure computation result waiting for persistence confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedAction {
    /// Append `snapshot`; when `discard_after` is set, all persisted rounds
    /// strictly greater than it must be deleted first (history branch).
    Append {
        snapshot: RoundSnapshot,
        discard_after: Option<u32>,
    },
    /// A survivor choice is required before the nuke can proceed.
    Conflict(Vec<String>),
    /// The action targeted an eliminated player; nothing to persist.
    NoRound,
}

pub struct GameSession {
    game_id: String,
    tracker_type: TrackerType,
    status: GameStatus,
    game_data: Option<GameData>,
    rounds: Vec<RoundSnapshot>,
    cursor: u32,
    mode: ActionMode,
    pending: bool,
}

impl GameSession {
    /// Hydrates a session from the persisted round log. The log is expected
    /// to be the contiguous range 0..=latest produced by this controller.
    pub fn new(
        game_id: String,
        tracker_type: TrackerType,
        status: GameStatus,
        game_data: Option<GameData>,
        mut rounds: Vec<RoundSnapshot>,
    ) -> Self {
        rounds.sort_by_key(|r| r.round_number);
        let cursor = rounds.last().map(|r| r.round_number).unwrap_or(0);
        Self {
            game_id,
            tracker_type,
            status,
            game_data,
            rounds,
            cursor,
            mode: ActionMode::Idle,
            pending: false,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn game_data(&self) -> Option<&GameData> {
        self.game_data.as_ref()
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn rounds(&self) -> &[RoundSnapshot] {
        &self.rounds
    }

    /// The round the user is currently looking at.
    pub fn current_round(&self) -> &RoundSnapshot {
        &self.rounds[self.cursor as usize]
    }

    pub fn latest_round_number(&self) -> u32 {
        self.rounds.last().map(|r| r.round_number).unwrap_or(0)
    }

    pub fn can_undo(&self) -> bool {
        self.mode == ActionMode::Idle && !self.pending && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.mode == ActionMode::Idle && !self.pending && self.cursor < self.latest_round_number()
    }

    pub fn begin_subtract(&mut self) -> Result<(), SessionError> {
        self.enter_mode(ActionMode::AwaitingSubtractTarget)
    }

    pub fn begin_nuke(&mut self) -> Result<(), SessionError> {
        self.enter_mode(ActionMode::AwaitingNukeTarget)
    }

    /// Leaves an awaiting mode without taking an action.
    pub fn cancel_action(&mut self) -> Result<(), SessionError> {
        if self.pending {
            return Err(SessionError::ActionInProgress);
        }
        if self.mode == ActionMode::Idle {
            return Err(SessionError::NoActionInProgress);
        }
        self.mode = ActionMode::Idle;
        Ok(())
    }

    /// Moves the cursor one round back, stopping at round 0.
    pub fn undo(&mut self) -> Result<u32, SessionError> {
        self.ensure_history_navigable()?;
        self.cursor = self.cursor.saturating_sub(1);
        Ok(self.cursor)
    }

    /// Moves the cursor one round forward, stopping at the latest round.
    pub fn redo(&mut self) -> Result<u32, SessionError> {
        self.ensure_history_navigable()?;
        if self.cursor < self.latest_round_number() {
            self.cursor += 1;
        }
        Ok(self.cursor)
    }

    /// Computes the subtract-life round for the cursor position.
    ///
    /// On `Append` the session marks itself pending until the caller either
    /// commits the persisted snapshot or rolls back.
    pub fn prepare_subtract(&mut self, target_id: &str) -> Result<PreparedAction, SessionError> {
        self.ensure_can_act(ActionMode::AwaitingSubtractTarget)?;
        match engine::subtract_life(self.current_round(), target_id) {
            SubtractOutcome::Round(snapshot) => Ok(self.stage(snapshot)),
            SubtractOutcome::NoRound => {
                self.mode = ActionMode::Idle;
                Ok(PreparedAction::NoRound)
            }
        }
    }

    /// Computes the nuke round for the cursor position. A conflict returns
    /// the session to idle: the survivor choice happens outside the session
    /// and the caller re-enters with the choice made.
    pub fn prepare_nuke(
        &mut self,
        detonator_id: &str,
        survivor_id: Option<&str>,
    ) -> Result<PreparedAction, SessionError> {
        self.ensure_can_act(ActionMode::AwaitingNukeTarget)?;
        match engine::detonate_nuke(self.current_round(), detonator_id, survivor_id) {
            NukeOutcome::Round(snapshot) => Ok(self.stage(snapshot)),
            NukeOutcome::Conflict(candidates) => {
                self.mode = ActionMode::Idle;
                Ok(PreparedAction::Conflict(candidates))
            }
            NukeOutcome::NoRound => {
                self.mode = ActionMode::Idle;
                Ok(PreparedAction::NoRound)
            }
        }
    }

    /// Accepts the persisted snapshot: discards any branch beyond the cursor,
    /// appends, and re-evaluates the win condition against the new latest
    /// round. Returns the completion summary when the game just finished.
    pub fn commit_round(&mut self, snapshot: RoundSnapshot) -> Option<GameData> {
        self.rounds.truncate(self.cursor as usize + 1);
        self.cursor = snapshot.round_number;
        self.rounds.push(snapshot);
        self.pending = false;
        self.mode = ActionMode::Idle;
        self.evaluate_completion()
    }

    /// Persistence rejected the optimistic change; drop it and return to idle.
    pub fn rollback(&mut self) {
        self.pending = false;
        self.mode = ActionMode::Idle;
    }

    /// Starts a reset back to round 0. Requires something to reset.
    pub fn begin_reset(&mut self) -> Result<(), SessionError> {
        self.ensure_idle_and_active()?;
        if self.rounds.len() <= 1 {
            return Err(SessionError::NothingToReset);
        }
        self.pending = true;
        Ok(())
    }

    pub fn commit_reset(&mut self) {
        self.rounds.truncate(1);
        self.cursor = 0;
        self.pending = false;
        self.mode = ActionMode::Idle;
    }

    /// Starts cancellation. Terminal once committed.
    pub fn begin_cancel(&mut self) -> Result<(), SessionError> {
        self.ensure_idle_and_active()?;
        self.pending = true;
        Ok(())
    }

    pub fn commit_cancel(&mut self) {
        self.status = GameStatus::Cancelled;
        self.pending = false;
        self.mode = ActionMode::Idle;
    }

    fn enter_mode(&mut self, mode: ActionMode) -> Result<(), SessionError> {
        self.ensure_idle_and_active()?;
        self.mode = mode;
        Ok(())
    }

    fn ensure_idle_and_active(&self) -> Result<(), SessionError> {
        if self.status != GameStatus::Active {
            return Err(SessionError::NotActive);
        }
        if self.pending || self.mode != ActionMode::Idle {
            return Err(SessionError::ActionInProgress);
        }
        Ok(())
    }

    fn ensure_can_act(&self, expected: ActionMode) -> Result<(), SessionError> {
        if self.status != GameStatus::Active {
            return Err(SessionError::NotActive);
        }
        if self.pending {
            return Err(SessionError::ActionInProgress);
        }
        if self.mode != expected {
            return Err(SessionError::NoActionInProgress);
        }
        Ok(())
    }

    fn ensure_history_navigable(&self) -> Result<(), SessionError> {
        if self.pending || self.mode != ActionMode::Idle {
            return Err(SessionError::HistoryLocked);
        }
        Ok(())
    }

    fn stage(&mut self, snapshot: RoundSnapshot) -> PreparedAction {
        self.pending = true;
        let discard_after = (self.cursor < self.latest_round_number()).then_some(self.cursor);
        PreparedAction::Append {
            snapshot,
            discard_after,
        }
    }

    // Completion is driven by actual game progress: always the latest round,
    // never the cursor's round.
    fn evaluate_completion(&mut self) -> Option<GameData> {
        if self.status != GameStatus::Active {
            return None;
        }
        let latest = self.rounds.last()?;
        let winner = engine::winner(latest)?;
        let data = GameData {
            game_type: self.tracker_type,
            winner: winner.player_id.clone(),
            swimming: latest.player_swimming.clone(),
            win_by_nuke: latest.nuke_by.is_some(),
        };
        self.status = GameStatus::Completed;
        self.game_data = Some(data.clone());
        Some(data)
    }
}
