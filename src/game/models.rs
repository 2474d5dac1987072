use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::game::round::RoundSnapshot;
use crate::tracker::models::TrackerType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Active,
    Completed,
    Cancelled,
}

/// Summary of a finished game, populated only on COMPLETED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub game_type: TrackerType,
    pub winner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swimming: Option<String>,
    pub win_by_nuke: bool,
}

/// Database model for the games table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameModel {
    pub id: String,
    pub tracker_id: String,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_data: Option<GameData>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a game's append-only round log, unique per (game_id, round).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRoundModel {
    pub game_id: String,
    pub round: u32,
    pub data: RoundSnapshot,
}

/// A seat in one game. `user_id` is set for registered users and absent for
/// guests; round snapshots reference participants by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameParticipantModel {
    pub id: String,
    pub game_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A participant to be seated when creating a game.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub display_name: String,
    pub user_id: Option<String>,
}

/// A completed game with everything the leaderboard replay needs.
#[derive(Debug, Clone)]
pub struct CompletedGame {
    pub game: GameModel,
    pub participants: Vec<GameParticipantModel>,
    pub rounds: Vec<GameRoundModel>,
}
