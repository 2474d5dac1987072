use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Game variants a tracker can be created for. Only Schwimmen is playable;
/// the tag still matters for keeping leaderboard corpora apart.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerType {
    Schwimmen,
    Durak,
}

/// Database model for the trackers table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerModel {
    pub id: String,
    /// Human-readable code players use to find the tracker.
    pub join_code: String,
    pub name: String,
    pub tracker_type: TrackerType,
    pub archived: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TrackerModel {
    pub fn new(name: String, tracker_type: TrackerType, created_by: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            join_code: petname::Petnames::default().generate_one(2, "-"),
            name,
            tracker_type,
            archived: false,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// A player roster entry at the tracker level. Display names are unique per
/// tracker; `user_id` links registered users, guests have none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerPlayerModel {
    pub id: String,
    pub tracker_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A roster entry to be created alongside a tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrackerPlayer {
    pub display_name: String,
    #[serde(default)]
    pub user_id: Option<String>,
}
