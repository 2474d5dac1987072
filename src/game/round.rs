use serde::{Deserialize, Serialize};

/// Every player starts a Schwimmen game with three lives.
pub const STARTING_LIVES: u32 = 3;

/// Life count for one seat. The order of `players` in a snapshot is the
/// seating order and never changes for the lifetime of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLives {
    pub player_id: String,
    pub lives: u32,
}

/// Complete state of a game at one round boundary.
///
/// Snapshots are immutable once appended to a game's round log; a new action
/// always produces a fresh snapshot with `round_number + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub round_number: u32,
    pub players: Vec<PlayerLives>,
    /// The single player currently holding last-life grace, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_swimming: Option<String>,
    /// Player whose turn is next. Unset until the first action of a game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealer: Option<String>,
    /// Set only on rounds produced by a nuke, for later attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nuke_by: Option<String>,
}

impl RoundSnapshot {
    /// Round 0: every player at full lives, no swimmer, no dealer.
    pub fn initial(player_ids: &[String]) -> Self {
        Self {
            round_number: 0,
            players: player_ids
                .iter()
                .map(|id| PlayerLives {
                    player_id: id.clone(),
                    lives: STARTING_LIVES,
                })
                .collect(),
            player_swimming: None,
            dealer: None,
            nuke_by: None,
        }
    }

    pub fn lives_of(&self, player_id: &str) -> Option<u32> {
        self.players
            .iter()
            .find(|p| p.player_id == player_id)
            .map(|p| p.lives)
    }

    pub fn is_alive(&self, player_id: &str) -> bool {
        self.lives_of(player_id).is_some_and(|lives| lives > 0)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &PlayerLives> {
        self.players.iter().filter(|p| p.lives > 0)
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn initial_round_has_full_lives_and_no_dealer() {
        let round = RoundSnapshot::initial(&ids(&["p1", "p2", "p3"]));

        assert_eq!(round.round_number, 0);
        assert_eq!(round.players.len(), 3);
        assert!(round.players.iter().all(|p| p.lives == STARTING_LIVES));
        assert!(round.player_swimming.is_none());
        assert!(round.dealer.is_none());
        assert!(round.nuke_by.is_none());
    }

    #[test]
    fn lives_lookup_and_alive_checks() {
        let mut round = RoundSnapshot::initial(&ids(&["p1", "p2"]));
        round.players[1].lives = 0;

        assert_eq!(round.lives_of("p1"), Some(STARTING_LIVES));
        assert_eq!(round.lives_of("p2"), Some(0));
        assert_eq!(round.lives_of("missing"), None);
        assert!(round.is_alive("p1"));
        assert!(!round.is_alive("p2"));
        assert!(!round.is_alive("missing"));
        assert_eq!(round.alive_count(), 1);
    }

    #[test]
    fn serde_round_trip_preserves_all_fields() {
        let round = RoundSnapshot {
            round_number: 4,
            players: vec![
                PlayerLives {
                    player_id: "p1".to_string(),
                    lives: 2,
                },
                PlayerLives {
                    player_id: "p2".to_string(),
                    lives: 1,
                },
            ],
            player_swimming: Some("p2".to_string()),
            dealer: Some("p1".to_string()),
            nuke_by: Some("p1".to_string()),
        };

        let json = serde_json::to_string(&round).unwrap();
        let back: RoundSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, round);
    }

    #[test]
    fn serde_round_trip_with_absent_optionals() {
        let round = RoundSnapshot::initial(&ids(&["p1", "p2"]));

        let json = serde_json::to_string(&round).unwrap();
        // Absent optionals are omitted entirely rather than serialized as null.
        assert!(!json.contains("playerSwimming"));
        assert!(!json.contains("dealer"));
        assert!(!json.contains("nukeBy"));

        let back: RoundSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, round);
    }
}
