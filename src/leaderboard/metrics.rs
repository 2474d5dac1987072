use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::game::models::CompletedGame;
use crate::game::round::STARTING_LIVES;
use crate::tracker::models::TrackerType;

/// The leaderboards the aggregator can produce. Every metric reads the same
/// per-user totals; what differs is which counter it reports and how the
/// value is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    Wins,
    WinRate,
    Appearances,
    Nukes,
    TimesSwimming,
    AvgTimesSwimming,
    Unbreakable,
    Untouchable,
}

/// Counters accumulated for one user across the completed-game corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTotals {
    pub appearances: u32,
    pub wins: u32,
    pub nukes: u32,
    pub times_swimming: u32,
    /// Wins taken while holding the swimmer slot in the final round.
    pub unbreakable: u32,
    /// Wins taken without ever losing a life.
    pub untouchable: u32,
}

impl Metric {
    pub fn value(&self, totals: &UserTotals) -> f64 {
        match self {
            Metric::Wins => totals.wins as f64,
            Metric::WinRate => ratio(totals.wins, totals.appearances),
            Metric::Appearances => totals.appearances as f64,
            Metric::Nukes => totals.nukes as f64,
            Metric::TimesSwimming => totals.times_swimming as f64,
            Metric::AvgTimesSwimming => ratio(totals.times_swimming, totals.appearances),
            Metric::Unbreakable => totals.unbreakable as f64,
            Metric::Untouchable => totals.untouchable as f64,
        }
    }

    pub fn format(&self, value: f64) -> String {
        match self {
            Metric::WinRate | Metric::AvgTimesSwimming => format!("{:.2}%", value * 100.0),
            _ => format!("{}", value as u64),
        }
    }
}

// Ratios are carried at 4-decimal precision before formatting.
fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    ((numerator as f64 / denominator as f64) * 10_000.0).round() / 10_000.0
}

/// Replays every completed game once, accumulating totals keyed by user id.
///
/// Guests (participants without a linked user) are excluded. A game whose
/// summary is missing or tagged for a different game type is skipped without
/// aborting the rest of the replay.
pub fn accumulate(
    games: &[CompletedGame],
    tracker_type: TrackerType,
) -> HashMap<String, UserTotals> {
    let mut totals: HashMap<String, UserTotals> = HashMap::new();

    for completed in games {
        let Some(data) = completed.game.game_data.as_ref() else {
            debug!(game_id = %completed.game.id, "Skipping completed game without a summary");
            continue;
        };
        if data.game_type != tracker_type {
            debug!(
                game_id = %completed.game.id,
                game_type = %data.game_type,
                "Skipping game of a different type"
            );
            continue;
        }
        let Some(final_round) = completed.rounds.last() else {
            debug!(game_id = %completed.game.id, "Skipping completed game without rounds");
            continue;
        };

        for participant in &completed.participants {
            let Some(user_id) = participant.user_id.as_ref() else {
                continue;
            };
            let entry = totals.entry(user_id.clone()).or_default();

            entry.appearances += 1;
            entry.nukes += completed
                .rounds
                .iter()
                .filter(|r| r.data.nuke_by.as_deref() == Some(participant.id.as_str()))
                .count() as u32;

            let swam = completed
                .rounds
                .iter()
                .any(|r| r.data.player_swimming.as_deref() == Some(participant.id.as_str()));
            if swam {
                entry.times_swimming += 1;
            }

            if data.winner == participant.id {
                entry.wins += 1;
                if data.swimming.as_deref() == Some(participant.id.as_str()) {
                    entry.unbreakable += 1;
                }
                if final_round.data.lives_of(&participant.id) == Some(STARTING_LIVES) {
                    entry.untouchable += 1;
                }
            }
        }
    }

    totals
}
