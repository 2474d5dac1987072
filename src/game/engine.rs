//! Pure Schwimmen rule engine.
//!
//! Every function here maps a round snapshot plus an action to a new snapshot
//! (or a structured refusal) without touching any shared state. Persistence
//! and session bookkeeping live in the session controller; the engine knows
//! nothing about either.

use crate::game::round::{PlayerLives, RoundSnapshot};
use crate::game::turn_order::next_dealer;

/// Result of applying a subtract-life action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtractOutcome {
    Round(RoundSnapshot),
    /// The target is already eliminated; no round is produced and the caller
    /// returns to idle without appending history.
    NoRound,
}

/// Result of applying a nuke action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NukeOutcome {
    Round(RoundSnapshot),
    /// Two or more players would be eliminated at once. The engine refuses to
    /// proceed until the caller supplies one of the listed players as the
    /// survivor.
    Conflict(Vec<String>),
    /// The detonator is already eliminated; no round is produced.
    NoRound,
}

/// Applies a single life loss to `target_id`.
///
/// A player at exactly one life becomes the swimmer instead of losing the
/// life, but only while nobody holds the swimmer slot. Once the slot is
/// occupied (by anyone, the target included) hits decrement normally, so the
/// grace fires exactly once per occupancy.
pub fn subtract_life(current: &RoundSnapshot, target_id: &str) -> SubtractOutcome {
    let Some(lives) = current.lives_of(target_id) else {
        return SubtractOutcome::NoRound;
    };
    if lives == 0 {
        return SubtractOutcome::NoRound;
    }

    let mut next = advance(current);
    if lives > 1 || current.player_swimming.is_some() {
        decrement(&mut next.players, target_id);
    } else {
        next.player_swimming = Some(target_id.to_string());
    }
    clear_eliminated_swimmer(&mut next);
    next.dealer = next_dealer(&next.players, current.dealer.as_deref());

    SubtractOutcome::Round(next)
}

/// Detonates a nuke: every alive player except the detonator loses one life,
/// except for at most one survivor who takes the swimmer slot instead.
///
/// Survivor designation only happens while the swimmer slot is free. One
/// player at a single life survives automatically; two or more force a
/// conflict that the caller resolves by passing the chosen survivor back in.
/// An existing swimmer gets no protection from the blast.
pub fn detonate_nuke(
    current: &RoundSnapshot,
    detonator_id: &str,
    survivor_id: Option<&str>,
) -> NukeOutcome {
    let Some(lives) = current.lives_of(detonator_id) else {
        return NukeOutcome::NoRound;
    };
    if lives == 0 {
        return NukeOutcome::NoRound;
    }

    let survivor = if current.player_swimming.is_none() {
        let candidates: Vec<String> = current
            .players
            .iter()
            .filter(|p| p.player_id != detonator_id && p.lives == 1)
            .map(|p| p.player_id.clone())
            .collect();

        match candidates.len() {
            0 => None,
            1 => Some(candidates[0].clone()),
            _ => match survivor_id {
                Some(chosen) if candidates.iter().any(|c| c == chosen) => {
                    Some(chosen.to_string())
                }
                _ => return NukeOutcome::Conflict(candidates),
            },
        }
    } else {
        None
    };

    let mut next = advance(current);
    next.nuke_by = Some(detonator_id.to_string());
    for player in &mut next.players {
        if player.player_id == detonator_id || player.lives == 0 {
            continue;
        }
        if survivor.as_deref() == Some(player.player_id.as_str()) {
            continue;
        }
        player.lives -= 1;
    }
    if let Some(survivor) = survivor {
        next.player_swimming = Some(survivor);
    }
    clear_eliminated_swimmer(&mut next);
    next.dealer = next_dealer(&next.players, current.dealer.as_deref());

    NukeOutcome::Round(next)
}

/// The winner, once exactly one player has lives left.
pub fn winner(round: &RoundSnapshot) -> Option<&PlayerLives> {
    let mut alive = round.alive_players();
    match (alive.next(), alive.next()) {
        (Some(last), None) => Some(last),
        _ => None,
    }
}

fn advance(current: &RoundSnapshot) -> RoundSnapshot {
    let mut next = current.clone();
    next.round_number += 1;
    next.nuke_by = None;
    next
}

fn decrement(players: &mut [PlayerLives], player_id: &str) {
    if let Some(player) = players.iter_mut().find(|p| p.player_id == player_id) {
        player.lives -= 1;
    }
}

// The swimmer slot frees up once its holder is eliminated, so a later action
// can grant the grace to another player.
fn clear_eliminated_swimmer(round: &mut RoundSnapshot) {
    let eliminated = round
        .player_swimming
        .as_deref()
        .is_some_and(|id| !round.is_alive(id));
    if eliminated {
        round.player_swimming = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn round(lives: &[(&str, u32)]) -> RoundSnapshot {
        RoundSnapshot {
            round_number: 1,
            players: lives
                .iter()
                .map(|(id, lives)| PlayerLives {
                    player_id: id.to_string(),
                    lives: *lives,
                })
                .collect(),
            player_swimming: None,
            dealer: Some(lives[0].0.to_string()),
            nuke_by: None,
        }
    }

    fn unwrap_round(outcome: SubtractOutcome) -> RoundSnapshot {
        match outcome {
            SubtractOutcome::Round(r) => r,
            other => panic!("expected a round, got {:?}", other),
        }
    }

    fn unwrap_nuke(outcome: NukeOutcome) -> RoundSnapshot {
        match outcome {
            NukeOutcome::Round(r) => r,
            other => panic!("expected a round, got {:?}", other),
        }
    }

    #[test]
    fn subtract_decrements_a_healthy_player() {
        let current = round(&[("p1", 3), ("p2", 3)]);
        let next = unwrap_round(subtract_life(&current, "p2"));

        assert_eq!(next.round_number, 2);
        assert_eq!(next.lives_of("p2"), Some(2));
        assert_eq!(next.lives_of("p1"), Some(3));
        assert!(next.player_swimming.is_none());
        assert!(next.nuke_by.is_none());
    }

    #[test]
    fn subtract_at_last_life_grants_swimming_instead() {
        let mut current = round(&[("p1", 3), ("p2", 1)]);
        current.player_swimming = None;

        let next = unwrap_round(subtract_life(&current, "p2"));
        assert_eq!(next.lives_of("p2"), Some(1)); // life kept
        assert_eq!(next.player_swimming.as_deref(), Some("p2"));
    }

    #[test]
    fn subtract_on_swimmer_decrements_and_eliminates() {
        let mut current = round(&[("p1", 3), ("p2", 1)]);
        current.player_swimming = Some("p2".to_string());

        let next = unwrap_round(subtract_life(&current, "p2"));
        assert_eq!(next.lives_of("p2"), Some(0));
        // Elimination frees the swimmer slot.
        assert!(next.player_swimming.is_none());
    }

    #[test]
    fn subtract_at_last_life_decrements_while_someone_else_swims() {
        let mut current = round(&[("p1", 3), ("p2", 1), ("p3", 1)]);
        current.player_swimming = Some("p3".to_string());

        let next = unwrap_round(subtract_life(&current, "p2"));
        assert_eq!(next.lives_of("p2"), Some(0));
        // The unrelated swimmer keeps the slot.
        assert_eq!(next.player_swimming.as_deref(), Some("p3"));
    }

    #[test]
    fn subtract_on_eliminated_player_is_a_no_op() {
        let current = round(&[("p1", 3), ("p2", 0)]);
        assert_eq!(subtract_life(&current, "p2"), SubtractOutcome::NoRound);
        assert_eq!(subtract_life(&current, "ghost"), SubtractOutcome::NoRound);
    }

    #[test]
    fn subtract_advances_the_dealer_past_eliminated_seats() {
        let mut current = round(&[("p1", 3), ("p2", 1), ("p3", 2)]);
        current.player_swimming = Some("p2".to_string());
        current.dealer = Some("p1".to_string());

        let next = unwrap_round(subtract_life(&current, "p2"));
        // p2 drops to zero, so the deal passes from p1 straight to p3.
        assert_eq!(next.dealer.as_deref(), Some("p3"));
    }

    #[test]
    fn first_action_establishes_a_dealer() {
        let ids: Vec<String> = vec!["p1".into(), "p2".into(), "p3".into()];
        let current = RoundSnapshot::initial(&ids);
        assert!(current.dealer.is_none());

        let next = unwrap_round(subtract_life(&current, "p2"));
        assert_eq!(next.dealer.as_deref(), Some("p1"));
    }

    #[rstest]
    #[case(&[("p1", 3), ("p2", 3), ("p3", 2)], "p1", Some(2), Some(1))]
    #[case(&[("p1", 1), ("p2", 3), ("p3", 3)], "p1", Some(2), Some(2))]
    fn nuke_damages_everyone_but_the_detonator(
        #[case] lives: &[(&str, u32)],
        #[case] detonator: &str,
        #[case] expected_p2: Option<u32>,
        #[case] expected_p3: Option<u32>,
    ) {
        let current = round(lives);
        let next = unwrap_nuke(detonate_nuke(&current, detonator, None));

        assert_eq!(next.lives_of(detonator), current.lives_of(detonator));
        assert_eq!(next.lives_of("p2"), expected_p2);
        assert_eq!(next.lives_of("p3"), expected_p3);
        assert_eq!(next.nuke_by.as_deref(), Some(detonator));
    }

    #[test]
    fn nuke_with_single_last_life_player_grants_automatic_survival() {
        let current = round(&[("p1", 3), ("p2", 1), ("p3", 2)]);
        let next = unwrap_nuke(detonate_nuke(&current, "p1", None));

        assert_eq!(next.lives_of("p2"), Some(1)); // survived as swimmer
        assert_eq!(next.player_swimming.as_deref(), Some("p2"));
        assert_eq!(next.lives_of("p3"), Some(1));
    }

    #[test]
    fn nuke_with_two_last_life_players_is_a_conflict() {
        let current = round(&[("p1", 3), ("p2", 1), ("p3", 1)]);

        let outcome = detonate_nuke(&current, "p1", None);
        let NukeOutcome::Conflict(candidates) = outcome else {
            panic!("expected a conflict, got {:?}", outcome);
        };
        assert_eq!(candidates, vec!["p2".to_string(), "p3".to_string()]);
    }

    #[test]
    fn nuke_conflict_resolves_once_a_survivor_is_chosen() {
        let current = round(&[("p1", 3), ("p2", 1), ("p3", 1)]);

        let next = unwrap_nuke(detonate_nuke(&current, "p1", Some("p3")));
        assert_eq!(next.lives_of("p2"), Some(0));
        assert_eq!(next.lives_of("p3"), Some(1));
        assert_eq!(next.player_swimming.as_deref(), Some("p3"));
    }

    #[test]
    fn nuke_rejects_a_survivor_outside_the_conflict_set() {
        let current = round(&[("p1", 3), ("p2", 1), ("p3", 1)]);

        // p1 cannot nominate themselves; the conflict stands.
        let outcome = detonate_nuke(&current, "p1", Some("p1"));
        assert!(matches!(outcome, NukeOutcome::Conflict(_)));
    }

    #[test]
    fn nuke_does_not_protect_an_existing_swimmer() {
        let mut current = round(&[("p1", 3), ("p2", 1), ("p3", 2)]);
        current.player_swimming = Some("p2".to_string());

        let next = unwrap_nuke(detonate_nuke(&current, "p1", None));
        assert_eq!(next.lives_of("p2"), Some(0));
        assert!(next.player_swimming.is_none()); // eliminated, slot cleared
        assert_eq!(next.lives_of("p3"), Some(1));
    }

    #[test]
    fn nuke_with_existing_swimmer_never_designates_a_new_one() {
        let mut current = round(&[("p1", 3), ("p2", 2), ("p3", 1), ("p4", 1)]);
        current.player_swimming = Some("p2".to_string());

        // Two players at one life would normally conflict, but the occupied
        // swimmer slot suppresses survivor designation entirely.
        let next = unwrap_nuke(detonate_nuke(&current, "p1", None));
        assert_eq!(next.lives_of("p3"), Some(0));
        assert_eq!(next.lives_of("p4"), Some(0));
        assert_eq!(next.player_swimming.as_deref(), Some("p2"));
    }

    #[test]
    fn nuke_skips_already_dead_players() {
        let current = round(&[("p1", 3), ("p2", 0), ("p3", 2)]);
        let next = unwrap_nuke(detonate_nuke(&current, "p1", None));

        assert_eq!(next.lives_of("p2"), Some(0));
        assert_eq!(next.lives_of("p3"), Some(1));
    }

    #[test]
    fn nuke_by_an_eliminated_player_is_a_no_op() {
        let current = round(&[("p1", 0), ("p2", 3)]);
        assert_eq!(detonate_nuke(&current, "p1", None), NukeOutcome::NoRound);
    }

    #[test]
    fn nuke_conflict_leaves_the_input_untouched() {
        let current = round(&[("p1", 3), ("p2", 1), ("p3", 1)]);
        let before = current.clone();

        let _ = detonate_nuke(&current, "p1", None);
        assert_eq!(current, before);
    }

    #[test]
    fn no_action_drops_more_than_one_life_per_player() {
        let current = round(&[("p1", 3), ("p2", 2), ("p3", 1), ("p4", 0)]);

        let subtracted = unwrap_round(subtract_life(&current, "p2"));
        let lost: u32 = current
            .players
            .iter()
            .zip(&subtracted.players)
            .map(|(before, after)| before.lives - after.lives)
            .sum();
        assert_eq!(lost, 1);

        let nuked = unwrap_nuke(detonate_nuke(&current, "p1", None));
        for (before, after) in current.players.iter().zip(&nuked.players) {
            assert!(before.lives - after.lives <= 1);
            assert!(after.lives <= before.lives);
        }
    }

    #[test]
    fn winner_requires_exactly_one_alive_player() {
        assert!(winner(&round(&[("p1", 3), ("p2", 2)])).is_none());
        assert!(winner(&round(&[("p1", 0), ("p2", 0)])).is_none());

        let final_round = round(&[("p1", 3), ("p2", 0), ("p3", 0)]);
        assert_eq!(winner(&final_round).map(|p| p.player_id.as_str()), Some("p1"));
    }

    #[test]
    fn three_hits_then_swim_then_elimination() {
        // The documented lifecycle of the grace mechanic: three hits bring a
        // player to their last life and the swimmer slot, the fourth hit
        // eliminates them outright.
        let ids: Vec<String> = vec!["p1".into(), "p2".into(), "p3".into()];
        let mut current = RoundSnapshot::initial(&ids);

        for expected in [2, 1] {
            current = unwrap_round(subtract_life(&current, "p1"));
            assert_eq!(current.lives_of("p1"), Some(expected));
            assert!(current.player_swimming.is_none());
        }

        current = unwrap_round(subtract_life(&current, "p1"));
        assert_eq!(current.lives_of("p1"), Some(1));
        assert_eq!(current.player_swimming.as_deref(), Some("p1"));

        current = unwrap_round(subtract_life(&current, "p1"));
        assert_eq!(current.lives_of("p1"), Some(0));
        assert!(current.player_swimming.is_none());
    }
}
