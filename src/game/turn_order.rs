use crate::game::round::PlayerLives;

/// Finds the next dealer in seating order.
///
/// The seating order is circular: the scan starts at the seat after
/// `reference`, wraps from the last seat to the first, and skips players with
/// no lives left. The scan visits each seat at most once, so a fully
/// eliminated table yields `None`. With `reference = None` (round 0, no dealer
/// established yet) the first alive player in seating order is chosen.
pub fn next_dealer(players: &[PlayerLives], reference: Option<&str>) -> Option<String> {
    let start = match reference {
        Some(id) => players.iter().position(|p| p.player_id == id)? + 1,
        None => {
            return players
                .iter()
                .find(|p| p.lives > 0)
                .map(|p| p.player_id.clone())
        }
    };

    (0..players.len())
        .map(|offset| &players[(start + offset) % players.len()])
        .find(|p| p.lives > 0)
        .map(|p| p.player_id.clone())
}
