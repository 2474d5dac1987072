use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::leaderboard::metrics::{Metric, UserTotals};

/// One row of a ranked leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub placing: u32,
    pub user_id: String,
    pub value: f64,
    pub formatted: String,
}

/// Ranks users descending by metric value with competition placing: equal
/// values share a placing and the next distinct value skips past the tie
/// block, so values [5,5,3,3,1] place as [1,1,3,3,5].
pub fn rank(metric: Metric, totals: &HashMap<String, UserTotals>) -> Vec<RankedEntry> {
    let mut rows: Vec<(String, f64)> = totals
        .iter()
        .map(|(user_id, totals)| (user_id.clone(), metric.value(totals)))
        .collect();
    rows.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut entries = Vec::with_capacity(rows.len());
    let mut placing = 1u32;
    let mut previous: Option<f64> = None;
    for (index, (user_id, value)) in rows.into_iter().enumerate() {
        if previous.is_some_and(|p| value < p) {
            placing = index as u32 + 1;
        }
        previous = Some(value);
        entries.push(RankedEntry {
            placing,
            user_id,
            formatted: metric.format(value),
            value,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals_with_wins(wins: &[(&str, u32)]) -> HashMap<String, UserTotals> {
        wins.iter()
            .map(|(user, wins)| {
                (
                    user.to_string(),
                    UserTotals {
                        wins: *wins,
                        appearances: 10,
                        ..UserTotals::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn competition_placing_skips_past_ties() {
        let totals = totals_with_wins(&[
            ("u1", 5),
            ("u2", 5),
            ("u3", 3),
            ("u4", 3),
            ("u5", 1),
        ]);

        let ranked = rank(Metric::Wins, &totals);
        let placings: Vec<u32> = ranked.iter().map(|e| e.placing).collect();
        assert_eq!(placings, vec![1, 1, 3, 3, 5]);

        let values: Vec<f64> = ranked.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![5.0, 5.0, 3.0, 3.0, 1.0]);
    }

    #[test]
    fn ties_order_deterministically_by_user_id() {
        let totals = totals_with_wins(&[("zed", 2), ("abe", 2)]);
        let ranked = rank(Metric::Wins, &totals);
        assert_eq!(ranked[0].user_id, "abe");
        assert_eq!(ranked[1].user_id, "zed");
        assert_eq!(ranked[0].placing, 1);
        assert_eq!(ranked[1].placing, 1);
    }

    #[test]
    fn formats_ride_along_with_the_values() {
        let totals = totals_with_wins(&[("u1", 5)]);
        let ranked = rank(Metric::WinRate, &totals);
        assert_eq!(ranked[0].value, 0.5);
        assert_eq!(ranked[0].formatted, "50.00%");
    }

    #[test]
    fn empty_totals_rank_to_an_empty_board() {
        let ranked = rank(Metric::Wins, &HashMap::new());
        assert!(ranked.is_empty());
    }
}
