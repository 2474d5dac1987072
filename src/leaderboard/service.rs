use std::sync::Arc;
use tracing::{debug, instrument};

use crate::game::repository::GameRepository;
use crate::leaderboard::metrics::{accumulate, Metric};
use crate::leaderboard::ranking::{rank, RankedEntry};
use crate::shared::AppError;
use crate::tracker::models::TrackerType;

/// Read-only batch computation over the completed-game corpus. Holds no
/// mutable state; concurrent invocations are independent.
pub struct LeaderboardService {
    games: Arc<dyn GameRepository>,
}

impl LeaderboardService {
    pub fn new(games: Arc<dyn GameRepository>) -> Self {
        Self { games }
    }

    #[instrument(skip(self))]
    pub async fn compute(
        &self,
        tracker_type: TrackerType,
        metric: Metric,
        tracker_ids: Option<&[String]>,
    ) -> Result<Vec<RankedEntry>, AppError> {
        let games = self
            .games
            .list_completed_games(tracker_type, tracker_ids)
            .await?;
        debug!(
            games = games.len(),
            metric = %metric,
            "Replaying completed games for leaderboard"
        );
        let totals = accumulate(&games, tracker_type);
        Ok(rank(metric, &totals))
    }
}
