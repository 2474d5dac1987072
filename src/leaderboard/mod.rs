// Public API
pub use metrics::{accumulate, Metric, UserTotals};
pub use ranking::{rank, RankedEntry};
pub use service::LeaderboardService;

pub mod handlers;
pub mod metrics;
pub mod ranking;
pub mod service;
