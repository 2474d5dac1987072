// Library crate for the Schwimmen tracker server
// This file exposes the public API for integration tests

pub mod auth;
pub mod game;
pub mod leaderboard;
pub mod shared;
pub mod tracker;

// Re-export commonly used types for easier access in tests
pub use game::{
    GameService, GameSession, GameStatus, GameView, NukeResult, RoundSnapshot, STARTING_LIVES,
};
pub use leaderboard::{LeaderboardService, Metric, RankedEntry};
pub use shared::{AppError, AppState};
pub use tracker::{TrackerService, TrackerType};
