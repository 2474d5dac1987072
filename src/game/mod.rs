// Public API
pub use engine::{detonate_nuke, subtract_life, winner, NukeOutcome, SubtractOutcome};
pub use models::{
    CompletedGame, GameData, GameModel, GameParticipantModel, GameRoundModel, GameStatus,
    NewParticipant,
};
pub use repository::{GameRepository, InMemoryGameRepository, PostgresGameRepository};
pub use round::{PlayerLives, RoundSnapshot, STARTING_LIVES};
pub use service::{ActionResult, GameService, GameView, NukeResult};
pub use session::{ActionMode, GameSession, PreparedAction, SessionError};
pub use turn_order::next_dealer;

pub mod engine;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod round;
pub mod service;
pub mod session;
pub mod turn_order;
