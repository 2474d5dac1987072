// Public API
pub use models::{NewTrackerPlayer, TrackerModel, TrackerPlayerModel, TrackerType};
pub use repository::{InMemoryTrackerRepository, PostgresTrackerRepository, TrackerRepository};
pub use service::{TrackerService, TrackerView};

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
