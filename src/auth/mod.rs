// Public API
pub use handlers::create_session;
pub use middleware::jwt_auth;
pub use token::{TokenConfig, UserClaims};

pub mod handlers;
pub mod middleware;
pub mod token;
