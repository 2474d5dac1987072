mod auth;
mod game;
mod leaderboard;
mod shared;
mod tracker;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use game::repository::InMemoryGameRepository;
use shared::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracker::repository::InMemoryTrackerRepository;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schwimmen_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Schwimmen tracker server");

    // Create shared application state with dependency injection.
    // The in-memory repositories carry development; set DATABASE_URL to run
    // against PostgreSQL:
    let app_state = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            AppState::new(
                Arc::new(tracker::repository::PostgresTrackerRepository::new(
                    pool.clone(),
                )),
                Arc::new(game::repository::PostgresGameRepository::new(pool)),
                auth::TokenConfig::new(),
            )
        }
        Err(_) => AppState::new(
            Arc::new(InMemoryTrackerRepository::new()),
            Arc::new(InMemoryGameRepository::new()),
            auth::TokenConfig::new(),
        ),
    };

    // Everything except session issuing and leaderboard reads requires an
    // authenticated caller.
    let authenticated = Router::new()
        .route("/trackers", post(tracker::handlers::create_tracker))
        .route("/trackers/:tracker_id", get(tracker::handlers::get_tracker))
        .route(
            "/trackers/:tracker_id/archive",
            post(tracker::handlers::archive_tracker),
        )
        .route(
            "/trackers/:tracker_id/games",
            post(game::handlers::create_game),
        )
        .route("/games/:game_id", get(game::handlers::get_game))
        .route("/games/:game_id/subtract", post(game::handlers::subtract_life))
        .route("/games/:game_id/nuke", post(game::handlers::detonate_nuke))
        .route("/games/:game_id/undo", post(game::handlers::undo))
        .route("/games/:game_id/redo", post(game::handlers::redo))
        .route("/games/:game_id/reset", post(game::handlers::reset))
        .route("/games/:game_id/cancel", post(game::handlers::cancel))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::jwt_auth,
        ));

    let app = Router::new()
        .route("/", get(|| async { "Schwimmen tracker" }))
        .route("/auth/session", post(auth::handlers::create_session))
        .route(
            "/leaderboard/:tracker_type/:metric",
            get(leaderboard::handlers::get_leaderboard),
        )
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let bind_addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await.unwrap();
}
