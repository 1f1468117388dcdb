//! Backend of a news and discussion board: topics, articles, comments and users.
//!
//!
//!
//! # General Infrastructure
//! - A single axum server exposes the JSON API under `/api`
//! - Postgres holds every entity, the server owns one connection pool
//! - The `seed` binary rebuilds the schema and loads a data set
//!
//!
//!
//! # Request Path
//!
//! **Goal**: Reject bad input before it reaches a query.
//!
//! - Path ids go through a digit check, so `12a` never becomes a cast error in Postgres
//! - Bodies are read as raw bytes and parsed into a JSON object
//! - Shape checks look at field presence and count, then the handler pulls typed fields out
//! - Only then does the data-access layer run a parameterized query
//! - Empty result sets become 404s, anything unexpected from Postgres becomes a 500 and is logged
//!
//! Every error body has the same shape.
//! ```json
//! { "msg": "Invalid Article ID: please try again" }
//! ```
//!
//!
//!
//! # Setup
//!
//! Environment.
//! ```sh
//! export DATABASE_URL=postgres://localhost/nc_news
//! export RUST_PORT=9090
//! export RUST_LOG=info
//! ```
//!
//! Seed the database.
//! ```sh
//! cargo run -p seed -- --data data/test
//! ```
//!
//! Start the server.
//! ```sh
//! cargo run -p news
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, patch},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    api_handler, article_comments_handler, article_handler, articles_handler,
    delete_article_handler, delete_comment_handler, fallback_handler, patch_article_handler,
    patch_comment_handler, post_article_handler, post_comment_handler, post_topic_handler,
    topics_handler, user_handler, users_handler,
};
use state::State;

pub fn init_tracing() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
}

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api", get(api_handler))
        .route("/api/topics", get(topics_handler).post(post_topic_handler))
        .route("/api/articles", get(articles_handler).post(post_article_handler))
        .route(
            "/api/articles/{article_id}",
            get(article_handler)
                .patch(patch_article_handler)
                .delete(delete_article_handler),
        )
        .route(
            "/api/articles/{article_id}/comments",
            get(article_comments_handler).post(post_comment_handler),
        )
        .route(
            "/api/comments/{comment_id}",
            patch(patch_comment_handler).delete(delete_comment_handler),
        )
        .route("/api/users", get(users_handler))
        .route("/api/users/{username}", get(user_handler))
        .fallback(fallback_handler)
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    init_tracing();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await.inspect_err(|e| {
        error!("Failed to connect to Postgres: {e}");
    })?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let app = router(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            return std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
