use crate::{AppState, handlers::auth};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints open to anonymous clients. Everything here either reports liveness or is part
/// of obtaining a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and container orchestration.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/login
        // Email/password exchange for a one-hour HS256 bearer token.
        .route("/api/auth/login", post(auth::login))
        // POST /api/auth/register
        // Self-service account creation. Returns { id, username, email }.
        .route("/api/auth/register", post(auth::register))
}
