use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Signing in and registering are the
/// only writers of the session slot besides profile updates.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe; returns "ok" without touching the backend.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Credential check against the backend user list. Answers with the
        // stored session record and the role's landing page.
        .route("/login", post(handlers::login))
        // POST /register
        // New `user` account; fails on a duplicate email.
        .route("/register", post(handlers::register))
        // POST /logout
        // Clears the session and redirects to /login. Idempotent.
        .route("/logout", post(handlers::logout))
}
