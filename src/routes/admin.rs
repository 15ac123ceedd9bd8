use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// User management and post moderation. The group is wrapped in
/// `auth::require_admin`: no session redirects to /login, a `user` session
/// redirects to /dashboard.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /dashboard/users
        // Search + pagination (10 per page), and direct account creation.
        .route(
            "/dashboard/users",
            get(handlers::list_users).post(handlers::add_user),
        )
        // PUT /dashboard/users/{id}/role
        .route("/dashboard/users/{id}/role", put(handlers::update_user_role))
        // PUT /dashboard/users/{id}/status
        // Lock or unlock; locked accounts cannot sign in.
        .route(
            "/dashboard/users/{id}/status",
            put(handlers::update_user_status),
        )
        // DELETE /dashboard/users/{id}
        .route("/dashboard/users/{id}", delete(handlers::delete_user))
        // GET /dashboard/post-approval
        // Queue of posts still `pending`.
        .route("/dashboard/post-approval", get(handlers::pending_posts))
        // POST /dashboard/post-approval/{id}/approve
        .route(
            "/dashboard/post-approval/{id}/approve",
            post(handlers::approve_post),
        )
        // DELETE /dashboard/post-approval/{id}
        // Rejecting a post removes it.
        .route(
            "/dashboard/post-approval/{id}",
            delete(handlers::reject_post),
        )
}
