use crate::{AppState, handlers, storage::MAX_IMAGE_BYTES};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Dashboard pages for any signed-in user. The whole group sits behind
/// `auth::require_session`; without a session every path here redirects to
/// /login. Ownership of posts is checked inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // Shell: signed-in user plus the sidebar filtered by role.
        .route("/dashboard", get(handlers::dashboard))
        // GET /dashboard/posts
        // The user's own posts, newest first.
        .route("/dashboard/posts", get(handlers::my_posts))
        // GET/DELETE /dashboard/posts/{id}
        .route(
            "/dashboard/posts/{id}",
            get(handlers::post_detail).delete(handlers::delete_post),
        )
        // POST /dashboard/create-post
        // New posts always start as `pending`.
        .route("/dashboard/create-post", post(handlers::create_post))
        // PUT /dashboard/edit-post/{id}
        .route("/dashboard/edit-post/{id}", put(handlers::update_post))
        // GET/PUT /dashboard/profile
        .route(
            "/dashboard/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        // PUT /dashboard/profile/password
        .route("/dashboard/profile/password", put(handlers::change_password))
        // POST /dashboard/upload
        // Multipart image upload. The body limit leaves room for the multipart
        // framing around a maximum-size image.
        .route(
            "/dashboard/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
}
