use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Session slot and the route guard built on it.
pub mod auth;
pub mod guard;
pub mod session;

// Pages, flows and their shared helpers.
pub mod account;
pub mod error;
pub mod handlers;
pub mod helpers;
pub mod models;

// External services.
pub mod config;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{InMemoryRepository, MockApiRepository, RepositoryState};
pub use session::{FileSessionStore, MemorySessionStore, SessionState};
pub use storage::{CloudinaryUploader, MockUploadService, StorageState};

/// ApiDoc
///
/// OpenAPI document for every page endpoint, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::register, handlers::logout,
        handlers::dashboard, handlers::my_posts, handlers::post_detail,
        handlers::create_post, handlers::update_post, handlers::delete_post,
        handlers::get_profile, handlers::update_profile, handlers::change_password,
        handlers::upload_image,
        handlers::list_users, handlers::add_user, handlers::update_user_role,
        handlers::update_user_status, handlers::delete_user,
        handlers::pending_posts, handlers::approve_post, handlers::reject_post
    ),
    components(
        schemas(
            models::Role, models::PostStatus, models::User, models::Post,
            models::LoginRequest, models::RegisterRequest, models::LoginResponse,
            models::CreatePostRequest, models::UpdatePostRequest,
            models::ProfileUpdateRequest, models::ChangePasswordRequest,
            models::AddUserRequest, models::UpdateRoleRequest, models::UpdateStatusRequest,
            models::AuthorInfo, models::PostView, models::UploadResponse,
            models::DashboardView, models::FieldErrors,
            session::SessionRecord, guard::NavEntry,
        )
    ),
    tags(
        (name = "content-portal", description = "Content Portal pages")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cloneable container for the services every handler may need. The
/// session slot lives here too: the portal serves a single client, so there is
/// exactly one current user per process.
#[derive(Clone)]
pub struct AppState {
    /// Backend collections (`/User`, `/Post`).
    pub repo: RepositoryState,
    /// Image host.
    pub storage: StorageState,
    /// The persisted session slot read by the route guard.
    pub session: SessionState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.session.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the page groups, puts each protected group behind its guard layer
/// and adds the request-id, tracing and CORS layers around everything.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Any session passes; none redirects to /login.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_session,
            )),
        )
        // Admin only; a `user` session redirects to /dashboard.
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_admin,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with its `x-request-id` so every log line of the
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
