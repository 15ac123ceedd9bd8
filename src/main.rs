use content_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{InMemoryRepository, MockApiRepository, RepositoryState},
    session::{FileSessionStore, MemorySessionStore, SessionState, SessionStore},
    storage::{CloudinaryUploader, StorageState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, wires the backend, image host and
/// session slot into `AppState`, then serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "content_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Backend collections
    let repo = match &config.api_url {
        Some(url) => {
            tracing::info!(api_url = %url, "Using MockAPI backend");
            Arc::new(MockApiRepository::new(url)) as RepositoryState
        }
        None => {
            tracing::warn!("API_URL not set; using in-memory backend with demo accounts");
            Arc::new(InMemoryRepository::with_demo_accounts()) as RepositoryState
        }
    };

    // 4. Image host
    let uploader = CloudinaryUploader::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_upload_preset.clone(),
    );
    if uploader.upload_url().is_none() {
        tracing::warn!("Cloudinary is not configured; image uploads will fail");
    }
    let storage = Arc::new(uploader) as StorageState;

    // 5. Session slot, initialised from whatever was persisted last run
    let session = match &config.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path)) as SessionState,
        None => Arc::new(MemorySessionStore::new()) as SessionState,
    };
    match session.get() {
        Some(record) => tracing::info!(user_id = %record.id, "Restored session"),
        None => tracing::debug!("No stored session"),
    }

    // 6. State and router
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        storage,
        session,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind listen address");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
