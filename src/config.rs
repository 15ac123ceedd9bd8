use std::env;

/// Default listen address when `BIND_ADDR` is not set.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared through
/// `AppState`. In local mode every external service is optional so the portal
/// can run against in-memory fakes.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker.
    pub env: Env,
    // Base URL of the MockAPI-style backend, e.g. https://xyz.mockapi.io/api/v1.
    // `None` means the in-memory repository with demo accounts.
    pub api_url: Option<String>,
    // Cloudinary account used for image uploads.
    pub cloudinary_cloud_name: Option<String>,
    // Unsigned upload preset configured in Cloudinary.
    pub cloudinary_upload_preset: Option<String>,
    // File holding the persisted session slot. `None` keeps it in memory.
    pub session_file: Option<String>,
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: local development tolerates missing services, production
/// does not.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Local configuration with no external services, used by tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_url: None,
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: None,
            session_file: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (call after
    /// `dotenv`).
    ///
    /// # Panics
    /// In production, panics when `API_URL`, `CLOUDINARY_CLOUD_NAME`,
    /// `CLOUDINARY_UPLOAD_PRESET` or `SESSION_FILE` is missing, so the portal
    /// never starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                api_url: optional("API_URL"),
                cloudinary_cloud_name: optional("CLOUDINARY_CLOUD_NAME"),
                cloudinary_upload_preset: optional("CLOUDINARY_UPLOAD_PRESET"),
                session_file: optional("SESSION_FILE"),
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                api_url: Some(optional("API_URL").expect("FATAL: API_URL required in prod")),
                cloudinary_cloud_name: Some(
                    optional("CLOUDINARY_CLOUD_NAME")
                        .expect("FATAL: CLOUDINARY_CLOUD_NAME required in prod"),
                ),
                cloudinary_upload_preset: Some(
                    optional("CLOUDINARY_UPLOAD_PRESET")
                        .expect("FATAL: CLOUDINARY_UPLOAD_PRESET required in prod"),
                ),
                session_file: Some(
                    optional("SESSION_FILE").expect("FATAL: SESSION_FILE required in prod"),
                ),
                bind_addr,
            },
        }
    }
}
