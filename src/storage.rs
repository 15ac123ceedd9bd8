use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;

/// Largest image accepted for upload (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// UploadError
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Missing Cloudinary env: cloud name or upload preset")]
    NotConfigured,

    #[error("Please choose an image file")]
    NotAnImage,

    #[error("Image must not exceed 5MB")]
    TooLarge,

    #[error("Failed to upload image: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to upload image: provider returned {0}")]
    Rejected(u16),
}

/// ImageFile
///
/// An image received from the client, ready to be forwarded to the image host.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Checks the constraints shared by every upload path: an `image/*` type and
    /// at most [`MAX_IMAGE_BYTES`].
    pub fn check(&self) -> Result<(), UploadError> {
        if !self.content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge);
        }
        Ok(())
    }
}

// 1. UploadService Contract
/// UploadService
///
/// Hosts post images and avatars on a third-party image service and returns
/// the public URL. The real implementation ([`CloudinaryUploader`]) can be
/// swapped for [`MockUploadService`] in tests without touching the handlers.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload_image(&self, file: ImageFile) -> Result<String, UploadError>;
}

/// StorageState
///
/// The concrete type used to share the upload service across the application state.
pub type StorageState = Arc<dyn UploadService>;

// 2. The Real Implementation (Cloudinary)
#[derive(Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
}

/// CloudinaryUploader
///
/// Unsigned uploads through a Cloudinary upload preset.
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: reqwest::Client,
    endpoint: String,
    cloud_name: Option<String>,
    upload_preset: Option<String>,
}

impl CloudinaryUploader {
    pub fn new(cloud_name: Option<String>, upload_preset: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name: cloud_name.filter(|s| !s.is_empty()),
            upload_preset: upload_preset.filter(|s| !s.is_empty()),
        }
    }

    /// Points the uploader at another API root (a local stub, for instance).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn upload_url(&self) -> Option<String> {
        self.cloud_name
            .as_ref()
            .map(|cloud| format!("{}/{}/image/upload", self.endpoint, cloud))
    }
}

#[async_trait]
impl UploadService for CloudinaryUploader {
    async fn upload_image(&self, file: ImageFile) -> Result<String, UploadError> {
        let (Some(cloud_name), Some(preset), Some(url)) =
            (&self.cloud_name, &self.upload_preset, self.upload_url())
        else {
            return Err(UploadError::NotConfigured);
        };
        file.check()?;

        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(|_| UploadError::NotAnImage)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", preset.clone())
            .text("cloud_name", cloud_name.clone());

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Image upload rejected");
            return Err(UploadError::Rejected(status.as_u16()));
        }

        let body: CloudinaryResponse = response.json().await?;
        Ok(body.secure_url)
    }
}

/// sanitize_name
///
/// Reduces a client-supplied file name to its last path segment, so it can be
/// embedded in a URL without directory components.
fn sanitize_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .unwrap_or("image")
        .to_string()
}

// 3. The Mock Implementation (For Tests)
/// MockUploadService
///
/// Returns a deterministic URL without any network traffic.
#[derive(Clone, Default)]
pub struct MockUploadService {
    /// When true, every upload fails.
    pub should_fail: bool,
}

impl MockUploadService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl UploadService for MockUploadService {
    async fn upload_image(&self, file: ImageFile) -> Result<String, UploadError> {
        file.check()?;
        if self.should_fail {
            return Err(UploadError::Rejected(500));
        }
        Ok(format!(
            "https://res.cloudinary.test/mock/image/upload/{}",
            sanitize_name(&file.filename)
        ))
    }
}
