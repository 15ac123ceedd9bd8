use axum::{
    Json, Router,
    extract::{Multipart, Path},
    http::StatusCode,
    routing::post,
};
use content_portal::storage::{
    CloudinaryUploader, ImageFile, MAX_IMAGE_BYTES, MockUploadService, UploadError, UploadService,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

fn png(bytes: usize) -> ImageFile {
    ImageFile {
        filename: "photo.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0u8; bytes],
    }
}

/// Stand-in for the Cloudinary upload endpoint. Echoes the preset back in the
/// returned URL so the test can check the form was built correctly.
async fn fake_cloudinary(Path(cloud): Path<String>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    let mut preset = None;
    let mut file_name = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("upload_preset") => preset = Some(field.text().await.unwrap()),
            Some("file") => file_name = field.file_name().map(str::to_string),
            _ => {}
        }
    }
    match (preset, file_name) {
        (Some(preset), Some(name)) => (
            StatusCode::OK,
            Json(json!({
                "secure_url": format!("https://res.cloudinary.com/{cloud}/{preset}/{name}")
            })),
        ),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad form" }))),
    }
}

async fn spawn_fake_cloudinary() -> String {
    let app = Router::new().route("/{cloud}/image/upload", post(fake_cloudinary));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address
}

#[tokio::test]
async fn test_mock_upload_returns_url() {
    let mock = MockUploadService::new();
    let url = mock.upload_image(png(10)).await.unwrap();
    assert!(url.ends_with("/photo.png"));
}

#[tokio::test]
async fn test_mock_upload_failing() {
    let mock = MockUploadService::new_failing();
    assert!(matches!(
        mock.upload_image(png(10)).await,
        Err(UploadError::Rejected(_))
    ));
}

#[tokio::test]
async fn test_non_image_is_rejected() {
    let mock = MockUploadService::new();
    let mut file = png(10);
    file.content_type = "application/pdf".to_string();
    assert!(matches!(
        mock.upload_image(file).await,
        Err(UploadError::NotAnImage)
    ));
}

#[tokio::test]
async fn test_size_limit_is_inclusive() {
    assert!(png(MAX_IMAGE_BYTES).check().is_ok());
    assert!(matches!(
        png(MAX_IMAGE_BYTES + 1).check(),
        Err(UploadError::TooLarge)
    ));
}

#[tokio::test]
async fn test_mock_strips_directories_from_name() {
    let mock = MockUploadService::new();
    let mut file = png(10);
    file.filename = "../../etc/passwd.png".to_string();
    let url = mock.upload_image(file).await.unwrap();
    assert!(url.ends_with("/passwd.png"));
    assert!(!url.contains(".."));
}

#[tokio::test]
async fn test_cloudinary_without_configuration() {
    let uploader = CloudinaryUploader::new(Some("demo".to_string()), None);
    assert!(matches!(
        uploader.upload_image(png(10)).await,
        Err(UploadError::NotConfigured)
    ));

    let uploader = CloudinaryUploader::new(Some(String::new()), Some("preset".to_string()));
    assert_eq!(uploader.upload_url(), None);
}

#[tokio::test]
async fn test_cloudinary_upload_url_format() {
    let uploader = CloudinaryUploader::new(Some("demo".to_string()), Some("p".to_string()));
    assert_eq!(
        uploader.upload_url().as_deref(),
        Some("https://api.cloudinary.com/v1_1/demo/image/upload")
    );
}

#[tokio::test]
async fn test_cloudinary_posts_multipart_form() {
    let endpoint = spawn_fake_cloudinary().await;
    let uploader = CloudinaryUploader::new(Some("demo".to_string()), Some("unsigned".to_string()))
        .with_endpoint(&endpoint);

    let url = uploader.upload_image(png(64)).await.unwrap();

    assert_eq!(url, "https://res.cloudinary.com/demo/unsigned/photo.png");
}

#[tokio::test]
async fn test_cloudinary_error_status_is_reported() {
    let endpoint = spawn_fake_cloudinary().await;
    // No route for this path on the stub: 404.
    let uploader = CloudinaryUploader::new(Some("demo".to_string()), Some("unsigned".to_string()))
        .with_endpoint(&format!("{endpoint}/missing"));

    assert!(matches!(
        uploader.upload_image(png(64)).await,
        Err(UploadError::Rejected(404))
    ));
}

#[tokio::test]
async fn test_cloudinary_unparseable_image_type_is_not_an_image() {
    let endpoint = spawn_fake_cloudinary().await;
    let uploader = CloudinaryUploader::new(Some("demo".to_string()), Some("unsigned".to_string()))
        .with_endpoint(&endpoint);
    let mut file = png(10);
    // Passes the prefix check but is not a valid media type.
    file.content_type = "image/".to_string();

    assert!(matches!(
        uploader.upload_image(file).await,
        Err(UploadError::NotAnImage)
    ));
}
