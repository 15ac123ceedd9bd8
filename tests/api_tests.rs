use content_portal::{
    AppConfig, AppState, MockUploadService, create_router,
    models::{Post, PostStatus},
    repository::{InMemoryRepository, RepositoryState},
    session::{MemorySessionStore, SessionState},
    storage::StorageState,
};
use reqwest::{StatusCode, redirect::Policy};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("req fail")
    }
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::with_demo_accounts()) as RepositoryState;
    let storage = Arc::new(MockUploadService::new()) as StorageState;
    let session = Arc::new(MemorySessionStore::new()) as SessionState;

    let state = AppState {
        repo,
        storage,
        session,
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects are asserted on, not followed.
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp { address, client }
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_guarded_page_without_session_redirects_to_login() {
    let app = spawn_app().await;

    for path in ["/dashboard", "/dashboard/posts", "/dashboard/users"] {
        let response = app.client.get(app.url(path)).send().await.expect("req fail");
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/login", "{path}");
    }
}

#[tokio::test]
async fn test_admin_page_as_user_redirects_to_dashboard() {
    let app = spawn_app().await;
    assert!(app.login("user@example.com", "user123").await.status().is_success());

    let response = app
        .client
        .get(app.url("/dashboard/users"))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    // The default area itself stays reachable.
    let response = app.client.get(app.url("/dashboard")).send().await.expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_response_names_landing_page() {
    let app = spawn_app().await;

    let response = app.login("admin@example.com", "admin123").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["redirectTo"], "/dashboard/users");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password").is_none());

    let response = app.login("admin@example.com", "nope-nope").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Email or password is incorrect");
}

#[tokio::test]
async fn test_logout_then_guarded_page_redirects() {
    let app = spawn_app().await;
    app.login("user@example.com", "user123").await;

    let response = app.client.post(app.url("/logout")).send().await.expect("req fail");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = app.client.get(app.url("/dashboard")).send().await.expect("req fail");
    assert_eq!(location(&response), "/login");

    // Logging out twice is harmless.
    let response = app.client.post(app.url("/logout")).send().await.expect("req fail");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = spawn_app().await;

    // 1. A user submits a post
    app.login("user@example.com", "user123").await;
    let response = app
        .client
        .post(app.url("/dashboard/create-post"))
        .json(&json!({
            "title": "Bài viết mới!",
            "description": "Một bài viết để thử quy trình duyệt",
            "imageUrl": "https://img.example.com/p.png"
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Post = response.json().await.unwrap();
    assert_eq!(created.status, PostStatus::Pending);
    assert_eq!(created.url_tag, "bai-viet-moi");

    let mine: Value = app
        .client
        .get(app.url("/dashboard/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    // 2. The administrator approves it
    app.login("admin@example.com", "admin123").await;
    let queue: Value = app
        .client
        .get(app.url("/dashboard/post-approval"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(queue[0]["post"]["id"], created.id.as_str());
    assert_eq!(queue[0]["author"]["name"], "Demo User");

    let response = app
        .client
        .post(app.url(&format!("/dashboard/post-approval/{}/approve", created.id)))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    let approved: Post = response.json().await.unwrap();
    assert_eq!(approved.status, PostStatus::Published);
}

#[tokio::test]
async fn test_user_management_listing() {
    let app = spawn_app().await;
    app.login("admin@example.com", "admin123").await;

    let page: Value = app
        .client
        .get(app.url("/dashboard/users?search=demo&page=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["items"][0]["email"], "user@example.com");
    assert!(page["items"][0].get("password").is_none());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(doc["paths"].get("/login").is_some());
    assert!(doc["paths"].get("/dashboard/post-approval/{id}/approve").is_some());
}
