use crate::models::{NewPost, NewUser, Post, PostPatch, Role, Timestamp, User, UserPatch};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// RepositoryError
///
/// Failures talking to the backend collections.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The request never produced a response (DNS, connection, decoding...).
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status} for {method} {url}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },
}

/// Repository Trait
///
/// Abstract contract over the two backend collections, `users` and `posts`.
/// Each collection supports list/create and get/update/delete by id. Handlers
/// and account flows work against `Arc<dyn Repository>` so the HTTP backend can
/// be replaced by the in-memory one in tests and local runs.
///
/// Lookups and mutations of a missing id yield `None`/`false` rather than an error.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;
    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError>;
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>, RepositoryError>;
    async fn delete_user(&self, id: &str) -> Result<bool, RepositoryError>;

    // --- Posts ---
    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError>;
    async fn get_post(&self, id: &str) -> Result<Option<Post>, RepositoryError>;
    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError>;
    async fn update_post(&self, id: &str, patch: PostPatch) -> Result<Option<Post>, RepositoryError>;
    async fn delete_post(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share repository access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- HTTP Implementation ---

const USERS: &str = "User";
const POSTS: &str = "Post";

/// MockApiRepository
///
/// Talks to a MockAPI-style REST backend exposing `/User` and `/Post`
/// collections. Every call is a single request: no retry, no backoff.
#[derive(Clone)]
pub struct MockApiRepository {
    client: Client,
    base_url: String,
}

impl MockApiRepository {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    fn item_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    fn status_error(method: &'static str, url: String, status: StatusCode) -> RepositoryError {
        tracing::error!(%method, %url, status = status.as_u16(), "Backend API error");
        RepositoryError::Status {
            method,
            url,
            status: status.as_u16(),
        }
    }

    async fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, RepositoryError> {
        let url = self.collection_url(collection);
        tracing::debug!(method = "GET", %url, "Backend request");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        // MockAPI answers 404 with a "Not found" body for an empty collection.
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Self::status_error("GET", url, status));
        }
        // Decode records one by one so a single malformed entry does not hide the rest.
        let records: Vec<serde_json::Value> = response.json().await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<T>(record) {
                Ok(item) => Some(item),
                Err(error) => {
                    tracing::warn!(%collection, %error, "Skipping malformed record");
                    None
                }
            })
            .collect())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, RepositoryError> {
        let url = self.item_url(collection, id);
        tracing::debug!(method = "GET", %url, "Backend request");
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(Self::status_error("GET", url, status)),
        }
    }

    async fn create<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        collection: &str,
        body: &B,
    ) -> Result<T, RepositoryError> {
        let url = self.collection_url(collection);
        tracing::debug!(method = "POST", %url, "Backend request");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error("POST", url, status));
        }
        Ok(response.json().await?)
    }

    async fn update<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        body: &B,
    ) -> Result<Option<T>, RepositoryError> {
        let url = self.item_url(collection, id);
        tracing::debug!(method = "PUT", %url, "Backend request");
        let response = self.client.put(&url).json(body).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(Self::status_error("PUT", url, status)),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, RepositoryError> {
        let url = self.item_url(collection, id);
        tracing::debug!(method = "DELETE", %url, "Backend request");
        let response = self.client.delete(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Self::status_error("DELETE", url, status)),
        }
    }
}

#[async_trait]
impl Repository for MockApiRepository {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        self.list(USERS).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        self.get(USERS, id).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.create(USERS, &user).await
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>, RepositoryError> {
        self.update(USERS, id, &patch).await
    }

    async fn delete_user(&self, id: &str) -> Result<bool, RepositoryError> {
        self.delete(USERS, id).await
    }

    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        self.list(POSTS).await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, RepositoryError> {
        self.get(POSTS, id).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError> {
        self.create(POSTS, &post).await
    }

    async fn update_post(&self, id: &str, patch: PostPatch) -> Result<Option<Post>, RepositoryError> {
        self.update(POSTS, id, &patch).await
    }

    async fn delete_post(&self, id: &str) -> Result<bool, RepositoryError> {
        self.delete(POSTS, id).await
    }
}

// --- In-Memory Implementation ---

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    posts: Vec<Post>,
}

/// InMemoryRepository
///
/// A process-local stand-in for the backend, used by tests and by local runs
/// without `API_URL`. Ids are random UUID strings and both dates are stamped on
/// write, as the real backend does.
#[derive(Default)]
pub struct InMemoryRepository {
    data: RwLock<Collections>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(users: Vec<User>, posts: Vec<Post>) -> Self {
        Self {
            data: RwLock::new(Collections { users, posts }),
        }
    }

    /// Two demo accounts: `admin@example.com / admin123` and `user@example.com / user123`.
    pub fn with_demo_accounts() -> Self {
        let demo = |id: &str, name: &str, email: &str, password: &str, role: Role| User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: Some(password.to_string()),
            role,
            avatar: None,
            is_active: Some(true),
            create_date: Some(Timestamp::now()),
            update_date: Some(Timestamp::now()),
        };
        Self::with_data(
            vec![
                demo("1", "Administrator", "admin@example.com", "admin123", Role::Admin),
                demo("2", "Demo User", "user@example.com", "user123", Role::User),
            ],
            Vec::new(),
        )
    }
}

fn apply_user_patch(user: &mut User, patch: UserPatch) {
    if let Some(name) = patch.name {
        user.name = name;
    }
    if let Some(email) = patch.email {
        user.email = email;
    }
    if let Some(password) = patch.password {
        user.password = Some(password);
    }
    if let Some(role) = patch.role {
        user.role = role;
    }
    if let Some(avatar) = patch.avatar {
        user.avatar = Some(avatar);
    }
    if let Some(is_active) = patch.is_active {
        user.is_active = Some(is_active);
    }
    user.update_date = Some(Timestamp::now());
}

fn apply_post_patch(post: &mut Post, patch: PostPatch) {
    if let Some(title) = patch.title {
        post.title = title;
    }
    if let Some(description) = patch.description {
        post.description = description;
    }
    if let Some(image_url) = patch.image_url {
        post.image_url = image_url;
    }
    if let Some(url_tag) = patch.url_tag {
        post.url_tag = url_tag;
    }
    if let Some(status) = patch.status {
        post.status = status;
    }
    post.update_date = Some(Timestamp::now());
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.data.read().await.users.clone())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.data.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let now = Timestamp::now();
        let created = User {
            id: Uuid::new_v4().to_string(),
            name: user.name,
            email: user.email,
            password: Some(user.password),
            role: user.role,
            avatar: user.avatar,
            is_active: Some(user.is_active),
            create_date: Some(now.clone()),
            update_date: Some(now),
        };
        self.data.write().await.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>, RepositoryError> {
        let mut data = self.data.write().await;
        Ok(data.users.iter_mut().find(|u| u.id == id).map(|user| {
            apply_user_patch(user, patch);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut data = self.data.write().await;
        let before = data.users.len();
        data.users.retain(|u| u.id != id);
        Ok(data.users.len() != before)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        Ok(self.data.read().await.posts.clone())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, RepositoryError> {
        Ok(self.data.read().await.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError> {
        let now = Timestamp::now();
        let created = Post {
            id: Uuid::new_v4().to_string(),
            user_id: post.user_id,
            title: post.title,
            description: post.description,
            image_url: post.image_url,
            url_tag: post.url_tag,
            status: post.status,
            create_date: Some(now.clone()),
            update_date: Some(now),
        };
        self.data.write().await.posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: &str, patch: PostPatch) -> Result<Option<Post>, RepositoryError> {
        let mut data = self.data.write().await;
        Ok(data.posts.iter_mut().find(|p| p.id == id).map(|post| {
            apply_post_patch(post, patch);
            post.clone()
        }))
    }

    async fn delete_post(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut data = self.data.write().await;
        let before = data.posts.len();
        data.posts.retain(|p| p.id != id);
        Ok(data.posts.len() != before)
    }
}
