use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{guard::NavEntry, session::SessionRecord};

// --- Validation Patterns ---

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

static URL_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("url tag pattern"));

/// Minimum password length accepted by every form that sets a password.
pub const MIN_PASSWORD_LEN: usize = 6;

// --- Enumerations ---

/// Role
///
/// The closed set of permission levels. Serialized as the lowercase strings
/// "admin" and "user", which is the representation used by the backend and by
/// the persisted session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Landing page after a successful login.
    pub fn landing_path(self) -> &'static str {
        match self {
            Role::Admin => "/dashboard/users",
            Role::User => "/dashboard/posts",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// PostStatus
///
/// Moderation state of a post. New posts start as `Pending` and become
/// `Published` once an administrator approves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostStatus {
    Published,
    Draft,
    #[default]
    Pending,
}

/// Timestamp
///
/// The backend is inconsistent about dates: some records carry Unix seconds,
/// others an ISO-like string. Both shapes are accepted and kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Unix(i64),
    Text(String),
}

impl Timestamp {
    pub fn now() -> Self {
        Timestamp::Text(Utc::now().to_rfc3339())
    }

    /// Resolves the timestamp to a UTC instant, if it can be parsed.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Unix(secs) => Utc.timestamp_opt(*secs, 0).single(),
            Timestamp::Text(text) => parse_date_text(text),
        }
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// --- Backend Entities ---

/// User
///
/// The user entity as stored in the backend `/User` collection. The password is
/// kept by the mock backend in plain text; it is only ever read to compare
/// credentials and is stripped with [`User::redacted`] before leaving the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | number | null")]
    #[schema(value_type = Option<String>)]
    pub create_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | number | null")]
    #[schema(value_type = Option<String>)]
    pub update_date: Option<Timestamp>,
}

impl User {
    /// An absent `isActive` flag means the account is active.
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    pub fn redacted(mut self) -> Self {
        self.password = None;
        self
    }
}

/// Post
///
/// A post record from the backend `/Post` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    // SEO slug, e.g. "bai-viet-moi".
    pub url_tag: String,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | number | null")]
    #[schema(value_type = Option<String>)]
    pub create_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | number | null")]
    #[schema(value_type = Option<String>)]
    pub update_date: Option<Timestamp>,
}

/// NewUser
///
/// Body of `POST /User`. The backend assigns `id` and the dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_active: bool,
}

/// UserPatch
///
/// Partial update for `PUT /User/{id}`; only the provided fields are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// NewPost
///
/// Body of `POST /Post`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub url_tag: String,
    pub status: PostStatus,
}

/// PostPatch
///
/// Partial update for `PUT /Post/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
}

// --- Form Validation ---

/// FieldErrors
///
/// Per-field validation messages, keyed by the form field name. Serialized as a
/// flat JSON object so a front end can attach each message to its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub struct FieldErrors(pub BTreeMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn is_valid_url_tag(tag: &str) -> bool {
    URL_TAG_PATTERN.is_match(tag)
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Email is invalid");
    }
}

fn check_new_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.is_empty() {
        errors.add(field, "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(field, "Password must be at least 6 characters");
    }
}

fn check_post_body(errors: &mut FieldErrors, title: &str, description: &str, url_tag: Option<&str>) {
    if title.trim().is_empty() {
        errors.add("title", "Title is required");
    } else if title.trim().chars().count() < 5 {
        errors.add("title", "Title must be at least 5 characters");
    }
    if description.trim().is_empty() {
        errors.add("description", "Description is required");
    } else if description.trim().chars().count() < 10 {
        errors.add("description", "Description must be at least 10 characters");
    }
    if let Some(tag) = url_tag.filter(|t| !t.is_empty()) {
        if !is_valid_url_tag(tag) {
            errors.add(
                "urlTag",
                "URL tag must be lowercase letters, numbers, and hyphens only (e.g., my-new-post)",
            );
        }
    }
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        }
        check_new_password(&mut errors, "password", &self.password);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.add("name", "Name is required");
        } else if self.name.trim().chars().count() < 2 {
            errors.add("name", "Name must be at least 2 characters");
        }
        check_email(&mut errors, &self.email);
        check_new_password(&mut errors, "password", &self.password);
        if self.confirm_password.is_empty() {
            errors.add("confirmPassword", "Please confirm your password");
        } else if self.confirm_password != self.password {
            errors.add("confirmPassword", "Passwords do not match");
        }
        errors.into_result()
    }
}

/// CreatePostRequest
///
/// The image is uploaded first (`POST /dashboard/upload`); its URL is passed here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub url_tag: Option<String>,
    #[serde(default)]
    pub image_url: String,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        check_post_body(&mut errors, &self.title, &self.description, self.url_tag.as_deref());
        if self.image_url.trim().is_empty() {
            errors.add("imageUrl", "Please select an image for the post");
        }
        errors.into_result()
    }
}

/// UpdatePostRequest
///
/// Editing keeps the current image unless a new `imageUrl` is supplied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePostRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub url_tag: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UpdatePostRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        check_post_body(&mut errors, &self.title, &self.description, self.url_tag.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ProfileUpdateRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            errors.add("name", "Name must not be empty");
        }
        check_email(&mut errors, self.email.as_deref().unwrap_or_default());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.current_password.is_empty() {
            errors.add("currentPassword", "Current password is required");
        }
        check_new_password(&mut errors, "newPassword", &self.new_password);
        if self.new_password != self.confirm_password {
            errors.add("confirmPassword", "Passwords do not match");
        }
        errors.into_result()
    }
}

/// AddUserRequest
///
/// Administrator form for creating an account directly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AddUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl AddUserRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.add("name", "Name is required");
        }
        check_email(&mut errors, &self.email);
        check_new_password(&mut errors, "password", &self.password);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

// --- Page Schemas (Output) ---

/// LoginResponse
///
/// The stored session record plus the page the client should navigate to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub user: SessionRecord,
    pub redirect_to: String,
}

/// AuthorInfo
///
/// Display information for the author of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// PostView
///
/// A post joined with its author, as rendered by the post list and detail pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostView {
    pub post: Post,
    pub author: AuthorInfo,
    pub created: String,
}

/// Page
///
/// One page of a paginated listing. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadResponse {
    pub url: String,
}

/// DashboardView
///
/// The dashboard shell: who is signed in and which sidebar entries they see.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardView {
    pub user: SessionRecord,
    pub menu: Vec<NavEntry>,
}
