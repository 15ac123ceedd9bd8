use crate::{
    AppState, account,
    auth::{AdminUser, SessionUser},
    error::AppError,
    guard::{filter_menu, nav_entries},
    helpers::{self, USERS_PER_PAGE},
    models::{
        self, AddUserRequest, AuthorInfo, ChangePasswordRequest, CreatePostRequest,
        DashboardView, LoginRequest, LoginResponse, NewPost, NewUser, Page, Post, PostPatch,
        PostStatus, PostView, ProfileUpdateRequest, RegisterRequest, UpdatePostRequest,
        UpdateRoleRequest, UpdateStatusRequest, UploadResponse, User, UserPatch,
    },
    session::SessionRecord,
    storage::ImageFile,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
};
use serde::Deserialize;
use std::collections::HashMap;

// --- Filter Structs ---

/// UserFilter
///
/// Query parameters of the user management listing (GET /dashboard/users).
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// Case-insensitive match against name or email.
    pub search: Option<String>,
    /// 1-based page number; defaults to the first page.
    pub page: Option<usize>,
}

// --- Shared Helpers ---

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Display info for a post author. With a `fallback` viewer, each empty
/// author field is taken from the viewer instead.
fn author_info(author: Option<&User>, fallback: Option<&SessionRecord>) -> AuthorInfo {
    let name = non_empty(author.map(|a| a.name.as_str()))
        .or_else(|| non_empty(fallback.map(|v| v.name.as_str())))
        .unwrap_or_else(|| "Unknown".to_string());
    let email = non_empty(author.map(|a| a.email.as_str()))
        .or_else(|| non_empty(fallback.map(|v| v.email.as_str())))
        .unwrap_or_else(|| match fallback {
            Some(_) => "Content Creator".to_string(),
            None => String::new(),
        });
    let avatar = non_empty(author.and_then(|a| a.avatar.as_deref()))
        .or_else(|| non_empty(fallback.and_then(|v| v.avatar.as_deref())))
        .unwrap_or_else(|| helpers::generated_avatar(&name));
    AuthorInfo { name, email, avatar }
}

fn post_view(
    post: Post,
    authors: &HashMap<&str, &User>,
    fallback: Option<&SessionRecord>,
) -> PostView {
    let author = author_info(authors.get(post.user_id.as_str()).copied(), fallback);
    let created = post
        .create_date
        .as_ref()
        .map(helpers::format_date)
        .unwrap_or_default();
    PostView { post, author, created }
}

/// Newest first; posts without a readable date go last.
fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by_key(|p| {
        std::cmp::Reverse(p.create_date.as_ref().and_then(models::Timestamp::to_datetime))
    });
}

async fn owned_post(state: &AppState, user: &SessionRecord, id: &str) -> Result<Post, AppError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
    if post.user_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden("only the author can change this post".to_string()));
    }
    Ok(post)
}

/// Only posts still awaiting review can be approved or rejected.
async fn pending_post(state: &AppState, id: &str) -> Result<Post, AppError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
    if post.status != PostStatus::Pending {
        return Err(AppError::Conflict(format!("post {id} is not pending")));
    }
    Ok(post)
}

// --- Public Handlers ---

/// login
///
/// [Public Route] Signs in with email and password. On success the session slot
/// holds the user and the response names the role's landing page.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Credential mismatch"),
        (status = 403, description = "Account locked")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (user, landing) = account::login(state.repo.as_ref(), state.session.as_ref(), &payload).await?;
    Ok(Json(LoginResponse {
        user,
        redirect_to: landing.to_string(),
    }))
}

/// register
///
/// [Public Route] Creates a `user` account and signs it in.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = LoginResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let user = account::register(state.repo.as_ref(), state.session.as_ref(), &payload).await?;
    let redirect_to = user.role.landing_path().to_string();
    Ok((StatusCode::CREATED, Json(LoginResponse { user, redirect_to })))
}

/// logout
///
/// [Public Route] Clears the session and sends the client to the login page.
/// Safe to call without a session.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Redirect to /login"))
)]
pub async fn logout(State(state): State<AppState>) -> Redirect {
    Redirect::to(account::logout(state.session.as_ref()))
}

// --- Authenticated Handlers ---

/// dashboard
///
/// [Authenticated Route] The dashboard shell: signed-in user plus the sidebar
/// entries their role may see.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard", body = DashboardView))
)]
pub async fn dashboard(SessionUser(user): SessionUser) -> Json<DashboardView> {
    let menu = filter_menu(&nav_entries(), Some(&user));
    Json(DashboardView { user, menu })
}

/// my_posts
///
/// [Authenticated Route] Posts authored by the signed-in user, newest first.
#[utoipa::path(
    get,
    path = "/dashboard/posts",
    responses((status = 200, description = "My posts", body = [PostView]))
)]
pub async fn my_posts(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let (posts, users) = tokio::try_join!(state.repo.list_posts(), state.repo.list_users())?;
    let authors: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();

    let mut mine: Vec<Post> = posts.into_iter().filter(|p| p.user_id == user.id).collect();
    sort_newest_first(&mut mine);

    Ok(Json(
        mine.into_iter()
            .map(|p| post_view(p, &authors, Some(&user)))
            .collect(),
    ))
}

/// post_detail
///
/// [Authenticated Route] One post with its author.
#[utoipa::path(
    get,
    path = "/dashboard/posts/{id}",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn post_detail(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostView>, AppError> {
    let post = state
        .repo
        .get_post(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
    let author = state.repo.get_user(&post.user_id).await?;

    let authors: HashMap<&str, &User> =
        author.iter().map(|a| (a.id.as_str(), a)).collect();
    Ok(Json(post_view(post, &authors, Some(&user))))
}

/// create_post
///
/// [Authenticated Route] Submits a post for approval. The slug is derived from
/// the supplied URL tag, or from the title when none is given.
#[utoipa::path(
    post,
    path = "/dashboard/create-post",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_post(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    payload.validate()?;

    let slug_source = payload
        .url_tag
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(&payload.title);
    let post = state
        .repo
        .create_post(NewPost {
            user_id: user.id.clone(),
            title: payload.title.trim().to_string(),
            description: payload.description.trim().to_string(),
            image_url: payload.image_url.clone(),
            url_tag: helpers::slugify(slug_source),
            status: PostStatus::Pending,
        })
        .await?;

    tracing::info!(post_id = %post.id, user_id = %user.id, "Post submitted for approval");
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Edits a post. Only the author or an administrator may
/// do so; the moderation status is left unchanged.
#[utoipa::path(
    put,
    path = "/dashboard/edit-post/{id}",
    params(("id" = String, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    payload.validate()?;
    owned_post(&state, &user, &id).await?;

    let slug_source = payload
        .url_tag
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(&payload.title);
    let patch = PostPatch {
        title: Some(payload.title.trim().to_string()),
        description: Some(payload.description.trim().to_string()),
        image_url: payload.image_url.clone().filter(|u| !u.is_empty()),
        url_tag: Some(helpers::slugify(slug_source)),
        status: None,
    };

    match state.repo.update_post(&id, patch).await? {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::NotFound(format!("post {id}"))),
    }
}

/// delete_post
///
/// [Authenticated Route] Removes a post. Author or administrator only.
#[utoipa::path(
    delete,
    path = "/dashboard/posts/{id}",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    owned_post(&state, &user, &id).await?;
    if state.repo.delete_post(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("post {id}")))
    }
}

/// get_profile
///
/// [Authenticated Route] The signed-in user's account as stored in the backend.
#[utoipa::path(
    get,
    path = "/dashboard/profile",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_profile(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    match state.repo.get_user(&user.id).await? {
        Some(found) => Ok(Json(found.redacted())),
        None => Err(AppError::NotFound("account".to_string())),
    }
}

/// update_profile
///
/// [Authenticated Route] Saves name, email and avatar, and refreshes the session.
#[utoipa::path(
    put,
    path = "/dashboard/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated session record", body = SessionRecord),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_profile(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<SessionRecord>, AppError> {
    let record =
        account::update_profile(state.repo.as_ref(), state.session.as_ref(), &user, &payload)
            .await?;
    Ok(Json(record))
}

/// change_password
///
/// [Authenticated Route] Replaces the password after checking the current one.
#[utoipa::path(
    put,
    path = "/dashboard/profile/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Changed"),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn change_password(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    account::change_password(state.repo.as_ref(), &user, &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// upload_image
///
/// [Authenticated Route] Accepts a multipart `file` field and forwards it to the
/// image host. Returns the hosted URL for use as a post image or avatar.
#[utoipa::path(
    post,
    path = "/dashboard/upload",
    responses(
        (status = 200, description = "Uploaded", body = UploadResponse),
        (status = 400, description = "Not an image or too large")
    )
)]
pub async fn upload_image(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let url = state
            .storage
            .upload_image(ImageFile {
                filename,
                content_type,
                bytes: bytes.to_vec(),
            })
            .await?;
        tracing::info!(user_id = %user.id, %url, "Image uploaded");
        return Ok(Json(UploadResponse { url }));
    }

    Err(AppError::BadRequest("missing `file` field".to_string()))
}

// --- Admin Handlers ---

/// list_users
///
/// [Admin Route] Users matching the search, ten per page.
#[utoipa::path(
    get,
    path = "/dashboard/users",
    params(UserFilter),
    responses((status = 200, description = "One page of users", body = Page<User>))
)]
pub async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Page<User>>, AppError> {
    let query = filter.search.unwrap_or_default();
    let matching: Vec<User> = state
        .repo
        .list_users()
        .await?
        .into_iter()
        .filter(|u| helpers::matches_search(&query, &[&u.name, &u.email]))
        .map(User::redacted)
        .collect();

    Ok(Json(helpers::paginate(
        matching,
        filter.page.unwrap_or(1),
        USERS_PER_PAGE,
    )))
}

/// add_user
///
/// [Admin Route] Creates an account with an explicit role.
#[utoipa::path(
    post,
    path = "/dashboard/users",
    request_body = AddUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn add_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    payload.validate()?;

    let users = state.repo.list_users().await?;
    if users.iter().any(|u| u.email == payload.email) {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let created = state
        .repo
        .create_user(NewUser {
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            password: payload.password,
            role: payload.role,
            avatar: None,
            is_active: true,
        })
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %created.id, "User added");
    Ok((StatusCode::CREATED, Json(created.redacted())))
}

async fn patch_user(state: &AppState, id: &str, patch: UserPatch) -> Result<Json<User>, AppError> {
    match state.repo.update_user(id, patch).await? {
        Some(user) => Ok(Json(user.redacted())),
        None => Err(AppError::NotFound(format!("user {id}"))),
    }
}

/// update_user_role
///
/// [Admin Route] Changes an account's role.
#[utoipa::path(
    put,
    path = "/dashboard/users/{id}/role",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_user_role(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<User>, AppError> {
    tracing::info!(admin_id = %admin.id, user_id = %id, role = %payload.role, "Changing role");
    let patch = UserPatch {
        role: Some(payload.role),
        ..UserPatch::default()
    };
    patch_user(&state, &id, patch).await
}

/// update_user_status
///
/// [Admin Route] Locks (`isActive = false`) or unlocks an account.
#[utoipa::path(
    put,
    path = "/dashboard/users/{id}/status",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateStatusRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_user_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<User>, AppError> {
    tracing::info!(
        admin_id = %admin.id,
        user_id = %id,
        active = payload.is_active,
        "Changing account status"
    );
    let patch = UserPatch {
        is_active: Some(payload.is_active),
        ..UserPatch::default()
    };
    patch_user(&state, &id, patch).await
}

/// delete_user
///
/// [Admin Route] Removes an account.
#[utoipa::path(
    delete,
    path = "/dashboard/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_user(&id).await? {
        tracing::info!(admin_id = %admin.id, user_id = %id, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("user {id}")))
    }
}

/// pending_posts
///
/// [Admin Route] The approval queue: every post still `pending`, newest first.
#[utoipa::path(
    get,
    path = "/dashboard/post-approval",
    responses((status = 200, description = "Pending posts", body = [PostView]))
)]
pub async fn pending_posts(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let (posts, users) = tokio::try_join!(state.repo.list_posts(), state.repo.list_users())?;
    let authors: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();

    let mut pending: Vec<Post> = posts
        .into_iter()
        .filter(|p| p.status == PostStatus::Pending)
        .collect();
    sort_newest_first(&mut pending);

    Ok(Json(
        pending
            .into_iter()
            .map(|p| post_view(p, &authors, None))
            .collect(),
    ))
}

/// approve_post
///
/// [Admin Route] Publishes a pending post.
#[utoipa::path(
    post,
    path = "/dashboard/post-approval/{id}/approve",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Published", body = Post),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Post is not pending")
    )
)]
pub async fn approve_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    pending_post(&state, &id).await?;
    let patch = PostPatch {
        status: Some(PostStatus::Published),
        ..PostPatch::default()
    };
    match state.repo.update_post(&id, patch).await? {
        Some(post) => {
            tracing::info!(admin_id = %admin.id, post_id = %id, "Post approved");
            Ok(Json(post))
        }
        None => Err(AppError::NotFound(format!("post {id}"))),
    }
}

/// reject_post
///
/// [Admin Route] Rejects a pending post by deleting it.
#[utoipa::path(
    delete,
    path = "/dashboard/post-approval/{id}",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Rejected and removed"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Post is not pending")
    )
)]
pub async fn reject_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    pending_post(&state, &id).await?;
    if state.repo.delete_post(&id).await? {
        tracing::info!(admin_id = %admin.id, post_id = %id, "Post rejected");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("post {id}")))
    }
}
