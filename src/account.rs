//! Sign-in, registration and profile flows.
//!
//! These functions are the only writers of the session slot: a record is
//! created by [`login`] or [`register`], overwritten by [`update_profile`] and
//! removed by [`logout`].

use crate::{
    guard::LOGIN_PATH,
    models::{
        ChangePasswordRequest, FieldErrors, LoginRequest, NewUser, ProfileUpdateRequest,
        RegisterRequest, Role, User, UserPatch,
    },
    repository::{Repository, RepositoryError},
    session::{SessionRecord, SessionStore},
};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Email or password is incorrect")]
    CredentialMismatch,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("This account has been locked")]
    AccountLocked,

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("Account no longer exists")]
    UnknownUser,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<FieldErrors> for AccountError {
    fn from(errors: FieldErrors) -> Self {
        AccountError::Validation(errors)
    }
}

/// login
///
/// Looks for a user whose email and password both match and stores it as the
/// session. Returns the stored record and the role's landing page.
pub async fn login(
    repo: &dyn Repository,
    session: &dyn SessionStore,
    req: &LoginRequest,
) -> Result<(SessionRecord, &'static str), AccountError> {
    req.validate()?;

    let users = repo.list_users().await?;
    let user = users
        .iter()
        .find(|u| u.email == req.email && u.password.as_deref() == Some(req.password.as_str()))
        .ok_or_else(|| {
            tracing::info!(email = %req.email, "Login rejected: credential mismatch");
            AccountError::CredentialMismatch
        })?;

    if !user.is_active() {
        tracing::info!(user_id = %user.id, "Login rejected: account locked");
        return Err(AccountError::AccountLocked);
    }

    let record = SessionRecord::from(user);
    session.set(&record);
    tracing::info!(user_id = %record.id, role = %record.role, "User signed in");

    let landing = record.role.landing_path();
    Ok((record, landing))
}

/// register
///
/// Creates a `user` account when no existing account shares the email, then
/// signs it in.
pub async fn register(
    repo: &dyn Repository,
    session: &dyn SessionStore,
    req: &RegisterRequest,
) -> Result<SessionRecord, AccountError> {
    req.validate()?;

    let users = repo.list_users().await?;
    if users.iter().any(|u| u.email == req.email) {
        tracing::info!(email = %req.email, "Registration rejected: duplicate email");
        return Err(AccountError::DuplicateEmail);
    }

    let created = repo
        .create_user(NewUser {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            password: req.password.clone(),
            role: Role::User,
            avatar: None,
            is_active: true,
        })
        .await?;

    let record = SessionRecord::from(&created);
    session.set(&record);
    tracing::info!(user_id = %record.id, "User registered");

    Ok(record)
}

/// logout
///
/// Clears the session slot and returns the page to navigate to.
pub fn logout(session: &dyn SessionStore) -> &'static str {
    if let Some(record) = session.get() {
        tracing::info!(user_id = %record.id, "User signed out");
    }
    session.clear();
    LOGIN_PATH
}

/// update_profile
///
/// Saves name, email and avatar for the signed-in user and overwrites the
/// session record with the merged values.
pub async fn update_profile(
    repo: &dyn Repository,
    session: &dyn SessionStore,
    current: &SessionRecord,
    req: &ProfileUpdateRequest,
) -> Result<SessionRecord, AccountError> {
    req.validate()?;

    let patch = UserPatch {
        name: req.name.clone(),
        email: req.email.clone(),
        avatar: req.avatar.clone().filter(|a| !a.is_empty()),
        ..UserPatch::default()
    };
    let saved = repo
        .update_user(&current.id, patch)
        .await?
        .ok_or(AccountError::UnknownUser)?;

    let record = SessionRecord {
        name: saved.name.clone(),
        email: saved.email.clone(),
        avatar: saved.avatar.clone().or_else(|| current.avatar.clone()),
        ..current.clone()
    };
    session.set(&record);
    tracing::info!(user_id = %record.id, "Profile updated");

    Ok(record)
}

/// change_password
///
/// Verifies the current password against the stored account before saving the
/// new one. The session record does not carry the password and is left as is.
pub async fn change_password(
    repo: &dyn Repository,
    current: &SessionRecord,
    req: &ChangePasswordRequest,
) -> Result<(), AccountError> {
    req.validate()?;

    let user: User = repo
        .get_user(&current.id)
        .await?
        .ok_or(AccountError::UnknownUser)?;
    if user.password.as_deref() != Some(req.current_password.as_str()) {
        return Err(AccountError::WrongCurrentPassword);
    }

    let patch = UserPatch {
        password: Some(req.new_password.clone()),
        ..UserPatch::default()
    };
    repo.update_user(&current.id, patch)
        .await?
        .ok_or(AccountError::UnknownUser)?;
    tracing::info!(user_id = %current.id, "Password changed");

    Ok(())
}
