use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    guard::{Decision, RequiredRoles, authorize},
    session::{SessionRecord, SessionState},
};

/// GuardRedirect
///
/// Rejection produced when the route guard refuses a navigation. Rendered as a
/// `303 See Other` pointing at the guard's target page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardRedirect(pub &'static str);

impl IntoResponse for GuardRedirect {
    fn into_response(self) -> Response {
        Redirect::to(self.0).into_response()
    }
}

/// Runs the guard against the injected session slot.
fn check(session: &SessionState, required: Option<&RequiredRoles>) -> Result<SessionRecord, GuardRedirect> {
    let record = session.get();
    match authorize(record.as_ref(), required) {
        Decision::Allow => record.ok_or(GuardRedirect(crate::guard::LOGIN_PATH)),
        Decision::Redirect(to) => Err(GuardRedirect(to)),
    }
}

/// SessionUser Extractor Result
///
/// The signed-in user of the current request, read from the session slot held
/// in application state. Handlers behind the guard take this as an argument.
#[derive(Debug, Clone)]
pub struct SessionUser(pub SessionRecord);

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = GuardRedirect;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionState::from_ref(state);
        check(&session, None).map(SessionUser)
    }
}

/// AdminUser Extractor Result
///
/// Like [`SessionUser`], but only resolves for the `admin` role. Other roles are
/// sent to the default dashboard area.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionRecord);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = GuardRedirect;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionState::from_ref(state);
        check(&session, Some(&RequiredRoles::admin_only())).map(AdminUser)
    }
}

/// require_session
///
/// Route-layer middleware for the authenticated page group: any signed-in user
/// passes, everyone else is redirected to the login page.
pub async fn require_session(
    State(session): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&session, None, request, next).await
}

/// require_admin
///
/// Route-layer middleware for the administration page group.
pub async fn require_admin(
    State(session): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&session, Some(&RequiredRoles::admin_only()), request, next).await
}

async fn enforce(
    session: &SessionState,
    required: Option<&RequiredRoles>,
    request: Request,
    next: Next,
) -> Response {
    match check(session, required) {
        Ok(_) => next.run(request).await,
        Err(redirect) => {
            tracing::debug!(
                path = %request.uri().path(),
                redirect_to = redirect.0,
                "Navigation refused by route guard"
            );
            redirect.into_response()
        }
    }
}
