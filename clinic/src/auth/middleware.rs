//! Session resolution middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{current_user::session_cookie, session},
    config::Config,
};

/// Resolve the principal carried by the session cookie.
///
/// Returns `None` when the cookie is absent or its token fails verification. Verification
/// failures are expected for expired sessions, so they are not surfaced as errors.
pub fn resolve_session(headers: &axum::http::HeaderMap, config: &Config) -> Option<CurrentUser> {
    let token = session_cookie(headers, &config.auth.session.cookie_name)?;

    match session::verify_session_token(token, config) {
        Ok(user) => Some(user),
        Err(e) => {
            trace!("Ignoring invalid session token: {e}");
            None
        }
    }
}

/// Attach the resolved [`CurrentUser`] to the request extensions.
///
/// Never rejects: anonymous requests continue down the stack and each handler decides
/// through its extractor whether a principal is required.
pub async fn session_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(user) = resolve_session(request.headers(), &state.config) {
        debug!(user_id = %crate::types::abbrev_uuid(&user.id), role = %user.role, "Resolved session");
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}
