//! Extractors for the authenticated principal.
//!
//! [`super::middleware::session_middleware`] resolves the session cookie once per request and
//! stores the resulting [`CurrentUser`] in the request extensions. Handlers then choose how
//! strict to be:
//!
//! - `user: CurrentUser` rejects anonymous callers with 401
//! - `user: Option<CurrentUser>` accepts both

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use tracing::trace;

use crate::{api::models::users::CurrentUser, errors::Error};

/// Value of the named cookie, if the request carries one.
///
/// Headers that are not valid UTF-8 are treated as carrying no cookies.
pub fn session_cookie<'h>(headers: &'h HeaderMap, cookie_name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(user) => Ok(user.clone()),
            None => {
                trace!("No session principal on request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}
