//! Authentication and authorization.
//!
//! Sessions are stateless: `/api/auth/login` verifies the password against the stored
//! Argon2id hash and sets a signed JWT in an HTTP-only cookie. Every request then passes
//! through [`middleware::session_middleware`], which verifies the cookie and attaches the
//! resulting [`crate::api::models::users::CurrentUser`] to the request. Invalid or missing
//! cookies leave the request anonymous.
//!
//! Authorization is role based. [`permissions`] holds the capability table; ownership of
//! patient and doctor records is checked by [`crate::records`].
//!
//! ```ignore
//! use clinic::api::models::users::CurrentUser;
//!
//! async fn protected_handler(user: CurrentUser) -> String {
//!     format!("Hello, {}!", user.email)
//! }
//! ```

pub mod current_user;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod session;
