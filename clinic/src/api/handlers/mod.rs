//! HTTP request handlers for all API endpoints.
//!
//! Handlers are thin: they extract the principal and payload, delegate to the record
//! services in [`crate::records`], and wrap the result in a `{message, ...}` envelope.
//!
//! # Handler Modules
//!
//! - [`auth`]: registration, login, logout and the current principal
//! - [`patients`]: patient registration and self-service CRUD
//! - [`doctors`]: doctor registration and self-service CRUD
//! - [`mappings`]: assigning doctors to patients
//!
//! # Authentication
//!
//! The session cookie is resolved once per request by
//! [`crate::auth::middleware::session_middleware`]. Handlers that need a principal take a
//! [`crate::api::models::users::CurrentUser`] argument, which rejects anonymous requests.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which renders as a JSON `{message, error}` body
//! with the matching status code.

pub mod auth;
pub mod doctors;
pub mod mappings;
pub mod patients;
