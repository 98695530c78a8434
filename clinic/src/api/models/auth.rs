//! Authentication request and response payloads.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    api::models::users::{Role, UserResponse},
    errors::Error,
};

/// Request to register a new user account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    /// Email address (must be unique)
    #[serde(default)]
    pub email: String,
    /// Password (will be hashed)
    #[serde(default)]
    pub password: String,
    /// Registering an admin requires an admin session
    pub role: Role,
}

/// Request to login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response after successful login or registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// Success message
    pub message: String,
    /// User information
    pub user: UserResponse,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

fn with_cookie<T: Serialize>(status: StatusCode, cookie: &str, body: T) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => (status, [(header::SET_COOKIE, value)], Json(body)).into_response(),
        Err(e) => Error::Internal {
            operation: format!("encode session cookie: {e}"),
        }
        .into_response(),
    }
}

/// Structured response for successful login
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, &self.cookie, self.auth_response)
    }
}

/// Structured response for successful logout
pub struct LogoutResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, &self.cookie, self.auth_response)
    }
}
