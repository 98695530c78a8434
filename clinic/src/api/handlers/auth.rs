use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};

use crate::{
    AppState,
    api::models::{
        auth::{AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest},
        users::{CurrentUser, Role, UserResponse},
    },
    auth::{
        current_user::session_cookie,
        password::{self, Argon2Params},
        permissions, session,
    },
    config::{Config, SessionConfig},
    db::{errors::DbError, handlers::Repository, handlers::Users, models::users::UserCreateDBRequest},
    errors::Error,
    records::{self, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, require_max_length, require_non_blank},
    types::{JsonBody, Operation, Resource},
};

/// Register a new user account
///
/// Patients and doctors registered here get an account only. Their clinical record is
/// created by an admin through `/api/patients` or `/api/doctors`.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or registration disabled", body = crate::errors::ErrorBody),
        (status = 401, description = "Admin registration without a session", body = crate::errors::ErrorBody),
        (status = 403, description = "Admin registration by a non-admin", body = crate::errors::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    require_non_blank("name", &request.name)?;
    require_non_blank("email", &request.email)?;
    require_non_blank("password", &request.password)?;
    require_max_length("name", &request.name, MAX_NAME_LENGTH)?;
    require_max_length("email", &request.email, MAX_EMAIL_LENGTH)?;

    let password_config = &state.config.auth.password;
    let length = request.password.chars().count();
    if length < password_config.min_length {
        return Err(Error::Validation {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if length > password_config.max_length {
        return Err(Error::Validation {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    if request.role == Role::Admin {
        let principal = current_user.ok_or(Error::Unauthenticated {
            message: Some("Registering an admin requires an admin session".to_string()),
        })?;
        permissions::require(&principal, Resource::Users, Operation::Create)?;
    }

    let email = request.email.trim().to_string();
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    if Users::new(&mut conn).get_user_by_email(&email).await?.is_some() {
        return Err(records::email_conflict());
    }

    let password_hash = password::hash_password(request.password, Argon2Params::from(password_config)).await?;
    let created_user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            name: request.name.trim().to_string(),
            email,
            password_hash,
            role: request.role,
        })
        .await
        .map_err(records::conflict_on_duplicate_email)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user: UserResponse::from(created_user),
        }),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful, session cookie set", body = AuthResponse),
        (status = 401, description = "Wrong password", body = crate::errors::ErrorBody),
        (status = 404, description = "Unknown email", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, JsonBody(request): JsonBody<LoginRequest>) -> Result<LoginResponse, Error> {
    require_non_blank("email", &request.email)?;
    require_non_blank("password", &request.password)?;

    let email = request.email.trim();
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn)
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: email.to_string(),
        })?;

    if !password::verify_password(request.password, user.password_hash.clone()).await? {
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    let user_response = UserResponse::from(user);
    let current_user = CurrentUser {
        id: user_response.id,
        email: user_response.email.clone(),
        role: user_response.role,
    };
    let token = session::create_session_token(&current_user, &state.config)?;

    Ok(LoginResponse {
        auth_response: AuthResponse {
            message: "Login successful".to_string(),
            user: user_response,
        },
        cookie: create_session_cookie(&token, &state.config),
    })
}

/// Logout (clear session cookie)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
        (status = 400, description = "No session cookie on the request", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<LogoutResponse, Error> {
    let session_config = &state.config.auth.session;
    if session_cookie(&headers, &session_config.cookie_name).is_none() {
        return Err(Error::BadRequest {
            message: "No active session".to_string(),
        });
    }

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: cookie_string(session_config, "", 0),
    })
}

/// The principal behind the current session
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current principal", body = CurrentUser),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(current_user: CurrentUser) -> Json<CurrentUser> {
    Json(current_user)
}

fn same_site_attribute(value: &str) -> &'static str {
    match value.to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "lax" => "Lax",
        _ => "None",
    }
}

fn cookie_string(session_config: &SessionConfig, value: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite={}",
        session_config.cookie_name,
        value,
        max_age,
        same_site_attribute(&session_config.cookie_same_site)
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    if session_config.cookie_http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

/// `Set-Cookie` value carrying a session token for the configured lifetime
pub fn create_session_cookie(token: &str, config: &Config) -> String {
    let session_config = &config.auth.session;
    cookie_string(session_config, token, session_config.timeout.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_PASSWORD, create_test_app, create_test_config, create_test_user, session_cookie_for};
    use axum::http::header;
    use serde_json::json;
    use sqlx::PgPool;

    #[test]
    fn test_session_cookie_attributes() {
        let mut config = create_test_config();
        config.auth.session.cookie_secure = true;
        config.auth.session.cookie_same_site = "none".to_string();

        let cookie = create_session_cookie("abc", &config);
        assert!(cookie.starts_with("uid=abc; "));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("; Secure"));
        assert!(cookie.contains("; HttpOnly"));

        config.auth.session.cookie_http_only = false;
        config.auth.session.cookie_secure = false;
        config.auth.session.cookie_same_site = "lax".to_string();
        let cookie = create_session_cookie("abc", &config);
        assert!(!cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_and_login(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "name": "New Patient",
                "email": "new@example.com",
                "password": "password123",
                "role": "patient"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: AuthResponse = response.json();
        assert_eq!(body.user.email, "new@example.com");
        assert_eq!(body.user.role, Role::Patient);
        assert!(response.text().find("password").is_none());

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "new@example.com", "password": "password123" }))
            .await;
        response.assert_status_ok();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("uid="));

        let token = cookie.split(';').next().unwrap().to_string();
        let me = server.get("/api/auth/me").add_header(header::COOKIE, token).await;
        me.assert_status_ok();
        assert_eq!(me.json::<CurrentUser>().email, "new@example.com");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_validation(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let blank = server
            .post("/api/auth/register")
            .json(&json!({ "name": " ", "email": "a@example.com", "password": "password123", "role": "doctor" }))
            .await;
        blank.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(blank.json::<serde_json::Value>()["error"], "validation_error");

        let short = server
            .post("/api/auth/register")
            .json(&json!({ "name": "A", "email": "a@example.com", "password": "short", "role": "doctor" }))
            .await;
        short.assert_status(StatusCode::BAD_REQUEST);

        let long_name = server
            .post("/api/auth/register")
            .json(&json!({ "name": "A".repeat(101), "email": "a@example.com", "password": "password123", "role": "doctor" }))
            .await;
        long_name.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(long_name.json::<serde_json::Value>()["error"], "validation_error");

        let unknown_role = server
            .post("/api/auth/register")
            .json(&json!({ "name": "A", "email": "a@example.com", "password": "password123", "role": "nurse" }))
            .await;
        unknown_role.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(unknown_role.json::<serde_json::Value>()["error"], "validation_error");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_duplicate_email_is_conflict(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let existing = create_test_user(&pool, Role::Doctor).await;

        let response = server
            .post("/api/auth/register")
            .json(&json!({ "name": "Other", "email": existing.email, "password": "password123", "role": "patient" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<serde_json::Value>()["error"], "conflict");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_registration_yields_one_account(pool: PgPool) {
        let state = crate::test_utils::create_test_state(pool.clone());
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let state = state.clone();
            tasks.spawn(async move {
                register(
                    State(state),
                    None,
                    JsonBody(RegisterRequest {
                        name: format!("Racer {i}"),
                        email: "race@example.com".to_string(),
                        password: "password123".to_string(),
                        role: Role::Patient,
                    }),
                )
                .await
            });
        }

        let mut created = 0;
        let mut conflicts = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(_) => created += 1,
                Err(Error::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);

        let mut conn = pool.acquire().await.unwrap();
        assert!(Users::new(&mut conn).get_user_by_email("race@example.com").await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_registration_requires_admin(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let body = json!({ "name": "Root", "email": "root@example.com", "password": "password123", "role": "admin" });

        let anonymous = server.post("/api/auth/register").json(&body).await;
        anonymous.assert_status(StatusCode::UNAUTHORIZED);

        let doctor = CurrentUser::from(create_test_user(&pool, Role::Doctor).await);
        let forbidden = server
            .post("/api/auth/register")
            .add_header(header::COOKIE, session_cookie_for(&doctor, &state.config))
            .json(&body)
            .await;
        forbidden.assert_status(StatusCode::FORBIDDEN);

        let admin = CurrentUser::from(create_test_user(&pool, Role::Admin).await);
        let created = server
            .post("/api/auth/register")
            .add_header(header::COOKIE, session_cookie_for(&admin, &state.config))
            .json(&body)
            .await;
        created.assert_status(StatusCode::CREATED);
        assert_eq!(created.json::<AuthResponse>().user.role, Role::Admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_registration_disabled(pool: PgPool) {
        let (server, _) = crate::test_utils::create_test_app_with(pool, |config| config.auth.allow_registration = false).await;

        let response = server
            .post("/api/auth/register")
            .json(&json!({ "name": "A", "email": "a@example.com", "password": "password123", "role": "patient" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["error"], "bad_request");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_unknown_email_and_wrong_password(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::Patient).await;

        let unknown = server
            .post("/api/auth/login")
            .json(&json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }))
            .await;
        unknown.assert_status(StatusCode::NOT_FOUND);
        assert!(unknown.headers().get(header::SET_COOKIE).is_none());

        let wrong = server
            .post("/api/auth/login")
            .json(&json!({ "email": user.email, "password": "not-the-password" }))
            .await;
        wrong.assert_status(StatusCode::UNAUTHORIZED);
        assert!(wrong.headers().get(header::SET_COOKIE).is_none());

        let right = server
            .post("/api/auth/login")
            .json(&json!({ "email": user.email, "password": TEST_PASSWORD }))
            .await;
        right.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_logout(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;

        let without_cookie = server.post("/api/auth/logout").await;
        without_cookie.assert_status(StatusCode::BAD_REQUEST);

        let user = CurrentUser::from(create_test_user(&pool, Role::Patient).await);
        let response = server
            .post("/api/auth/logout")
            .add_header(header::COOKIE, session_cookie_for(&user, &state.config))
            .await;
        response.assert_status_ok();

        let cleared = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cleared.starts_with("uid=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_me_requires_session(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server.get("/api/auth/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<serde_json::Value>()["error"], "unauthorized");
    }
}
