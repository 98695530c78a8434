//! Shared fixtures for database-backed and HTTP-level tests.

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    auth::{password::Argon2Params, session},
    config::{Config, PasswordConfig, PoolSettings},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
};
use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

/// Plain-text password of every account made by [`create_test_user`]
pub const TEST_PASSWORD: &str = "test-password";

/// Argon2 parameters cheap enough to keep tests fast
pub fn fast_hashing() -> Argon2Params {
    Argon2Params {
        memory_kib: 128,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };

    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 128,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config.auth.session.cookie_secure = false;
    config
}

pub fn create_test_state(pool: PgPool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

/// Insert a bare user account with the given role. No patient or doctor row is created.
pub async fn create_test_user(pool: &PgPool, role: Role) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let password_hash = crate::auth::password::hash_string_with_params(TEST_PASSWORD, Some(fast_hashing()))
        .expect("Failed to hash test password");
    let suffix = Uuid::new_v4().simple().to_string();

    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            name: format!("Test {role} {}", &suffix[..8]),
            email: format!("{role}-{suffix}@example.com"),
            password_hash,
            role,
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_admin(pool: &PgPool) -> CurrentUser {
    CurrentUser::from(create_test_user(pool, Role::Admin).await)
}

/// `Cookie` header value carrying a freshly signed session for `user`
pub fn session_cookie_for(user: &CurrentUser, config: &Config) -> String {
    let token = session::create_session_token(user, config).expect("Failed to sign test session");
    format!("{}={}", config.auth.session.cookie_name, token)
}

pub async fn create_test_app(pool: PgPool) -> (TestServer, AppState) {
    create_test_app_with(pool, |_| {}).await
}

/// Like [`create_test_app`], with a hook to adjust the configuration first
pub async fn create_test_app_with(pool: PgPool, configure: impl FnOnce(&mut Config)) -> (TestServer, AppState) {
    let mut config = create_test_config();
    configure(&mut config);

    let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
    let app = crate::Application::new_with_pool(config, pool).expect("Failed to create application");

    (app.into_test_server(), state)
}
