//! # clinic: access-controlled clinic records
//!
//! `clinic` is an HTTP service that keeps the records of a small clinic: login accounts,
//! patients, doctors, and which doctors are assigned to which patients. Every record is
//! guarded by a fixed set of roles (admin, doctor, patient) and a declarative capability
//! table.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for persistence.
//!
//! A request first passes through the session middleware, which reads the session cookie,
//! verifies the signed token inside it, and attaches the resulting
//! [`api::models::users::CurrentUser`] to the request. Invalid or expired tokens leave the
//! request anonymous. Handlers then hand the principal to the record services in
//! [`records`], which consult [`auth::permissions`] before touching the database through the
//! repositories in [`db::handlers`].
//!
//! Patients and doctors are both "dependents" of a user account: one row per account, created
//! and deleted together with it in a single transaction. They share one generic repository
//! and one generic service, parameterized by a [`db::handlers::DependentKind`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use clinic::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = clinic::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     clinic::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod records;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::models::users::Role,
    auth::{
        middleware::session_middleware,
        password::{self, Argon2Params},
    },
    config::CorsOrigin,
    db::{
        errors::DbError,
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    openapi::ApiDoc,
};
use axum::{
    Router,
    http::{self, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{Executor, PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{DoctorId, MappingId, PatientId, UserId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the clinic database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing account with this email keeps its id and, when a password is
/// given, gets its hash refreshed. Without a password no account can be created, since every
/// account must be able to log in; in that case `Ok(None)` is returned.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(
    email: &str,
    admin_password: Option<&str>,
    params: Argon2Params,
    db: &PgPool,
) -> errors::Result<Option<UserId>> {
    let password_hash = match admin_password {
        Some(pwd) => Some(password::hash_password(pwd.to_string(), params).await?),
        None => None,
    };

    let mut tx = db.begin().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        if let Some(password_hash) = password_hash {
            user_repo.set_password_hash(existing_user.id, &password_hash).await?;
        }
        if existing_user.role != Role::Admin {
            warn!("Configured admin email belongs to a {} account", existing_user.role);
        }
        tx.commit().await.map_err(DbError::from)?;
        return Ok(Some(existing_user.id));
    }

    let Some(password_hash) = password_hash else {
        warn!("No admin_password configured and no admin account exists; skipping admin bootstrap");
        return Ok(None);
    };

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            name: "Administrator".to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await?;

    tx.commit().await.map_err(DbError::from)?;
    info!("Created initial admin user");
    Ok(Some(created_user.id))
}

/// Connect the pool, run migrations, and bootstrap the admin account
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url()
        .ok_or_else(|| anyhow::anyhow!("No database configured. Set DATABASE_URL or database.url in the config file."))?;

    let pool_settings = &config.database.pool;
    let statement_timeout_ms = pool_settings.statement_timeout_ms;
    let pool = PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(Duration::from_secs(pool_settings.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(pool_settings.idle_timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET statement_timeout = {statement_timeout_ms}").as_str())
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    migrator().run(&pool).await?;

    create_initial_admin_user(
        &config.admin_email,
        config.admin_password.as_deref(),
        Argon2Params::from(&config.auth.password),
        &pool,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    // Credentialed requests cannot use `Any` for methods or headers
    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE, http::header::ACCEPT, http::header::COOKIE])
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Routes live under `/api`, plus `/healthz` and the API reference at `/api/docs`. Session
/// resolution, CORS and request tracing wrap every route.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{auth, doctors, mappings, patients};

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    let record_routes = Router::new()
        .route("/patients", post(patients::create_patient).get(patients::list_patients))
        .route(
            "/patients/{id}",
            get(patients::get_patient)
                .post(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route("/doctors", post(doctors::create_doctor).get(doctors::list_doctors))
        .route(
            "/doctors/{id}",
            get(doctors::get_doctor).post(doctors::update_doctor).delete(doctors::delete_doctor),
        )
        .route("/mappings", post(mappings::assign_doctor).get(mappings::list_mappings))
        .route(
            "/mappings/{id}",
            get(mappings::get_patient_doctors).delete(mappings::unassign_doctor),
        );

    let api_routes = auth_routes
        .merge(record_routes)
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .layer(create_cors_layer(&state.config)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and
///    bootstraps the admin account
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, drains requests and closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool)
    }

    /// Build the application around an existing, already migrated pool
    pub fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        debug!(bind_address = %config.bind_address(), "Building application");

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Clinic listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_user, fast_hashing};
    use sqlx::ConnectOptions;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_new_user(pool: PgPool) {
        let email = "new-admin@example.com";

        let user_id = create_initial_admin_user(email, Some("admin-password"), fast_hashing(), &pool)
            .await
            .expect("Should create admin user successfully")
            .expect("Admin should have been created");

        let mut conn = pool.acquire().await.unwrap();
        let created = Users::new(&mut conn).get_user_by_email(email).await.unwrap().unwrap();
        assert_eq!(created.id, user_id);
        assert_eq!(created.role, Role::Admin);
        assert!(password::verify_string("admin-password", &created.password_hash).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_is_idempotent(pool: PgPool) {
        let existing = create_test_user(&pool, Role::Admin).await;

        let returned = create_initial_admin_user(&existing.email, Some("rotated-password"), fast_hashing(), &pool)
            .await
            .unwrap();
        assert_eq!(returned, Some(existing.id));

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_user_by_email(&existing.email).await.unwrap().unwrap();
        assert!(password::verify_string("rotated-password", &user.password_hash).unwrap());
        assert_eq!(Users::new(&mut conn).list().await.unwrap().len(), 1);

        // Without a password the existing hash is left alone
        create_initial_admin_user(&existing.email, None, fast_hashing(), &pool).await.unwrap();
        let user = Users::new(&mut conn).get_user_by_email(&existing.email).await.unwrap().unwrap();
        assert!(password::verify_string("rotated-password", &user.password_hash).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_without_password_skips(pool: PgPool) {
        let result = create_initial_admin_user("nobody@example.com", None, fast_hashing(), &pool)
            .await
            .unwrap();
        assert_eq!(result, None);

        let mut conn = pool.acquire().await.unwrap();
        assert!(Users::new(&mut conn).list().await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_application_integration(pool: PgPool) {
        let mut config = create_test_config();
        config.database.url = Some(pool.connect_options().to_url_lossy().to_string());
        config.admin_email = "boot@example.com".to_string();
        config.admin_password = Some("boot-password".to_string());

        let app = Application::new(config).await;
        assert!(app.is_ok(), "Application::new should succeed");
        let server = app.unwrap().into_test_server();

        let health_response = server.get("/healthz").await;
        assert_eq!(health_response.status_code().as_u16(), 200);
        assert_eq!(health_response.text(), "OK");

        let docs = server.get("/api/docs").await;
        assert_eq!(docs.status_code().as_u16(), 200);

        // Protected routes reject anonymous callers
        let api_response = server.get("/api/patients").await;
        assert_eq!(api_response.status_code().as_u16(), 401);

        // The bootstrapped admin can log in
        let login = server
            .post("/api/auth/login")
            .json(&serde_json::json!({ "email": "boot@example.com", "password": "boot-password" }))
            .await;
        assert_eq!(login.status_code().as_u16(), 200);
    }

    #[test]
    fn test_cors_layer_from_config() {
        let config = create_test_config();
        assert!(create_cors_layer(&config).is_ok());
    }
}
