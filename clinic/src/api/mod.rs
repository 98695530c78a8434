//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! Routes live under `/api`:
//!
//! - **Authentication** (`/api/auth/*`): register, login, logout, current principal
//! - **Patients** (`/api/patients/*`) and **Doctors** (`/api/doctors/*`): record CRUD
//! - **Mappings** (`/api/mappings/*`): patient/doctor assignments
//!
//! OpenAPI documentation is served at `/api/docs`.

pub mod handlers;
pub mod models;
