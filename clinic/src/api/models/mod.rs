//! API request and response data models.
//!
//! API models are distinct from the database rows in [`crate::db::models`]: responses never
//! carry password hashes, and patient/doctor responses flatten the owning account's name
//! and email into the record. Everything is annotated with `utoipa` for the OpenAPI docs.

pub mod auth;
pub mod doctors;
pub mod mappings;
pub mod patients;
pub mod users;
