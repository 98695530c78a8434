//! Database record structures matching table schemas.
//!
//! Each submodule holds the create/update request structs a repository accepts and the
//! row struct it returns. API-facing shapes live in [`crate::api::models`].

pub mod doctors;
pub mod mappings;
pub mod patients;
pub mod users;
