//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection`, so the caller decides whether the
//! work runs on a pooled connection or inside a transaction:
//!
//! ```ignore
//! use clinic::db::handlers::{Repository, Users};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let users = Users::new(&mut tx).list().await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```
//!
//! - [`Users`]: accounts and credentials
//! - [`Patients`] / [`Doctors`]: per-account records, both backed by [`dependents::Dependents`]
//! - [`Mappings`]: patient/doctor assignments

pub mod dependents;
pub mod doctors;
pub mod mappings;
pub mod patients;
pub mod repository;
pub mod users;

pub use dependents::{DependentCreateDBRequest, DependentKind, Dependents};
pub use doctors::{DoctorKind, Doctors};
pub use mappings::Mappings;
pub use patients::{PatientKind, Patients};
pub use repository::Repository;
pub use users::Users;
