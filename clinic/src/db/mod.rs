//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Services   │  (records - access control and validation)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Writes that touch more than one table (creating a user together with its patient row,
//! for instance) open a transaction and build every repository from it:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let user = Users::new(&mut tx).create(&user_request).await?;
//! let patient = Patients::new(&mut tx).create(&patient_request).await?;
//! tx.commit().await?;
//! ```
//!
//! Migrations live in `migrations/` and are applied through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
