//! Access-controlled record operations.
//!
//! Handlers never talk to repositories directly. They hand the authenticated principal and
//! the request payload to a service here, which checks capabilities from
//! [`crate::auth::permissions`], validates input, and runs the repository calls inside the
//! right transaction.
//!
//! - [`RecordService`]: patients and doctors, generic over [`crate::db::handlers::DependentKind`]
//! - [`MappingService`]: patient/doctor assignments

mod dependents;
mod mappings;
mod validation;

pub use dependents::RecordService;
pub(crate) use dependents::{conflict_on_duplicate_email, email_conflict};
pub use mappings::MappingService;
pub use validation::{MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, Validate, require_max_length, require_non_blank};

use crate::db::models::users::UserDBResponse;

/// Account fields supplied when registering a patient or doctor
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Account fields that may change alongside a record
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
}

/// A patient or doctor row together with its owning account
#[derive(Debug, Clone)]
pub struct DependentRecord<R> {
    pub record: R,
    pub user: UserDBResponse,
}
