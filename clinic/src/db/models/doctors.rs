//! Database models for doctors.

use crate::types::{DoctorId, UserId};
use sqlx::FromRow;

/// Doctor-specific columns supplied when a doctor is registered
#[derive(Debug, Clone)]
pub struct DoctorCreateDBRequest {
    pub specialization: String,
    pub experience_years: i32,
}

/// Mutable doctor columns. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct DoctorUpdateDBRequest {
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
}

/// Database response for a doctor row
#[derive(Debug, Clone, FromRow)]
pub struct DoctorDBResponse {
    pub id: DoctorId,
    pub user_id: UserId,
    pub specialization: String,
    pub experience_years: i32,
}
