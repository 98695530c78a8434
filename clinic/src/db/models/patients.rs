//! Database models for patients.

use crate::types::{PatientId, UserId};
use sqlx::FromRow;

/// Patient-specific columns supplied when a patient is registered
#[derive(Debug, Clone)]
pub struct PatientCreateDBRequest {
    pub age: i32,
    pub gender: String,
    pub medical_history: String,
}

/// Mutable patient columns. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PatientUpdateDBRequest {
    pub age: Option<i32>,
    pub gender: Option<String>,
}

/// Database response for a patient row
#[derive(Debug, Clone, FromRow)]
pub struct PatientDBResponse {
    pub id: PatientId,
    pub user_id: UserId,
    pub age: i32,
    pub gender: String,
    pub medical_history: String,
}
