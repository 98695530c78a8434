//! Database models for patient/doctor assignments.

use crate::types::{DoctorId, MappingId, PatientId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for assigning a doctor to a patient
#[derive(Debug, Clone)]
pub struct MappingCreateDBRequest {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
}

/// Database response for a mapping row
#[derive(Debug, Clone, FromRow)]
pub struct MappingDBResponse {
    pub id: MappingId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub assigned_at: DateTime<Utc>,
}

/// A mapping joined with the assigned doctor and the doctor's account name
#[derive(Debug, Clone, FromRow)]
pub struct AssignedDoctorDBResponse {
    pub mapping_id: MappingId,
    pub assigned_at: DateTime<Utc>,
    pub doctor_id: DoctorId,
    pub doctor_name: String,
    pub specialization: String,
    pub experience_years: i32,
}
