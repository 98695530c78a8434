//! API request/response models for patient/doctor assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::mappings::{AssignedDoctorDBResponse, MappingDBResponse},
    errors::Result,
    records::require_non_blank,
    types::{DoctorId, MappingId, PatientId, parse_id},
};

/// Assign a doctor to a patient. Ids arrive as strings so malformed ones are reported as
/// validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MappingCreate {
    #[serde(default, rename = "doctorId")]
    pub doctor_id: String,
    #[serde(default, rename = "patientId")]
    pub patient_id: String,
}

impl MappingCreate {
    /// Parsed `(patient_id, doctor_id)`
    pub fn ids(&self) -> Result<(PatientId, DoctorId)> {
        require_non_blank("doctorId", &self.doctor_id)?;
        require_non_blank("patientId", &self.patient_id)?;
        Ok((parse_id(&self.patient_id)?, parse_id(&self.doctor_id)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MappingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MappingId,
    #[schema(value_type = String, format = "uuid")]
    pub patient_id: PatientId,
    #[schema(value_type = String, format = "uuid")]
    pub doctor_id: DoctorId,
    pub assigned_at: DateTime<Utc>,
}

impl From<MappingDBResponse> for MappingResponse {
    fn from(db: MappingDBResponse) -> Self {
        Self {
            id: db.id,
            patient_id: db.patient_id,
            doctor_id: db.doctor_id,
            assigned_at: db.assigned_at,
        }
    }
}

/// A doctor as seen from one of their patients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignedDoctorResponse {
    #[schema(value_type = String, format = "uuid")]
    pub mapping_id: MappingId,
    pub assigned_at: DateTime<Utc>,
    #[schema(value_type = String, format = "uuid")]
    pub doctor_id: DoctorId,
    pub name: String,
    pub specialization: String,
    pub experience_years: i32,
}

impl From<AssignedDoctorDBResponse> for AssignedDoctorResponse {
    fn from(db: AssignedDoctorDBResponse) -> Self {
        Self {
            mapping_id: db.mapping_id,
            assigned_at: db.assigned_at,
            doctor_id: db.doctor_id,
            name: db.doctor_name,
            specialization: db.specialization,
            experience_years: db.experience_years,
        }
    }
}

/// `{message, assigned}` envelope returned by the assignment endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MappingEnvelope {
    pub message: String,
    pub assigned: MappingResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MappingListEnvelope {
    pub message: String,
    pub mappings: Vec<MappingResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientDoctorsResponse {
    pub message: String,
    #[schema(value_type = String, format = "uuid")]
    pub patient_id: PatientId,
    pub doctors: Vec<AssignedDoctorResponse>,
}
