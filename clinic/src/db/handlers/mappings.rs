//! Database repository for patient/doctor assignments.
//!
//! Mappings are immutable once created, so this repository exposes inherent methods
//! instead of implementing [`super::Repository`].

use crate::{
    db::{
        errors::Result,
        models::mappings::{AssignedDoctorDBResponse, MappingCreateDBRequest, MappingDBResponse},
    },
    types::{PatientId, abbrev_uuid},
};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Mappings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Mappings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(
        patient_id = %abbrev_uuid(&request.patient_id),
        doctor_id = %abbrev_uuid(&request.doctor_id)
    ), err)]
    pub async fn create(&mut self, request: &MappingCreateDBRequest) -> Result<MappingDBResponse> {
        let mapping = sqlx::query_as::<_, MappingDBResponse>(
            r#"
            INSERT INTO mappings (id, patient_id, doctor_id)
            VALUES ($1, $2, $3)
            RETURNING id, patient_id, doctor_id, assigned_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.patient_id)
        .bind(request.doctor_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(mapping)
    }

    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<MappingDBResponse>> {
        let mappings = sqlx::query_as::<_, MappingDBResponse>(
            "SELECT id, patient_id, doctor_id, assigned_at FROM mappings ORDER BY assigned_at, id",
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(mappings)
    }

    /// Doctors assigned to a patient, joined with each doctor's account name.
    #[instrument(skip(self), fields(patient_id = %abbrev_uuid(&patient_id)), err)]
    pub async fn list_for_patient(&mut self, patient_id: PatientId) -> Result<Vec<AssignedDoctorDBResponse>> {
        let doctors = sqlx::query_as::<_, AssignedDoctorDBResponse>(
            r#"
            SELECT
                m.id AS mapping_id,
                m.assigned_at,
                d.id AS doctor_id,
                u.name AS doctor_name,
                d.specialization,
                d.experience_years
            FROM mappings m
            JOIN doctors d ON d.id = m.doctor_id
            JOIN users u ON u.id = d.user_id
            WHERE m.patient_id = $1
            ORDER BY m.assigned_at, m.id
            "#,
        )
        .bind(patient_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(doctors)
    }

}
