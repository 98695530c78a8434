use sqlx::PgPool;
use tracing::{info, instrument};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::permissions,
    db::{
        errors::DbError,
        handlers::{Doctors, Mappings, Patients},
        models::mappings::{AssignedDoctorDBResponse, MappingCreateDBRequest, MappingDBResponse},
    },
    errors::{Error, Result},
    types::{DoctorId, Operation, PatientId, Resource, abbrev_uuid},
};

/// Patient/doctor assignment operations.
pub struct MappingService {
    db: PgPool,
}

impl MappingService {
    pub fn new(state: &AppState) -> Self {
        Self { db: state.db.clone() }
    }

    /// Assign a doctor to a patient. The doctor is checked first, so when both are
    /// missing the error names the doctor.
    #[instrument(skip_all, fields(patient_id = %abbrev_uuid(&patient_id), doctor_id = %abbrev_uuid(&doctor_id)), err)]
    pub async fn assign(&self, user: &CurrentUser, patient_id: PatientId, doctor_id: DoctorId) -> Result<MappingDBResponse> {
        permissions::require(user, Resource::Mappings, Operation::Create)?;

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        if !Doctors::new(&mut conn).exists(doctor_id).await? {
            return Err(Error::NotFound {
                resource: "Doctor".to_string(),
                id: doctor_id.to_string(),
            });
        }
        if !Patients::new(&mut conn).exists(patient_id).await? {
            return Err(Error::NotFound {
                resource: "Patient".to_string(),
                id: patient_id.to_string(),
            });
        }

        let mapping = Mappings::new(&mut conn)
            .create(&MappingCreateDBRequest { patient_id, doctor_id })
            .await
            .map_err(|e| {
                if e.is_unique_violation_on("mappings") {
                    Error::Conflict {
                        message: "This doctor is already assigned to this patient".to_string(),
                    }
                } else {
                    Error::Database(e)
                }
            })?;

        info!(mapping_id = %abbrev_uuid(&mapping.id), "Assigned doctor to patient");
        Ok(mapping)
    }

    #[instrument(skip_all, err)]
    pub async fn list_all(&self, user: &CurrentUser) -> Result<Vec<MappingDBResponse>> {
        permissions::require(user, Resource::Mappings, Operation::List)?;

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        Ok(Mappings::new(&mut conn).list().await?)
    }

    /// Doctors assigned to a patient. A patient without assignments is reported as not found.
    #[instrument(skip_all, fields(patient_id = %abbrev_uuid(&patient_id)), err)]
    pub async fn list_for_patient(&self, user: &CurrentUser, patient_id: PatientId) -> Result<Vec<AssignedDoctorDBResponse>> {
        permissions::require(user, Resource::Mappings, Operation::Read)?;

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        if !Patients::new(&mut conn).exists(patient_id).await? {
            return Err(Error::NotFound {
                resource: "Patient".to_string(),
                id: patient_id.to_string(),
            });
        }

        let doctors = Mappings::new(&mut conn).list_for_patient(patient_id).await?;
        if doctors.is_empty() {
            return Err(Error::NotFound {
                resource: "Doctor assignments for patient".to_string(),
                id: patient_id.to_string(),
            });
        }

        Ok(doctors)
    }

    /// Removing an assignment is not offered, so this only builds the refusal.
    pub fn unassign(&self, mapping_id: &str) -> Error {
        Error::NotImplemented {
            operation: format!("Removing assignment {mapping_id}"),
        }
    }
}
