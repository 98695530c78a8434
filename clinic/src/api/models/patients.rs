//! API request/response models for patients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::{
        patients::{PatientCreateDBRequest, PatientDBResponse, PatientUpdateDBRequest},
        users::UserDBResponse,
    },
    errors::{Error, Result},
    records::{AccountChanges, DependentRecord, NewAccount},
    types::{PatientId, UserId},
};

/// Register a patient together with their login account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientCreate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub age: Option<i32>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub medical_history: String,
}

impl PatientCreate {
    /// Split into the account part and the patient row part.
    pub fn into_parts(self) -> Result<(NewAccount, PatientCreateDBRequest)> {
        let age = self.age.ok_or_else(|| Error::Validation {
            message: "age is required".to_string(),
        })?;

        Ok((
            NewAccount {
                name: self.name,
                email: self.email,
                password: self.password,
            },
            PatientCreateDBRequest {
                age,
                gender: self.gender,
                medical_history: self.medical_history,
            },
        ))
    }
}

/// Partial update; omitted fields keep their stored value. Medical history is fixed at registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl PatientUpdate {
    pub fn into_parts(self) -> (AccountChanges, PatientUpdateDBRequest) {
        (
            AccountChanges { name: self.name },
            PatientUpdateDBRequest {
                age: self.age,
                gender: self.gender,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PatientId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub gender: String,
    pub medical_history: String,
}

impl From<DependentRecord<PatientDBResponse>> for PatientResponse {
    fn from(DependentRecord { record, user }: DependentRecord<PatientDBResponse>) -> Self {
        let UserDBResponse { name, email, .. } = user;
        Self {
            id: record.id,
            user_id: record.user_id,
            name,
            email,
            age: record.age,
            gender: record.gender,
            medical_history: record.medical_history,
        }
    }
}

/// `{message, patient}` envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientEnvelope {
    pub message: String,
    pub patient: PatientResponse,
}

/// `{message, patients}` envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientListEnvelope {
    pub message: String,
    pub patients: Vec<PatientResponse>,
}
