//! API request/response models for doctors.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::{
        doctors::{DoctorCreateDBRequest, DoctorDBResponse, DoctorUpdateDBRequest},
        users::UserDBResponse,
    },
    errors::{Error, Result},
    records::{AccountChanges, DependentRecord, NewAccount},
    types::{DoctorId, UserId},
};

/// Register a doctor together with their login account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DoctorCreate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub specialization: String,
    pub experience_years: Option<i32>,
}

impl DoctorCreate {
    pub fn into_parts(self) -> Result<(NewAccount, DoctorCreateDBRequest)> {
        let experience_years = self.experience_years.ok_or_else(|| Error::Validation {
            message: "experience_years is required".to_string(),
        })?;

        Ok((
            NewAccount {
                name: self.name,
                email: self.email,
                password: self.password,
            },
            DoctorCreateDBRequest {
                specialization: self.specialization,
                experience_years,
            },
        ))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
}

impl DoctorUpdate {
    pub fn into_parts(self) -> (AccountChanges, DoctorUpdateDBRequest) {
        (
            AccountChanges { name: self.name },
            DoctorUpdateDBRequest {
                specialization: self.specialization,
                experience_years: self.experience_years,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DoctorResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: DoctorId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub experience_years: i32,
}

impl From<DependentRecord<DoctorDBResponse>> for DoctorResponse {
    fn from(DependentRecord { record, user }: DependentRecord<DoctorDBResponse>) -> Self {
        let UserDBResponse { name, email, .. } = user;
        Self {
            id: record.id,
            user_id: record.user_id,
            name,
            email,
            specialization: record.specialization,
            experience_years: record.experience_years,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DoctorEnvelope {
    pub message: String,
    pub doctor: DoctorResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DoctorListEnvelope {
    pub message: String,
    pub doctors: Vec<DoctorResponse>,
}
