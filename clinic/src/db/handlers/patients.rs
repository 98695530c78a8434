//! Database repository for patients.

use crate::{
    api::models::users::Role,
    db::{
        handlers::dependents::{DependentKind, Dependents, RowQuery},
        models::patients::{PatientCreateDBRequest, PatientDBResponse, PatientUpdateDBRequest},
    },
    types::{Resource, UserId},
};
use uuid::Uuid;

/// Marker for the `patients` table
#[derive(Debug, Clone, Copy)]
pub struct PatientKind;

impl DependentKind for PatientKind {
    const TABLE: &'static str = "patients";
    const COLUMNS: &'static str = "id, user_id, age, gender, medical_history";
    const INSERT_COLUMNS: &'static str = "age, gender, medical_history";
    const INSERT_VALUES: &'static str = "$3, $4, $5";
    const UPDATE_ASSIGNMENTS: &'static str = "age = COALESCE($2, age), gender = COALESCE($3, gender)";
    const OWNER_ROLE: Role = Role::Patient;
    const RESOURCE: Resource = Resource::Patients;
    const LABEL: &'static str = "Patient";

    type Fields = PatientCreateDBRequest;
    type Changes = PatientUpdateDBRequest;
    type Row = PatientDBResponse;

    fn bind_fields<'q>(query: RowQuery<'q, Self::Row>, fields: &Self::Fields) -> RowQuery<'q, Self::Row> {
        query
            .bind(fields.age)
            .bind(fields.gender.clone())
            .bind(fields.medical_history.clone())
    }

    fn bind_changes<'q>(query: RowQuery<'q, Self::Row>, changes: &Self::Changes) -> RowQuery<'q, Self::Row> {
        query.bind(changes.age).bind(changes.gender.clone())
    }

    fn row_id(row: &Self::Row) -> Uuid {
        row.id
    }

    fn row_user_id(row: &Self::Row) -> UserId {
        row.user_id
    }
}

pub type Patients<'c> = Dependents<'c, PatientKind>;
