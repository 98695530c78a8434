//! Database repository for doctors.

use crate::{
    api::models::users::Role,
    db::{
        handlers::dependents::{DependentKind, Dependents, RowQuery},
        models::doctors::{DoctorCreateDBRequest, DoctorDBResponse, DoctorUpdateDBRequest},
    },
    types::{Resource, UserId},
};
use uuid::Uuid;

/// Marker for the `doctors` table
#[derive(Debug, Clone, Copy)]
pub struct DoctorKind;

impl DependentKind for DoctorKind {
    const TABLE: &'static str = "doctors";
    const COLUMNS: &'static str = "id, user_id, specialization, experience_years";
    const INSERT_COLUMNS: &'static str = "specialization, experience_years";
    const INSERT_VALUES: &'static str = "$3, $4";
    const UPDATE_ASSIGNMENTS: &'static str =
        "specialization = COALESCE($2, specialization), experience_years = COALESCE($3, experience_years)";
    const OWNER_ROLE: Role = Role::Doctor;
    const RESOURCE: Resource = Resource::Doctors;
    const LABEL: &'static str = "Doctor";

    type Fields = DoctorCreateDBRequest;
    type Changes = DoctorUpdateDBRequest;
    type Row = DoctorDBResponse;

    fn bind_fields<'q>(query: RowQuery<'q, Self::Row>, fields: &Self::Fields) -> RowQuery<'q, Self::Row> {
        query.bind(fields.specialization.clone()).bind(fields.experience_years)
    }

    fn bind_changes<'q>(query: RowQuery<'q, Self::Row>, changes: &Self::Changes) -> RowQuery<'q, Self::Row> {
        query.bind(changes.specialization.clone()).bind(changes.experience_years)
    }

    fn row_id(row: &Self::Row) -> Uuid {
        row.id
    }

    fn row_user_id(row: &Self::Row) -> UserId {
        row.user_id
    }
}

pub type Doctors<'c> = Dependents<'c, DoctorKind>;
