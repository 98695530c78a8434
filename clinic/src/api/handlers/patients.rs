use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        patients::{PatientCreate, PatientEnvelope, PatientListEnvelope, PatientResponse, PatientUpdate},
        users::CurrentUser,
    },
    db::handlers::PatientKind,
    errors::Error,
    records::RecordService,
    types::{JsonBody, RecordId},
};

/// Register a patient and their login account
#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = PatientCreate,
    tag = "patients",
    responses(
        (status = 200, description = "Patient registered", body = PatientEnvelope),
        (status = 400, description = "Missing or blank fields", body = crate::errors::ErrorBody),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorBody),
        (status = 403, description = "Admin only", body = crate::errors::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_patient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    JsonBody(request): JsonBody<PatientCreate>,
) -> Result<Json<PatientEnvelope>, Error> {
    let (account, fields) = request.into_parts()?;
    let created = RecordService::<PatientKind>::new(&state)
        .create(&current_user, account, fields)
        .await?;

    Ok(Json(PatientEnvelope {
        message: "Patient registered successfully".to_string(),
        patient: created.into(),
    }))
}

/// List all patients
#[utoipa::path(
    get,
    path = "/api/patients",
    tag = "patients",
    responses(
        (status = 200, description = "All patients", body = PatientListEnvelope),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorBody),
        (status = 403, description = "Admin only", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_patients(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<PatientListEnvelope>, Error> {
    let patients = RecordService::<PatientKind>::new(&state).list_all(&current_user).await?;

    Ok(Json(PatientListEnvelope {
        message: format!("Found {} patients", patients.len()),
        patients: patients.into_iter().map(PatientResponse::from).collect(),
    }))
}

/// Fetch one patient
#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = PatientEnvelope),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorBody),
        (status = 403, description = "Not an admin and not this patient", body = crate::errors::ErrorBody),
        (status = 404, description = "No such patient", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_patient(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    current_user: CurrentUser,
) -> Result<Json<PatientEnvelope>, Error> {
    let patient = RecordService::<PatientKind>::new(&state).get_by_id(&current_user, id).await?;

    Ok(Json(PatientEnvelope {
        message: "Patient found".to_string(),
        patient: patient.into(),
    }))
}

/// Update a patient's name, age or gender
#[utoipa::path(
    post,
    path = "/api/patients/{id}",
    request_body = PatientUpdate,
    tag = "patients",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient updated", body = PatientEnvelope),
        (status = 400, description = "Blank field or malformed id", body = crate::errors::ErrorBody),
        (status = 403, description = "Not an admin and not this patient", body = crate::errors::ErrorBody),
        (status = 404, description = "No such patient", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_patient(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    current_user: CurrentUser,
    JsonBody(request): JsonBody<PatientUpdate>,
) -> Result<Json<PatientEnvelope>, Error> {
    let (account, changes) = request.into_parts();
    let patient = RecordService::<PatientKind>::new(&state)
        .update(&current_user, id, account, changes)
        .await?;

    Ok(Json(PatientEnvelope {
        message: "Patient updated successfully".to_string(),
        patient: patient.into(),
    }))
}

/// Delete a patient together with their account and assignments
#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient deleted", body = PatientEnvelope),
        (status = 403, description = "Not an admin and not this patient", body = crate::errors::ErrorBody),
        (status = 404, description = "No such patient", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_patient(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    current_user: CurrentUser,
) -> Result<Json<PatientEnvelope>, Error> {
    let patient = RecordService::<PatientKind>::new(&state).delete(&current_user, id).await?;

    Ok(Json(PatientEnvelope {
        message: "Patient deleted successfully".to_string(),
        patient: patient.into(),
    }))
}
