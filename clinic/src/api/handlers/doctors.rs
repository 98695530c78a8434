use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        doctors::{DoctorCreate, DoctorEnvelope, DoctorListEnvelope, DoctorResponse, DoctorUpdate},
        users::CurrentUser,
    },
    db::handlers::DoctorKind,
    errors::Error,
    records::RecordService,
    types::{JsonBody, RecordId},
};

/// Register a doctor and their login account
#[utoipa::path(
    post,
    path = "/api/doctors",
    request_body = DoctorCreate,
    tag = "doctors",
    responses(
        (status = 200, description = "Doctor registered", body = DoctorEnvelope),
        (status = 400, description = "Missing or blank fields", body = crate::errors::ErrorBody),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorBody),
        (status = 403, description = "Admin only", body = crate::errors::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_doctor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    JsonBody(request): JsonBody<DoctorCreate>,
) -> Result<Json<DoctorEnvelope>, Error> {
    let (account, fields) = request.into_parts()?;
    let created = RecordService::<DoctorKind>::new(&state)
        .create(&current_user, account, fields)
        .await?;

    Ok(Json(DoctorEnvelope {
        message: "Doctor registered successfully".to_string(),
        doctor: created.into(),
    }))
}

/// List all doctors
#[utoipa::path(
    get,
    path = "/api/doctors",
    tag = "doctors",
    responses(
        (status = 200, description = "All doctors", body = DoctorListEnvelope),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorBody),
        (status = 403, description = "Admin only", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_doctors(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<DoctorListEnvelope>, Error> {
    let doctors = RecordService::<DoctorKind>::new(&state).list_all(&current_user).await?;

    Ok(Json(DoctorListEnvelope {
        message: format!("Found {} doctors", doctors.len()),
        doctors: doctors.into_iter().map(DoctorResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    tag = "doctors",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor", body = DoctorEnvelope),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorBody),
        (status = 403, description = "Not an admin and not this doctor", body = crate::errors::ErrorBody),
        (status = 404, description = "No such doctor", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_doctor(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    current_user: CurrentUser,
) -> Result<Json<DoctorEnvelope>, Error> {
    let doctor = RecordService::<DoctorKind>::new(&state).get_by_id(&current_user, id).await?;

    Ok(Json(DoctorEnvelope {
        message: "Doctor found".to_string(),
        doctor: doctor.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/doctors/{id}",
    request_body = DoctorUpdate,
    tag = "doctors",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor updated", body = DoctorEnvelope),
        (status = 400, description = "Blank field or malformed id", body = crate::errors::ErrorBody),
        (status = 403, description = "Not an admin and not this doctor", body = crate::errors::ErrorBody),
        (status = 404, description = "No such doctor", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_doctor(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    current_user: CurrentUser,
    JsonBody(request): JsonBody<DoctorUpdate>,
) -> Result<Json<DoctorEnvelope>, Error> {
    let (account, changes) = request.into_parts();
    let doctor = RecordService::<DoctorKind>::new(&state)
        .update(&current_user, id, account, changes)
        .await?;

    Ok(Json(DoctorEnvelope {
        message: "Doctor updated successfully".to_string(),
        doctor: doctor.into(),
    }))
}

/// Delete a doctor together with their account and assignments
#[utoipa::path(
    delete,
    path = "/api/doctors/{id}",
    tag = "doctors",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor deleted", body = DoctorEnvelope),
        (status = 403, description = "Not an admin and not this doctor", body = crate::errors::ErrorBody),
        (status = 404, description = "No such doctor", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_doctor(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    current_user: CurrentUser,
) -> Result<Json<DoctorEnvelope>, Error> {
    let doctor = RecordService::<DoctorKind>::new(&state).delete(&current_user, id).await?;

    Ok(Json(DoctorEnvelope {
        message: "Doctor deleted successfully".to_string(),
        doctor: doctor.into(),
    }))
}
