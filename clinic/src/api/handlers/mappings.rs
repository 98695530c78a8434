use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        mappings::{
            AssignedDoctorResponse, MappingCreate, MappingEnvelope, MappingListEnvelope, MappingResponse, PatientDoctorsResponse,
        },
        users::CurrentUser,
    },
    errors::Error,
    records::MappingService,
    types::{JsonBody, RecordId},
};

/// Assign a doctor to a patient
#[utoipa::path(
    post,
    path = "/api/mappings",
    request_body = MappingCreate,
    tag = "mappings",
    responses(
        (status = 201, description = "Doctor assigned", body = MappingEnvelope),
        (status = 400, description = "Missing or malformed ids", body = crate::errors::ErrorBody),
        (status = 403, description = "Admin only", body = crate::errors::ErrorBody),
        (status = 404, description = "Doctor or patient does not exist", body = crate::errors::ErrorBody),
        (status = 409, description = "Doctor already assigned to this patient", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn assign_doctor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    JsonBody(request): JsonBody<MappingCreate>,
) -> Result<(StatusCode, Json<MappingEnvelope>), Error> {
    let (patient_id, doctor_id) = request.ids()?;
    let mapping = MappingService::new(&state).assign(&current_user, patient_id, doctor_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(MappingEnvelope {
            message: "Doctor assigned to patient successfully".to_string(),
            assigned: mapping.into(),
        }),
    ))
}

/// List every assignment
#[utoipa::path(
    get,
    path = "/api/mappings",
    tag = "mappings",
    responses(
        (status = 200, description = "All assignments", body = MappingListEnvelope),
        (status = 403, description = "Admin only", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_mappings(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<MappingListEnvelope>, Error> {
    let mappings = MappingService::new(&state).list_all(&current_user).await?;

    Ok(Json(MappingListEnvelope {
        message: format!("Found {} mappings", mappings.len()),
        mappings: mappings.into_iter().map(MappingResponse::from).collect(),
    }))
}

/// Doctors assigned to a patient
#[utoipa::path(
    get,
    path = "/api/mappings/{id}",
    tag = "mappings",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Assigned doctors", body = PatientDoctorsResponse),
        (status = 400, description = "Malformed patient id", body = crate::errors::ErrorBody),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorBody),
        (status = 404, description = "Patient missing or has no assigned doctors", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_patient_doctors(
    State(state): State<AppState>,
    RecordId(patient_id): RecordId,
    current_user: CurrentUser,
) -> Result<Json<PatientDoctorsResponse>, Error> {
    let doctors = MappingService::new(&state).list_for_patient(&current_user, patient_id).await?;

    Ok(Json(PatientDoctorsResponse {
        message: "Doctors assigned to patient".to_string(),
        patient_id,
        doctors: doctors.into_iter().map(AssignedDoctorResponse::from).collect(),
    }))
}

/// Remove an assignment. Not offered; always answers 501.
#[utoipa::path(
    delete,
    path = "/api/mappings/{id}",
    tag = "mappings",
    params(("id" = String, Path, description = "Mapping id")),
    responses(
        (status = 501, description = "Removing assignments is not supported", body = crate::errors::ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn unassign_doctor(State(state): State<AppState>, Path(mapping_id): Path<String>) -> Error {
    MappingService::new(&state).unassign(&mapping_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::{doctors::DoctorEnvelope, patients::PatientEnvelope, users::Role},
        test_utils::{create_test_app, create_test_user, session_cookie_for},
    };
    use axum::http::header;
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_assign_and_look_up(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let admin = CurrentUser::from(create_test_user(&pool, Role::Admin).await);
        let admin_cookie = session_cookie_for(&admin, &state.config);

        let doctor = server
            .post("/api/doctors")
            .add_header(header::COOKIE, admin_cookie.clone())
            .json(&json!({
                "name": "A",
                "email": "a@x.com",
                "password": "p",
                "specialization": "cardio",
                "experience_years": 5
            }))
            .await;
        doctor.assert_status_ok();
        let doctor = doctor.json::<DoctorEnvelope>().doctor;

        let patient = server
            .post("/api/patients")
            .add_header(header::COOKIE, admin_cookie.clone())
            .json(&json!({
                "name": "B",
                "email": "b@x.com",
                "password": "p",
                "age": 30,
                "gender": "F",
                "medical_history": "none"
            }))
            .await;
        patient.assert_status_ok();
        let patient = patient.json::<PatientEnvelope>().patient;

        let assigned = server
            .post("/api/mappings")
            .add_header(header::COOKIE, admin_cookie.clone())
            .json(&json!({ "doctorId": doctor.id, "patientId": patient.id }))
            .await;
        assigned.assert_status(StatusCode::CREATED);
        let mapping = assigned.json::<MappingEnvelope>().assigned;
        assert_eq!(mapping.doctor_id, doctor.id);
        assert_eq!(mapping.patient_id, patient.id);

        // The patient logs in with the password the admin chose
        let login = server
            .post("/api/auth/login")
            .json(&json!({ "email": "b@x.com", "password": "p" }))
            .await;
        login.assert_status_ok();
        let patient_cookie = login
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();

        let lookup = server
            .get(&format!("/api/mappings/{}", patient.id))
            .add_header(header::COOKIE, patient_cookie)
            .await;
        lookup.assert_status_ok();
        let body = lookup.json::<PatientDoctorsResponse>();
        assert_eq!(body.patient_id, patient.id);
        assert_eq!(body.doctors.len(), 1);
        assert_eq!(body.doctors[0].doctor_id, doctor.id);
        assert_eq!(body.doctors[0].name, "A");

        let again = server
            .post("/api/mappings")
            .add_header(header::COOKIE, admin_cookie.clone())
            .json(&json!({ "doctorId": doctor.id, "patientId": patient.id }))
            .await;
        again.assert_status(StatusCode::CONFLICT);

        let listed = server.get("/api/mappings").add_header(header::COOKIE, admin_cookie.clone()).await;
        listed.assert_status_ok();
        assert_eq!(listed.json::<MappingListEnvelope>().mappings.len(), 1);

        // Deleting the doctor removes the assignment
        server
            .delete(&format!("/api/doctors/{}", doctor.id))
            .add_header(header::COOKIE, admin_cookie.clone())
            .await
            .assert_status_ok();
        let listed = server.get("/api/mappings").add_header(header::COOKIE, admin_cookie).await;
        assert!(listed.json::<MappingListEnvelope>().mappings.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_lookup_rejects_malformed_and_unknown_patient(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let doctor = CurrentUser::from(create_test_user(&pool, Role::Doctor).await);
        let cookie = session_cookie_for(&doctor, &state.config);

        let malformed = server.get("/api/mappings/42").add_header(header::COOKIE, cookie.clone()).await;
        malformed.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(malformed.json::<serde_json::Value>()["error"], "validation_error");

        let unknown = server
            .get(&format!("/api/mappings/{}", Uuid::new_v4()))
            .add_header(header::COOKIE, cookie)
            .await;
        unknown.assert_status(StatusCode::NOT_FOUND);

        let anonymous = server.get(&format!("/api/mappings/{}", Uuid::new_v4())).await;
        anonymous.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assign_is_admin_only(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let doctor = CurrentUser::from(create_test_user(&pool, Role::Doctor).await);

        let response = server
            .post("/api/mappings")
            .add_header(header::COOKIE, session_cookie_for(&doctor, &state.config))
            .json(&json!({ "doctorId": Uuid::new_v4(), "patientId": Uuid::new_v4() }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unassign_answers_not_implemented(pool: PgPool) {
        let (server, state) = create_test_app(pool.clone()).await;
        let admin = CurrentUser::from(create_test_user(&pool, Role::Admin).await);

        let response = server
            .delete(&format!("/api/mappings/{}", Uuid::new_v4()))
            .add_header(header::COOKIE, session_cookie_for(&admin, &state.config))
            .await;
        response.assert_status(StatusCode::NOT_IMPLEMENTED);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["error"], "not_implemented");
        assert!(body["message"].as_str().is_some());

        // Same answer without a session or with any id
        server
            .delete("/api/mappings/whatever")
            .await
            .assert_status(StatusCode::NOT_IMPLEMENTED);
    }
}
