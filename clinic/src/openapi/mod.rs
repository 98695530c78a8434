//! OpenAPI documentation for the clinic API, served by Scalar at `/api/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::{api, errors};

/// Session cookie issued by `/api/auth/login`.
struct CookieSecurityAddon;

impl Modify for CookieSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "uid",
                    "Session token set by the login endpoint. The cookie name is configurable.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&CookieSecurityAddon),
    security(("CookieAuth" = [])),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::me,
        api::handlers::patients::create_patient,
        api::handlers::patients::list_patients,
        api::handlers::patients::get_patient,
        api::handlers::patients::update_patient,
        api::handlers::patients::delete_patient,
        api::handlers::doctors::create_doctor,
        api::handlers::doctors::list_doctors,
        api::handlers::doctors::get_doctor,
        api::handlers::doctors::update_doctor,
        api::handlers::doctors::delete_doctor,
        api::handlers::mappings::assign_doctor,
        api::handlers::mappings::list_mappings,
        api::handlers::mappings::get_patient_doctors,
        api::handlers::mappings::unassign_doctor,
    ),
    components(
        schemas(
            errors::ErrorBody,
            api::models::users::Role,
            api::models::users::CurrentUser,
            api::models::users::UserResponse,
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::patients::PatientCreate,
            api::models::patients::PatientUpdate,
            api::models::patients::PatientResponse,
            api::models::patients::PatientEnvelope,
            api::models::patients::PatientListEnvelope,
            api::models::doctors::DoctorCreate,
            api::models::doctors::DoctorUpdate,
            api::models::doctors::DoctorResponse,
            api::models::doctors::DoctorEnvelope,
            api::models::doctors::DoctorListEnvelope,
            api::models::mappings::MappingCreate,
            api::models::mappings::MappingResponse,
            api::models::mappings::AssignedDoctorResponse,
            api::models::mappings::MappingEnvelope,
            api::models::mappings::MappingListEnvelope,
            api::models::mappings::PatientDoctorsResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login and sessions"),
        (name = "patients", description = "Patient records. Admins manage all of them; a patient manages their own."),
        (name = "doctors", description = "Doctor records. Admins manage all of them; a doctor manages their own."),
        (name = "mappings", description = "Which doctors are assigned to which patients"),
    ),
    info(
        title = "Clinic API",
        description = "Users, patients, doctors and their assignments behind role-based access control."
    )
)]
pub struct ApiDoc;
