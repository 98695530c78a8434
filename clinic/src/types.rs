//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, PatientId, etc.)
//! - Resource and operation enums for access control
//! - [`RecordId`] and [`JsonBody`], extractors that turn malformed input into validation errors
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases for readability:
//!
//! - [`UserId`]: User account identifier
//! - [`PatientId`]: Patient record identifier
//! - [`DoctorId`]: Doctor record identifier
//! - [`MappingId`]: Patient/doctor assignment identifier
//!
//! # Permission System
//!
//! Access decisions are made from two types:
//!
//! - [`Resource`]: What entity type is being accessed (Users, Patients, Doctors, Mappings)
//! - [`Operation`]: What action is being performed (Create, Read, Update, Delete, List)
//!
//! The table that maps a role onto these lives in [`crate::auth::permissions`].

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::errors::Error;

// Type aliases for IDs
pub type UserId = Uuid;
pub type PatientId = Uuid;
pub type DoctorId = Uuid;
pub type MappingId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Resource {
    Users,
    Patients,
    Doctors,
    Mappings,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::List => write!(f, "list"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Users => write!(f, "users"),
            Resource::Patients => write!(f, "patients"),
            Resource::Doctors => write!(f, "doctors"),
            Resource::Mappings => write!(f, "mappings"),
        }
    }
}

/// Single `{id}` path segment parsed as a UUID.
///
/// Axum's own `Path<Uuid>` rejects malformed ids with a plain-text body; this extractor
/// reports them through [`Error::Validation`] so clients always get the JSON error shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for RecordId {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::Validation {
                message: format!("Invalid path: {e}"),
            })?;

        parse_id(&raw).map(RecordId)
    }
}

/// JSON request body.
///
/// Wraps axum's `Json` so that a wrong content type, malformed JSON or a field of the wrong
/// type is answered with the usual `{message, error}` body and a 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| Error::Validation {
            message: rejection.body_text(),
        })?;

        Ok(JsonBody(value))
    }
}

/// Parse a textual id, rejecting anything that is not a UUID.
pub fn parse_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::Validation {
        message: format!("'{raw}' is not a valid id"),
    })
}
