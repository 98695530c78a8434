//! Role capabilities.
//!
//! Authorization is a static lookup: each `(role, resource, operation)` triple either maps to
//! an [`Access`] scope or is absent, and absence means deny. [`Access::Own`] grants are
//! completed by the caller with an ownership check against the stored row.

use crate::{
    api::models::users::{CurrentUser, Role},
    errors::Error,
    types::{Operation, Resource},
};

/// How far a granted capability reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Every record of the resource
    Any,
    /// Only the record owned by the principal
    Own,
}

use Access::{Any, Own};
use Operation::{Create, Delete, List, Read, Update};
use Resource::{Doctors, Mappings, Patients, Users};
use Role::{Admin, Doctor, Patient};

const CAPABILITIES: &[(Role, Resource, Operation, Access)] = &[
    (Admin, Users, Create, Any),
    (Admin, Patients, Create, Any),
    (Admin, Patients, Read, Any),
    (Admin, Patients, Update, Any),
    (Admin, Patients, Delete, Any),
    (Admin, Patients, List, Any),
    (Admin, Doctors, Create, Any),
    (Admin, Doctors, Read, Any),
    (Admin, Doctors, Update, Any),
    (Admin, Doctors, Delete, Any),
    (Admin, Doctors, List, Any),
    (Patient, Patients, Read, Own),
    (Patient, Patients, Update, Own),
    (Patient, Patients, Delete, Own),
    (Doctor, Doctors, Read, Own),
    (Doctor, Doctors, Update, Own),
    (Doctor, Doctors, Delete, Own),
    (Admin, Mappings, Create, Any),
    (Admin, Mappings, List, Any),
    (Admin, Mappings, Read, Any),
    (Doctor, Mappings, Read, Any),
    (Patient, Mappings, Read, Any),
];

/// Look up the access a role has for an operation, `None` if it has none.
pub fn access(role: Role, resource: Resource, operation: Operation) -> Option<Access> {
    CAPABILITIES
        .iter()
        .find(|(r, res, op, _)| *r == role && *res == resource && *op == operation)
        .map(|(_, _, _, access)| *access)
}

/// Like [`access`], but returns the 403 error for a missing capability.
pub fn require(user: &CurrentUser, resource: Resource, operation: Operation) -> Result<Access, Error> {
    access(user.role, resource, operation).ok_or(Error::InsufficientPermissions {
        action: operation,
        resource,
    })
}
