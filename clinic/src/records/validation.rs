use crate::{
    db::models::{
        doctors::{DoctorCreateDBRequest, DoctorUpdateDBRequest},
        patients::{PatientCreateDBRequest, PatientUpdateDBRequest},
    },
    errors::{Error, Result},
    records::{AccountChanges, NewAccount},
};

/// Column widths of the `users`, `patients` and `doctors` tables
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 100;
pub const MAX_GENDER_LENGTH: usize = 10;
pub const MAX_SPECIALIZATION_LENGTH: usize = 100;

/// Field-level checks run before anything touches the database.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation {
            message: format!("{field} is required"),
        });
    }
    Ok(())
}

/// Counts characters, matching how Postgres measures `VARCHAR(n)`.
pub fn require_max_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::Validation {
            message: format!("{field} must be no more than {max} characters"),
        });
    }
    Ok(())
}

fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    require_non_blank(field, value)?;
    require_max_length(field, value, max)
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(value) => require_text(field, value, max),
        None => Ok(()),
    }
}

fn require_non_negative(field: &str, value: i32) -> Result<()> {
    if value < 0 {
        return Err(Error::Validation {
            message: format!("{field} cannot be negative"),
        });
    }
    Ok(())
}

impl Validate for NewAccount {
    fn validate(&self) -> Result<()> {
        require_text("name", &self.name, MAX_NAME_LENGTH)?;
        require_text("email", &self.email, MAX_EMAIL_LENGTH)?;
        require_non_blank("password", &self.password)
    }
}

impl Validate for AccountChanges {
    fn validate(&self) -> Result<()> {
        optional_text("name", self.name.as_deref(), MAX_NAME_LENGTH)
    }
}

impl Validate for PatientCreateDBRequest {
    fn validate(&self) -> Result<()> {
        require_non_negative("age", self.age)?;
        require_text("gender", &self.gender, MAX_GENDER_LENGTH)?;
        require_non_blank("medical_history", &self.medical_history)
    }
}

impl Validate for PatientUpdateDBRequest {
    fn validate(&self) -> Result<()> {
        if let Some(age) = self.age {
            require_non_negative("age", age)?;
        }
        optional_text("gender", self.gender.as_deref(), MAX_GENDER_LENGTH)
    }
}

impl Validate for DoctorCreateDBRequest {
    fn validate(&self) -> Result<()> {
        require_text("specialization", &self.specialization, MAX_SPECIALIZATION_LENGTH)?;
        require_non_negative("experience_years", self.experience_years)
    }
}

impl Validate for DoctorUpdateDBRequest {
    fn validate(&self) -> Result<()> {
        optional_text("specialization", self.specialization.as_deref(), MAX_SPECIALIZATION_LENGTH)?;
        if let Some(years) = self.experience_years {
            require_non_negative("experience_years", years)?;
        }
        Ok(())
    }
}
