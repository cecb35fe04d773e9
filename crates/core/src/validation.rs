//! Write-time validation for candidate records.
//!
//! Every validator is a pure function: callers resolve anything that needs
//! storage (such as whether the owning organization exists) beforehand and
//! pass it in. All failures of a record are collected so the caller sees
//! them at once.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::types::{NewOrganization, NewShift, NewVolunteer, ShiftWindow};

pub const FIELD_NAME: &str = "name";
pub const FIELD_ORGANIZATION: &str = "organization";
pub const FIELD_STARTS_AT: &str = "starts_at";
pub const FIELD_ENDS_AT: &str = "ends_at";

pub const REASON_BLANK: &str = "can't be blank";
pub const REASON_MUST_EXIST: &str = "must exist";
pub const REASON_ENDS_BEFORE_START: &str = "must be after starts_at";
pub const REASON_OUT_OF_RANGE: &str = "must fall between years 0000 and 9999";

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Non-empty collection of validation failures for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    fn empty() -> Self {
        Self(Vec::new())
    }

    fn push(&mut self, field: &'static str, reason: &str) {
        self.0.push(ValidationError::new(field, reason));
    }

    fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// All failures in the order they were detected.
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Returns the failure recorded for `field`, if any.
    pub fn on(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|error| error.field == field)
    }

    pub fn has_error_on(&self, field: &str) -> bool {
        self.on(field).is_some()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed: ")?;
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Timestamps are stored as four-digit-year text; outside that range the
/// stored order would no longer match time order.
fn is_storable(value: DateTime<Utc>) -> bool {
    (0..=9999).contains(&value.year())
}

/// Validates a candidate organization.
pub fn validate_organization(candidate: &NewOrganization) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::empty();
    if is_blank(&candidate.name) {
        errors.push(FIELD_NAME, REASON_BLANK);
    }
    errors.into_result()
}

/// Validates a candidate volunteer.
pub fn validate_volunteer(
    candidate: &NewVolunteer,
    organization_exists: bool,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::empty();
    if is_blank(&candidate.name) {
        errors.push(FIELD_NAME, REASON_BLANK);
    }
    if !organization_exists {
        errors.push(FIELD_ORGANIZATION, REASON_MUST_EXIST);
    }
    errors.into_result()
}

/// Validates a candidate shift and returns its window on success.
///
/// Presence is checked before ordering: when either timestamp is missing the
/// ordering rule is not evaluated. Timestamps outside years 0000..=9999 are
/// rejected on their own field.
pub fn validate_shift(
    candidate: &NewShift,
    organization_exists: bool,
) -> Result<ShiftWindow, ValidationErrors> {
    let mut errors = ValidationErrors::empty();

    match candidate.starts_at {
        None => errors.push(FIELD_STARTS_AT, REASON_BLANK),
        Some(value) if !is_storable(value) => errors.push(FIELD_STARTS_AT, REASON_OUT_OF_RANGE),
        Some(_) => {}
    }
    match candidate.ends_at {
        None => errors.push(FIELD_ENDS_AT, REASON_BLANK),
        Some(value) if !is_storable(value) => errors.push(FIELD_ENDS_AT, REASON_OUT_OF_RANGE),
        Some(_) => {}
    }

    let window = match (candidate.starts_at, candidate.ends_at) {
        (Some(starts_at), Some(ends_at)) => {
            if ends_at <= starts_at {
                errors.push(FIELD_ENDS_AT, REASON_ENDS_BEFORE_START);
            }
            Some(ShiftWindow { starts_at, ends_at })
        }
        _ => None,
    };

    if !organization_exists {
        errors.push(FIELD_ORGANIZATION, REASON_MUST_EXIST);
    }

    errors.into_result()?;
    // Both timestamps are present once no errors were recorded.
    window.ok_or_else(|| ValidationError::new(FIELD_STARTS_AT, REASON_BLANK).into())
}
