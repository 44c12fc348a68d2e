use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Field-level validation failure, surfaced to clients as a 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Generate a fresh document id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A flat document owned by one collection.
///
/// Records are created from client JSON with the identity fields left at
/// their defaults; the server then assigns `id`, `created_at` and
/// `updated_at` through [`Record::assign_identity`].
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Singular, human-readable name used in error messages
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    fn assign_identity(&mut self, id: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Carry server-managed or secret fields over from the stored version on update
    fn keep_server_fields(&mut self, _existing: &Self) {}
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(field, "must be a non-negative number"));
    }
    Ok(())
}
