//! The caller's requested change.

use common::SubjectId;
use serde::Serialize;

use crate::error::{Result, SagaError};

/// A request to set `field_name` of subject `subject_id` to `new_value`
/// everywhere the value is stored.
///
/// Construction validates the constraints, so every `SagaIntent` in
/// circulation has a positive subject ID and a non-blank value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaIntent {
    subject_id: SubjectId,
    field_name: String,
    new_value: String,
}

impl SagaIntent {
    /// Validates and creates an intent from raw input.
    pub fn new(
        subject_id: i64,
        field_name: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Result<Self> {
        let subject_id = SubjectId::new(subject_id).ok_or_else(|| {
            SagaError::InvalidIntent(format!("subject id must be positive, got {subject_id}"))
        })?;
        Self::for_subject(subject_id, field_name, new_value)
    }

    /// Creates an intent for an already validated subject ID.
    pub fn for_subject(
        subject_id: SubjectId,
        field_name: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Result<Self> {
        let field_name = field_name.into();
        let new_value = new_value.into();

        if field_name.trim().is_empty() {
            return Err(SagaError::InvalidIntent(
                "field name must not be empty".to_string(),
            ));
        }
        if new_value.trim().is_empty() {
            return Err(SagaError::InvalidIntent(format!(
                "new value for '{field_name}' must not be empty"
            )));
        }

        Ok(Self {
            subject_id,
            field_name,
            new_value,
        })
    }

    /// Returns the subject undergoing the change.
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    /// Returns the name of the field being changed.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Returns the requested value.
    pub fn new_value(&self) -> &str {
        &self.new_value
    }
}
