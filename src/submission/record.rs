//! The record handed to a [`super::SubmissionSink`]

use crate::presets::FormKind;
use crate::state::{FieldError, FormSession, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("form {form} is not submittable ({} error(s))", .errors.len())]
    NotSubmittable {
        form: FormKind,
        errors: Vec<FieldError>,
    },
    #[error("form {form} was abandoned after a programming error")]
    Poisoned { form: FormKind },
}

/// A snapshot of a submittable session with who submitted it and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub form: FormKind,
    pub submitted_by: String,
    pub organization_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub values: Snapshot,
}

impl Submission {
    pub fn from_session(
        form: FormKind,
        session: &FormSession,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, SubmissionError> {
        if session.is_poisoned() {
            return Err(SubmissionError::Poisoned { form });
        }
        if !session.is_submittable() {
            return Err(SubmissionError::NotSubmittable {
                form,
                errors: session.errors(),
            });
        }
        let context = session.context();
        Ok(Self {
            id: Uuid::new_v4(),
            form,
            submitted_by: context.user_id.clone(),
            organization_id: context.organization_id.clone(),
            submitted_at,
            values: session.snapshot(),
        })
    }
}
