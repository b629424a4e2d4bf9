//! Form errors
//!
//! Two disjoint kinds: a [`ConstraintViolation`] is a recoverable,
//! user-facing condition; a [`ProgrammingError`] is a defect in the host or
//! in the form schema and poisons the session it was raised through.

use serde::Serialize;
use std::fmt;

/// Everything a form session call can fail with
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),
    #[error(transparent)]
    Programming(#[from] ProgrammingError),
}

impl FormError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FormError::Constraint(_))
    }
}

/// What went wrong in a recoverable violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A derived span would be zero or negative
    NotAfter,
    /// A value outside its field's own domain, e.g. negative minutes
    OutOfDomain,
    /// A write to a field its exclusivity group has disabled
    Disabled,
}

/// A write or derivation that would leave a field outside its domain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ConstraintViolation {
    pub kind: ViolationKind,
    /// The field the rejected value belongs to
    pub field: String,
    /// The other field of the conflicting pair, when there is one
    pub conflicts_with: Option<String>,
}

impl ConstraintViolation {
    pub fn not_after(field: &str, conflicts_with: &str) -> Self {
        Self {
            kind: ViolationKind::NotAfter,
            field: field.to_string(),
            conflicts_with: Some(conflicts_with.to_string()),
        }
    }

    pub fn out_of_domain(field: &str) -> Self {
        Self {
            kind: ViolationKind::OutOfDomain,
            field: field.to_string(),
            conflicts_with: None,
        }
    }

    pub fn disabled(field: &str) -> Self {
        Self {
            kind: ViolationKind::Disabled,
            field: field.to_string(),
            conflicts_with: None,
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, &self.conflicts_with) {
            (ViolationKind::NotAfter, Some(other)) => {
                write!(f, "constraint violation: {} must be after {other}", self.field)
            }
            (ViolationKind::Disabled, _) => {
                write!(f, "constraint violation: {} is disabled", self.field)
            }
            (_, Some(other)) => write!(
                f,
                "constraint violation: {} conflicts with {other}",
                self.field
            ),
            (_, None) => write!(f, "constraint violation: {} is out of range", self.field),
        }
    }
}

/// Host or schema defects. Never shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgrammingError {
    #[error("patch called while a derivation was in progress")]
    ReentrantPatch,
    #[error("field {target} is the target of more than one derivation rule")]
    ConflictingRules { target: String },
    #[error("field {name} is declared more than once")]
    DuplicateField { name: String },
    #[error("unknown field {name}")]
    UnknownField { name: String },
    #[error("exclusivity group {id} is declared more than once")]
    DuplicateGroup { id: String },
    #[error("unknown exclusivity group {id}")]
    UnknownGroup { id: String },
    #[error("{member} is not a member of group {group}")]
    NotAMember { group: String, member: String },
    #[error("{member} cannot be both a member and a dependent of group {group}")]
    DependentIsMember { group: String, member: String },
    #[error("field {name} is used by a derivation rule and by exclusivity group {group}")]
    RuleFieldInGroup { name: String, group: String },
    #[error("field {name} expects a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("form session refused the call after an earlier programming error")]
    Poisoned,
}

/// Category of a displayed validation failure
///
/// Declaration order is display order for errors on the same field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// An outstanding derivation violation
    Conflict { with: String },
    Required,
    /// Value fails one of the field's validators
    Invalid { reason: String },
    /// The value must be strictly after another field's value
    NotAfter { other: String },
    /// More than one member of an exclusivity group is set
    Exclusive { group: String },
    /// None of the members of a `require_one` group is set
    OneOfRequired { group: String },
}

/// One entry of [`crate::state::FormSession::errors`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    #[serde(flatten)]
    pub kind: ErrorKind,
}

impl FieldError {
    pub fn new(field: &str, kind: ErrorKind) -> Self {
        Self {
            field: field.to_string(),
            kind,
        }
    }

    /// Short message for display next to the field
    pub fn message(&self) -> String {
        match &self.kind {
            ErrorKind::Conflict { with } => format!("conflicts with {with}"),
            ErrorKind::Required => "required".to_string(),
            ErrorKind::Invalid { reason } => reason.clone(),
            ErrorKind::NotAfter { other } => format!("must be after {other}"),
            ErrorKind::Exclusive { group } => format!("only one of {group} may be set"),
            ErrorKind::OneOfRequired { group } => format!("one of {group} is required"),
        }
    }
}
