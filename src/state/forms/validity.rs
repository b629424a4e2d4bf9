//! Per-field validators, cross-field invariants and error collection

use super::derivation::DerivationEngine;
use super::error::{ErrorKind, FieldError};
use super::exclusivity::ExclusivityController;
use super::field::{FieldSet, FieldValue};

/// A check on a single field's own value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// At most this many characters of text
    MaxLength(usize),
    /// At least this many list items
    MinItems(usize),
    /// At most this many minutes
    MaxMinutes(i64),
}

impl Validator {
    /// Returns the failure reason, if any. Empty values always pass; emptiness
    /// is the concern of required-ness.
    pub fn check(&self, value: &FieldValue) -> Option<String> {
        if value.is_empty() {
            return None;
        }
        match (self, value) {
            (Validator::MaxLength(max), FieldValue::Text(s)) if s.chars().count() > *max => {
                Some(format!("at most {max} characters"))
            }
            (Validator::MinItems(min), FieldValue::List(items)) if items.len() < *min => {
                Some(format!("at least {min} item(s)"))
            }
            (Validator::MaxMinutes(max), FieldValue::Minutes(m)) if m > max => {
                Some(format!("at most {max} minutes"))
            }
            _ => None,
        }
    }
}

/// A cross-field rule not expressible as a per-field validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invariant {
    /// `later` must hold an instant strictly after `earlier`
    StrictlyAfter { later: String, earlier: String },
}

impl Invariant {
    pub fn strictly_after(later: &str, earlier: &str) -> Self {
        Invariant::StrictlyAfter {
            later: later.to_string(),
            earlier: earlier.to_string(),
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            Invariant::StrictlyAfter { later, earlier } => vec![later.as_str(), earlier.as_str()],
        }
    }

    fn check(&self, fields: &FieldSet) -> Option<FieldError> {
        match self {
            Invariant::StrictlyAfter { later, earlier } => {
                let (Some(l), Some(e)) = (
                    fields.value(later).as_instant(),
                    fields.value(earlier).as_instant(),
                ) else {
                    return None;
                };
                if !fields.get(later).is_some_and(|f| f.enabled) || l > e {
                    return None;
                }
                Some(FieldError::new(
                    later,
                    ErrorKind::NotAfter {
                        other: earlier.clone(),
                    },
                ))
            }
        }
    }
}

/// Collect every validation failure of the current state, ordered by field
/// declaration and then by [`ErrorKind`].
pub fn collect_errors(
    fields: &FieldSet,
    validators: &[(String, Vec<Validator>)],
    invariants: &[Invariant],
    engine: &DerivationEngine,
    exclusivity: &ExclusivityController,
) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = engine
        .violations()
        .map(|v| {
            FieldError::new(
                &v.field,
                ErrorKind::Conflict {
                    with: v.conflicts_with.clone().unwrap_or_default(),
                },
            )
        })
        .collect();

    for field in fields.iter().filter(|f| f.enabled) {
        if field.required_now && field.is_empty() {
            errors.push(FieldError::new(&field.name, ErrorKind::Required));
        }
    }

    for (name, checks) in validators {
        let Some(field) = fields.get(name).filter(|f| f.enabled) else {
            continue;
        };
        for reason in checks.iter().filter_map(|v| v.check(&field.value)) {
            errors.push(FieldError::new(name, ErrorKind::Invalid { reason }));
        }
    }

    for error in invariants.iter().filter_map(|i| i.check(fields)) {
        // An outstanding derivation conflict already reports the same pair
        let duplicate = errors.iter().any(|e| {
            e.field == error.field
                && matches!((&e.kind, &error.kind),
                    (ErrorKind::Conflict { with }, ErrorKind::NotAfter { other }) if with == other)
        });
        if !duplicate {
            errors.push(error);
        }
    }

    errors.extend(exclusivity.errors(fields));

    errors.sort_by(|a, b| {
        let pa = fields.position(&a.field).unwrap_or(usize::MAX);
        let pb = fields.position(&b.field).unwrap_or(usize::MAX);
        pa.cmp(&pb).then_with(|| a.kind.cmp(&b.kind))
    });
    errors.dedup();
    errors
}
