//! Declarative description of a form
//!
//! A [`FormSchema`] is checked once, in [`FormSchemaBuilder::build`], so a
//! session never starts from an ambiguous schema.

use super::derivation::DerivationRule;
use super::error::ProgrammingError;
use super::exclusivity::ExclusivityGroup;
use super::field::{Field, FieldKind};
use super::validity::{Invariant, Validator};
use std::collections::HashSet;

/// One field declaration
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: Field,
    pub validators: Vec<Validator>,
}

impl FieldSpec {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            field: Field::new(name, label, kind),
            validators: Vec::new(),
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn instant(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Instant)
    }

    pub fn minutes(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Minutes)
    }

    pub fn list(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::List)
    }

    pub fn required(mut self) -> Self {
        self.field = self.field.required();
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }
}

#[derive(Debug)]
pub struct FormSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub rules: Vec<DerivationRule>,
    pub groups: Vec<ExclusivityGroup>,
    pub invariants: Vec<Invariant>,
}

impl FormSchema {
    pub fn builder(name: &str) -> FormSchemaBuilder {
        FormSchemaBuilder {
            schema: FormSchema {
                name: name.to_string(),
                fields: Vec::new(),
                rules: Vec::new(),
                groups: Vec::new(),
                invariants: Vec::new(),
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.field.name == name)
    }
}

pub struct FormSchemaBuilder {
    schema: FormSchema,
}

impl FormSchemaBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.schema.fields.push(spec);
        self
    }

    pub fn rule(mut self, rule: DerivationRule) -> Self {
        self.schema.rules.push(rule);
        self
    }

    pub fn group(mut self, group: ExclusivityGroup) -> Self {
        self.schema.groups.push(group);
        self
    }

    pub fn invariant(mut self, invariant: Invariant) -> Self {
        self.schema.invariants.push(invariant);
        self
    }

    /// Check every reference and the one-owner-per-target rule
    pub fn build(self) -> Result<FormSchema, ProgrammingError> {
        let schema = self.schema;
        let mut names = HashSet::new();
        for spec in &schema.fields {
            if !names.insert(spec.field.name.as_str()) {
                return Err(ProgrammingError::DuplicateField {
                    name: spec.field.name.clone(),
                });
            }
        }

        let known = |name: &str| -> Result<(), ProgrammingError> {
            if names.contains(name) {
                Ok(())
            } else {
                Err(ProgrammingError::UnknownField {
                    name: name.to_string(),
                })
            }
        };

        let mut targets = HashSet::new();
        for rule in &schema.rules {
            known(rule.anchor.as_str())?;
            known(rule.span.as_str())?;
            known(rule.target.as_str())?;
            if !targets.insert(rule.target.as_str()) {
                return Err(ProgrammingError::ConflictingRules {
                    target: rule.target.clone(),
                });
            }
        }

        let mut group_ids = HashSet::new();
        for group in &schema.groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(ProgrammingError::DuplicateGroup {
                    id: group.id.clone(),
                });
            }
            for name in group.members.iter().chain(&group.dependents) {
                known(name.as_str())?;
            }
            if let Some(dep) = group.dependents.iter().find(|d| group.members.contains(*d)) {
                return Err(ProgrammingError::DependentIsMember {
                    group: group.id.clone(),
                    member: dep.clone(),
                });
            }
        }

        // Derived writes never consult `enabled`, so a rule field must stay
        // outside every group
        for rule in &schema.rules {
            for name in [&rule.anchor, &rule.span, &rule.target] {
                let owner = schema
                    .groups
                    .iter()
                    .find(|g| g.members.contains(name) || g.dependents.contains(name));
                if let Some(group) = owner {
                    return Err(ProgrammingError::RuleFieldInGroup {
                        name: name.clone(),
                        group: group.id.clone(),
                    });
                }
            }
        }

        for invariant in &schema.invariants {
            for name in invariant.fields() {
                known(name)?;
            }
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> FormSchemaBuilder {
        FormSchema::builder("test")
            .field(FieldSpec::instant("start_time", "Start"))
            .field(FieldSpec::minutes("duration", "Margin"))
            .field(FieldSpec::instant("end_time", "End"))
    }

    #[test]
    fn test_valid_schema_builds() {
        let schema = base()
            .rule(DerivationRule::time_span("start_time", "duration", "end_time"))
            .invariant(Invariant::strictly_after("end_time", "start_time"))
            .build()
            .unwrap();
        assert_eq!(schema.fields.len(), 3);
        assert!(schema.field("duration").is_some());
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let err = base()
            .field(FieldSpec::text("duration", "Again"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProgrammingError::DuplicateField {
                name: "duration".into()
            }
        );
    }

    #[test]
    fn test_two_rules_claiming_one_target_are_rejected() {
        let err = base()
            .field(FieldSpec::minutes("pause", "Pause"))
            .rule(DerivationRule::time_span("start_time", "duration", "end_time"))
            .rule(DerivationRule::time_span("start_time", "pause", "end_time"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProgrammingError::ConflictingRules {
                target: "end_time".into()
            }
        );
    }

    #[test]
    fn test_rule_on_unknown_field_is_rejected() {
        let err = base()
            .rule(DerivationRule::time_span("start_time", "margin", "end_time"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProgrammingError::UnknownField {
                name: "margin".into()
            }
        );
    }

    #[test]
    fn test_group_dependent_cannot_be_member() {
        let err = base()
            .field(FieldSpec::text("unit", "Unit"))
            .group(ExclusivityGroup::new("g", &["unit"]).dependent("unit"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProgrammingError::DependentIsMember {
                group: "g".into(),
                member: "unit".into()
            }
        );
    }

    #[test]
    fn test_rule_field_cannot_be_group_member() {
        let err = base()
            .field(FieldSpec::instant("deadline", "Deadline"))
            .rule(DerivationRule::time_span("start_time", "duration", "end_time"))
            .group(ExclusivityGroup::new("finish", &["end_time", "deadline"]))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProgrammingError::RuleFieldInGroup {
                name: "end_time".into(),
                group: "finish".into()
            }
        );
    }

    #[test]
    fn test_rule_field_cannot_be_group_dependent() {
        let err = base()
            .field(FieldSpec::text("unit", "Unit"))
            .field(FieldSpec::text("user", "User"))
            .rule(DerivationRule::time_span("start_time", "duration", "end_time"))
            .group(ExclusivityGroup::new("assignment", &["unit", "user"]).dependent("duration"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProgrammingError::RuleFieldInGroup {
                name: "duration".into(),
                group: "assignment".into()
            }
        );
    }

    #[test]
    fn test_required_spec_sets_both_flags() {
        let spec = FieldSpec::text("label", "Label").required();
        assert!(spec.field.required);
        assert!(spec.field.required_now);
    }
}
