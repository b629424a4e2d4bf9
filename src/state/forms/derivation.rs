//! Derivation engine
//!
//! A [`DerivationRule`] ties three fields together: an `anchor` and a `span`
//! that the user sets independently, and a `target` computed from them. The
//! canonical rule is the scheduling triad `start_time + duration = end_time`.
//!
//! The target is the convenience default until the user edits it. From then
//! on it is the field of record: anchor edits re-derive the span from the
//! target instead of overwriting it, and only a user edit of the span hands
//! control back to the computed target.
//!
//! Every user write produces at most one derived write per rule. Derived
//! writes never trigger further derivation.

use super::error::{ConstraintViolation, FormError, ProgrammingError, ViolationKind};
use super::field::{minutes_between, shift_minutes, FieldSet, FieldValue, Origin};
use std::collections::BTreeMap;
use std::fmt;

/// `(first, second) -> derived`, failing with the kind of domain violation
pub type DeriveFn = Box<dyn Fn(&FieldValue, &FieldValue) -> Result<FieldValue, ViolationKind>>;

/// A directed relationship `compute(anchor, span) = target`
pub struct DerivationRule {
    pub anchor: String,
    pub span: String,
    pub target: String,
    compute: DeriveFn,
    inverse: DeriveFn,
}

impl DerivationRule {
    /// `compute(anchor, span) -> target` and `inverse(target, anchor) -> span`
    pub fn new(
        anchor: &str,
        span: &str,
        target: &str,
        compute: impl Fn(&FieldValue, &FieldValue) -> Result<FieldValue, ViolationKind> + 'static,
        inverse: impl Fn(&FieldValue, &FieldValue) -> Result<FieldValue, ViolationKind> + 'static,
    ) -> Self {
        Self {
            anchor: anchor.to_string(),
            span: span.to_string(),
            target: target.to_string(),
            compute: Box::new(compute),
            inverse: Box::new(inverse),
        }
    }

    /// `target = anchor + span minutes`, with a strictly positive inverse
    pub fn time_span(anchor: &str, span: &str, target: &str) -> Self {
        Self::new(
            anchor,
            span,
            target,
            |start, minutes| match (start.as_instant(), minutes.as_minutes()) {
                (Some(start), Some(m)) if m >= 0 => shift_minutes(start, m)
                    .map(FieldValue::Instant)
                    .ok_or(ViolationKind::OutOfDomain),
                _ => Err(ViolationKind::OutOfDomain),
            },
            |end, start| match (end.as_instant(), start.as_instant()) {
                (Some(end), Some(start)) if end > start => {
                    Ok(FieldValue::Minutes(minutes_between(start, end)))
                }
                (Some(_), Some(_)) => Err(ViolationKind::NotAfter),
                _ => Err(ViolationKind::OutOfDomain),
            },
        )
    }

    pub fn involves(&self, name: &str) -> bool {
        self.anchor == name || self.span == name || self.target == name
    }
}

impl fmt::Debug for DerivationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationRule")
            .field("anchor", &self.anchor)
            .field("span", &self.span)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Where a rule's triad stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriadState {
    Unset,
    StartOnly,
    StartAndDuration,
    StartAndEndExplicit,
}

/// A write made by the engine rather than the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedWrite {
    pub field: String,
    pub value: FieldValue,
}

/// What a rule should do in reaction to a write
enum Step {
    Target,
    Span,
    Nothing,
}

#[derive(Debug, Default)]
pub struct DerivationEngine {
    rules: Vec<DerivationRule>,
    /// The field whose write is currently being propagated
    in_flight: Option<String>,
    /// Outstanding violations, keyed by rule index
    violations: BTreeMap<usize, ConstraintViolation>,
    last_writes: Vec<DerivedWrite>,
}

impl DerivationEngine {
    /// Fails if two rules claim the same target
    pub fn new(rules: Vec<DerivationRule>) -> Result<Self, ProgrammingError> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.target == rule.target) {
                return Err(ProgrammingError::ConflictingRules {
                    target: rule.target.clone(),
                });
            }
        }
        Ok(Self {
            rules,
            ..Default::default()
        })
    }

    /// Write `value` into `name` and propagate it through every rule
    /// involving `name`.
    ///
    /// `Err` means the write was rejected and nothing changed. `Ok(Some(_))`
    /// means the value was stored but a derivation it triggered was skipped
    /// because the result would leave its domain; the violation stays
    /// outstanding until a later derivation of the same rule succeeds.
    pub fn set_field(
        &mut self,
        fields: &mut FieldSet,
        name: &str,
        value: FieldValue,
        origin: Origin,
    ) -> Result<Option<ConstraintViolation>, FormError> {
        let field = fields
            .get_mut(name)
            .ok_or_else(|| ProgrammingError::UnknownField {
                name: name.to_string(),
            })?;
        if !value.fits(field.kind) {
            return Err(ProgrammingError::TypeMismatch {
                name: name.to_string(),
                expected: field.kind.label(),
            }
            .into());
        }
        if value.as_minutes().is_some_and(|m| m < 0) {
            return Err(ConstraintViolation::out_of_domain(name).into());
        }

        field.value = value;
        if origin == Origin::User {
            field.touched_by_user = true;
        }

        // A derived write never cascades
        if self.in_flight.is_some() {
            return Ok(None);
        }

        self.last_writes.clear();
        self.in_flight = Some(name.to_string());
        let mut first = None;
        let mut failure = None;
        for idx in 0..self.rules.len() {
            if !self.rules[idx].involves(name) {
                continue;
            }
            match self.propagate(fields, idx, name, origin) {
                Ok(Some(violation)) => {
                    first.get_or_insert(violation);
                }
                Ok(None) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.in_flight = None;
        match failure {
            Some(e) => Err(e),
            None => Ok(first),
        }
    }

    fn propagate(
        &mut self,
        fields: &mut FieldSet,
        idx: usize,
        name: &str,
        origin: Origin,
    ) -> Result<Option<ConstraintViolation>, FormError> {
        let rule = &self.rules[idx];
        let target_touched = fields.is_touched(&rule.target);

        let step = if name == rule.target {
            if origin == Origin::User && fields.value(&rule.target).is_empty() {
                // Clearing the target withdraws the user's opinion about it
                if let Some(f) = fields.get_mut(&rule.target) {
                    f.touched_by_user = false;
                }
                self.violations.remove(&idx);
                Step::Nothing
            } else if origin == Origin::User {
                Step::Span
            } else {
                Step::Nothing
            }
        } else if name == rule.span {
            if origin == Origin::User && target_touched {
                tracing::debug!("{} edited, {} is derived again", rule.span, rule.target);
                if let Some(f) = fields.get_mut(&rule.target) {
                    f.touched_by_user = false;
                }
                Step::Target
            } else if target_touched {
                Step::Nothing
            } else {
                Step::Target
            }
        } else if target_touched {
            Step::Span
        } else {
            Step::Target
        };

        self.run_step(fields, idx, step)
    }

    fn run_step(
        &mut self,
        fields: &mut FieldSet,
        idx: usize,
        step: Step,
    ) -> Result<Option<ConstraintViolation>, FormError> {
        let rule = &self.rules[idx];
        let (out, result) = match step {
            Step::Nothing => return Ok(None),
            Step::Target => {
                let (a, s) = (fields.value(&rule.anchor), fields.value(&rule.span));
                if a.is_empty() || s.is_empty() {
                    self.violations.remove(&idx);
                    return Ok(None);
                }
                (rule.target.clone(), (rule.compute)(a, s))
            }
            Step::Span => {
                let (t, a) = (fields.value(&rule.target), fields.value(&rule.anchor));
                if t.is_empty() || a.is_empty() {
                    self.violations.remove(&idx);
                    return Ok(None);
                }
                (rule.span.clone(), (rule.inverse)(t, a))
            }
        };

        match result {
            Ok(value) => {
                self.violations.remove(&idx);
                self.write_derived(fields, &out, value)?;
                Ok(None)
            }
            Err(kind) => {
                let violation = ConstraintViolation {
                    kind,
                    field: rule.target.clone(),
                    conflicts_with: Some(rule.anchor.clone()),
                };
                tracing::warn!("derivation of {out} skipped: {violation}");
                self.violations.insert(idx, violation.clone());
                Ok(Some(violation))
            }
        }
    }

    fn write_derived(
        &mut self,
        fields: &mut FieldSet,
        name: &str,
        value: FieldValue,
    ) -> Result<(), FormError> {
        if self.in_flight.as_deref() == Some(name) {
            // Never overwrite the field whose change is being propagated
            return Ok(());
        }
        tracing::debug!("derived {name} = {value}");
        self.last_writes.push(DerivedWrite {
            field: name.to_string(),
            value: value.clone(),
        });
        match self.set_field(fields, name, value, Origin::System)? {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    /// Fill in whatever each rule can derive from a freshly loaded record:
    /// a missing target from anchor and span, or a missing span from target
    /// and anchor. Values present in the record are never overwritten.
    pub fn settle(&mut self, fields: &mut FieldSet) -> Result<(), FormError> {
        self.last_writes.clear();
        self.violations.clear();
        for idx in 0..self.rules.len() {
            let rule = &self.rules[idx];
            let step = match (
                fields.value(&rule.anchor).is_empty(),
                fields.value(&rule.span).is_empty(),
                fields.value(&rule.target).is_empty(),
            ) {
                (false, false, true) => Step::Target,
                (false, true, false) => Step::Span,
                _ => Step::Nothing,
            };
            self.in_flight = Some(rule.anchor.clone());
            let result = self.run_step(fields, idx, step);
            self.in_flight = None;
            result?;
        }
        Ok(())
    }

    /// Current state of the rule targeting `target`
    pub fn triad_state(&self, fields: &FieldSet, target: &str) -> Option<TriadState> {
        let rule = self.rules.iter().find(|r| r.target == target)?;
        let state = if fields.is_touched(&rule.target) {
            TriadState::StartAndEndExplicit
        } else if fields.value(&rule.anchor).is_empty() {
            TriadState::Unset
        } else if fields.value(&rule.span).is_empty() {
            TriadState::StartOnly
        } else {
            TriadState::StartAndDuration
        };
        Some(state)
    }

    pub fn violations(&self) -> impl Iterator<Item = &ConstraintViolation> {
        self.violations.values()
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Derived writes made by the most recent propagating call
    pub fn last_writes(&self) -> &[DerivedWrite] {
        &self.last_writes
    }
}
