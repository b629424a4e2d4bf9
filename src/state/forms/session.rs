//! Form session facade
//!
//! One [`FormSession`] per open form. It owns every field for its lifetime;
//! hosts pass an initial record in with [`FormSession::load_initial`] and read
//! the result out with [`FormSession::snapshot`].

use super::derivation::{DerivationEngine, DerivedWrite, TriadState};
use super::error::{ConstraintViolation, FieldError, FormError, ProgrammingError};
use super::exclusivity::ExclusivityController;
use super::field::{Field, FieldSet, FieldValue, Origin};
use super::schema::FormSchema;
use super::validity::{collect_errors, Invariant, Validator};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Who is editing, injected once at construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub display_name: String,
    pub organization_id: Option<String>,
}

/// `{name: value}` for every field, disabled ones included
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, FieldValue>);

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Snapshot(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug)]
pub struct FormSession {
    name: String,
    context: SessionContext,
    fields: FieldSet,
    validators: Vec<(String, Vec<Validator>)>,
    invariants: Vec<Invariant>,
    engine: DerivationEngine,
    exclusivity: ExclusivityController,
    poisoned: bool,
}

impl FormSession {
    pub fn new(schema: FormSchema, context: SessionContext) -> Result<Self, ProgrammingError> {
        let mut fields = FieldSet::default();
        let mut validators = Vec::new();
        for spec in schema.fields {
            if !spec.validators.is_empty() {
                validators.push((spec.field.name.clone(), spec.validators));
            }
            let name = spec.field.name.clone();
            if !fields.insert(spec.field) {
                return Err(ProgrammingError::DuplicateField { name });
            }
        }
        let engine = DerivationEngine::new(schema.rules)?;
        let exclusivity = ExclusivityController::new(schema.groups);
        exclusivity.apply(&mut fields);

        tracing::debug!("form session {} opened for {}", schema.name, context.user_id);
        Ok(Self {
            name: schema.name,
            context,
            fields,
            validators,
            invariants: schema.invariants,
            engine,
            exclusivity,
            poisoned: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    fn ensure_live(&self) -> Result<(), FormError> {
        if self.poisoned {
            return Err(ProgrammingError::Poisoned.into());
        }
        Ok(())
    }

    /// Programming errors poison the session; violations pass through
    fn fail(&mut self, error: FormError) -> FormError {
        if let FormError::Programming(e) = &error {
            tracing::error!("form session {} poisoned: {e}", self.name);
            self.poisoned = true;
        }
        error
    }

    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Populate fields from a loaded record. Values are written with system
    /// origin, missing dependents are derived, group activity follows the
    /// values, and every touch flag is cleared afterwards.
    ///
    /// Nothing is written unless every value is acceptable.
    pub fn load_initial<K, I>(&mut self, values: I) -> Result<(), FormError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        self.ensure_live()?;
        let values: Vec<(K, FieldValue)> = values.into_iter().collect();
        for (name, value) in &values {
            if let Err(e) = self.check_value(name.as_ref(), value) {
                return Err(self.fail(e));
            }
        }

        for (name, value) in values {
            if let Some(field) = self.fields.get_mut(name.as_ref()) {
                field.value = value;
            }
        }
        if let Err(e) = self.engine.settle(&mut self.fields) {
            return Err(self.fail(e));
        }
        self.exclusivity.sync_from_values(&mut self.fields);
        for field in self.fields.iter_mut() {
            field.touched_by_user = false;
        }
        tracing::debug!("form session {} loaded {} fields", self.name, self.fields.len());
        Ok(())
    }

    fn check_value(&self, name: &str, value: &FieldValue) -> Result<(), FormError> {
        let field = self
            .fields
            .get(name)
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
        Ok(())
    }

    /// The only user-facing write path: derive linked fields, then update
    /// group activity and required-ness.
    pub fn patch(&mut self, name: &str, value: FieldValue) -> Result<(), FormError> {
        self.ensure_live()?;
        match self.fields.get(name) {
            None => {
                let e = ProgrammingError::UnknownField {
                    name: name.to_string(),
                };
                return Err(self.fail(e.into()));
            }
            Some(field) if !field.enabled => {
                return Err(ConstraintViolation::disabled(name).into());
            }
            Some(_) => {}
        }

        let violation = match self
            .engine
            .set_field(&mut self.fields, name, value, Origin::User)
        {
            Ok(v) => v,
            Err(e) => return Err(self.fail(e)),
        };
        self.exclusivity.on_field_written(&mut self.fields, name);

        match violation {
            Some(v) => Err(v.into()),
            None => Ok(()),
        }
    }

    pub fn activate(&mut self, group: &str, member: &str) -> Result<(), FormError> {
        self.ensure_live()?;
        self.exclusivity
            .activate(&mut self.fields, group, member)
            .map_err(|e| self.fail(e.into()))
    }

    pub fn deactivate_all(&mut self, group: &str) -> Result<(), FormError> {
        self.ensure_live()?;
        self.exclusivity
            .deactivate_all(&mut self.fields, group)
            .map_err(|e| self.fail(e.into()))
    }

    /// Clear the touched flag of one field
    pub fn reset_touch(&mut self, name: &str) -> Result<(), FormError> {
        self.ensure_live()?;
        match self.fields.get_mut(name) {
            Some(field) => {
                field.touched_by_user = false;
                Ok(())
            }
            None => {
                let e = ProgrammingError::UnknownField {
                    name: name.to_string(),
                };
                Err(self.fail(e.into()))
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn value(&self, name: &str) -> &FieldValue {
        self.fields.value(name)
    }

    /// Ordered validation failures, stable for a given state
    pub fn errors(&self) -> Vec<FieldError> {
        collect_errors(
            &self.fields,
            &self.validators,
            &self.invariants,
            &self.engine,
            &self.exclusivity,
        )
    }

    pub fn is_submittable(&self) -> bool {
        !self.poisoned
            && !self.engine.has_violations()
            && self.exclusivity.is_exclusive(&self.fields)
            && self.errors().is_empty()
    }

    pub fn active_member(&self, group: &str) -> Option<&str> {
        self.exclusivity.active_member(group)
    }

    pub fn triad_state(&self, target: &str) -> Option<TriadState> {
        self.engine.triad_state(&self.fields, target)
    }

    /// Derived writes made by the most recent patch
    pub fn derived_writes(&self) -> &[DerivedWrite] {
        self.engine.last_writes()
    }
}

/// A session shared with callbacks through `Rc<RefCell<_>>`.
///
/// A `patch` that arrives while another call on the same session is still
/// running is refused with [`ProgrammingError::ReentrantPatch`], and the
/// session is poisoned once the outer call returns.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Rc<RefCell<FormSession>>,
    reentered: Rc<Cell<bool>>,
}

impl SharedSession {
    pub fn new(session: FormSession) -> Self {
        Self {
            inner: Rc::new(RefCell::new(session)),
            reentered: Rc::new(Cell::new(false)),
        }
    }

    pub fn patch(&self, name: &str, value: FieldValue) -> Result<(), FormError> {
        let Ok(mut session) = self.inner.try_borrow_mut() else {
            tracing::error!("reentrant patch of {name} refused");
            self.reentered.set(true);
            return Err(ProgrammingError::ReentrantPatch.into());
        };
        let result = session.patch(name, value);
        if self.reentered.replace(false) {
            session.poison();
            return Err(ProgrammingError::ReentrantPatch.into());
        }
        result
    }

    /// Read access; `None` while a mutation is in progress
    pub fn read<R>(&self, f: impl FnOnce(&FormSession) -> R) -> Option<R> {
        self.inner.try_borrow().ok().map(|s| f(&s))
    }
}
