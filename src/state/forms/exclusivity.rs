//! Exclusivity groups and the required-ness they cascade

use super::error::{ErrorKind, FieldError, ProgrammingError};
use super::field::FieldSet;
use std::collections::BTreeSet;

/// A set of fields of which at most one may be active at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusivityGroup {
    pub id: String,
    pub members: Vec<String>,
    /// Enabled and required while any member is active
    pub dependents: Vec<String>,
    /// One member must be set for the form to be submittable
    pub require_one: bool,
}

impl ExclusivityGroup {
    pub fn new(id: &str, members: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            dependents: Vec::new(),
            require_one: false,
        }
    }

    pub fn dependent(mut self, name: &str) -> Self {
        self.dependents.push(name.to_string());
        self
    }

    pub fn require_one(mut self) -> Self {
        self.require_one = true;
        self
    }

    fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m == name)
    }

    fn label(&self) -> String {
        self.members.join("/")
    }
}

#[derive(Debug, Default)]
pub struct ExclusivityController {
    groups: Vec<ExclusivityGroup>,
    /// Active member index per group
    active: Vec<Option<usize>>,
}

impl ExclusivityController {
    pub fn new(groups: Vec<ExclusivityGroup>) -> Self {
        let active = vec![None; groups.len()];
        Self { groups, active }
    }

    fn group_index(&self, id: &str) -> Result<usize, ProgrammingError> {
        self.groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| ProgrammingError::UnknownGroup { id: id.to_string() })
    }

    /// The active member of `group`, if any
    pub fn active_member(&self, group: &str) -> Option<&str> {
        let idx = self.groups.iter().position(|g| g.id == group)?;
        self.active[idx].map(|m| self.groups[idx].members[m].as_str())
    }

    /// Make `member` the sole active member of `group`. Siblings are
    /// disabled and cleared; dependents become enabled and required.
    pub fn activate(
        &mut self,
        fields: &mut FieldSet,
        group: &str,
        member: &str,
    ) -> Result<(), ProgrammingError> {
        let g = self.group_index(group)?;
        let m = self.groups[g]
            .member_index(member)
            .ok_or_else(|| ProgrammingError::NotAMember {
                group: group.to_string(),
                member: member.to_string(),
            })?;
        if self.active[g] != Some(m) {
            tracing::debug!("group {group}: {member} activated");
            self.active[g] = Some(m);
        }
        self.apply(fields);
        Ok(())
    }

    /// Re-enable every member of `group`. Dependents lose their
    /// required-ness only when no other group still demands them.
    pub fn deactivate_all(
        &mut self,
        fields: &mut FieldSet,
        group: &str,
    ) -> Result<(), ProgrammingError> {
        let g = self.group_index(group)?;
        if self.active[g].take().is_some() {
            tracing::debug!("group {group}: deactivated");
        }
        self.apply(fields);
        Ok(())
    }

    /// Route a user write on `name` into the groups it belongs to: a
    /// non-empty value activates it, emptying the active member deactivates
    /// its group.
    pub fn on_field_written(&mut self, fields: &mut FieldSet, name: &str) {
        let empty = fields.value(name).is_empty();
        let mut changed = false;
        for (g, group) in self.groups.iter().enumerate() {
            let Some(m) = group.member_index(name) else {
                continue;
            };
            if !empty && self.active[g] != Some(m) {
                tracing::debug!("group {}: {name} activated", group.id);
                self.active[g] = Some(m);
                changed = true;
            } else if empty && self.active[g] == Some(m) {
                tracing::debug!("group {}: deactivated", group.id);
                self.active[g] = None;
                changed = true;
            }
        }
        if changed {
            self.apply(fields);
        }
    }

    /// Derive active members from loaded values. When a record carries more
    /// than one member of a group, the first declared one wins.
    pub fn sync_from_values(&mut self, fields: &mut FieldSet) {
        for (g, group) in self.groups.iter().enumerate() {
            let set: Vec<usize> = group
                .members
                .iter()
                .enumerate()
                .filter(|(_, m)| !fields.value(m).is_empty())
                .map(|(i, _)| i)
                .collect();
            if set.len() > 1 {
                tracing::warn!(
                    "group {}: loaded record sets {} members, keeping {}",
                    group.id,
                    set.len(),
                    group.members[set[0]]
                );
            }
            self.active[g] = set.first().copied();
        }
        self.apply(fields);
    }

    /// Recompute `enabled` and `required_now` of every member and dependent
    /// from the active set. Disabling a field clears it.
    pub fn apply(&self, fields: &mut FieldSet) {
        let mut disabled = BTreeSet::new();
        let mut demanded = BTreeSet::new();
        let mut dependents = BTreeSet::new();

        for (group, active) in self.groups.iter().zip(&self.active) {
            dependents.extend(group.dependents.iter().map(String::as_str));
            if let Some(a) = active {
                disabled.extend(
                    group
                        .members
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| i != a)
                        .map(|(_, m)| m.as_str()),
                );
                demanded.extend(group.dependents.iter().map(String::as_str));
            }
        }

        for group in &self.groups {
            for name in &group.members {
                if let Some(field) = fields.get_mut(name) {
                    field.enabled = !disabled.contains(name.as_str());
                }
            }
        }
        for name in dependents {
            if let Some(field) = fields.get_mut(name) {
                let on = demanded.contains(name);
                field.enabled = on;
                field.required_now = field.required || on;
            }
        }

        for field in fields.iter_mut().filter(|f| !f.enabled) {
            field.clear();
            field.touched_by_user = false;
        }
    }

    /// Exclusivity and `require_one` failures of the current values
    pub fn errors(&self, fields: &FieldSet) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for group in &self.groups {
            let set: Vec<&String> = group
                .members
                .iter()
                .filter(|m| !fields.value(m).is_empty())
                .collect();
            for extra in set.iter().skip(1) {
                errors.push(FieldError::new(
                    extra,
                    ErrorKind::Exclusive { group: group.label() },
                ));
            }
            if group.require_one && set.is_empty() {
                if let Some(first) = group.members.first() {
                    errors.push(FieldError::new(
                        first,
                        ErrorKind::OneOfRequired { group: group.label() },
                    ));
                }
            }
        }
        errors
    }

    /// At most one non-empty member per group
    pub fn is_exclusive(&self, fields: &FieldSet) -> bool {
        self.groups.iter().all(|g| {
            g.members
                .iter()
                .filter(|m| !fields.value(m).is_empty())
                .count()
                <= 1
        })
    }
}
