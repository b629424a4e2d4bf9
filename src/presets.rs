//! Concrete forms built on the form model

use crate::state::{
    DerivationRule, ExclusivityGroup, FieldSpec, FieldValue, FormError, FormSchema, FormSession,
    Invariant, ProgrammingError, SessionContext, Validator,
};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Margin used when neither the record nor the config sets one
pub const DEFAULT_MARGIN_MINUTES: i64 = 15;

/// Longest margin a pointing hour may carry
pub const MAX_MARGIN_MINUTES: i64 = 24 * 60;

/// Longest role name
pub const ROLE_NAME_MAX: usize = 64;

/// The forms this crate ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    #[default]
    PointingHour,
    OrganizationAssignment,
    Role,
}

impl FormKind {
    pub const ALL: [FormKind; 3] = [
        FormKind::PointingHour,
        FormKind::OrganizationAssignment,
        FormKind::Role,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::PointingHour => "Pointing hour",
            Self::OrganizationAssignment => "Organization assignment",
            Self::Role => "Role",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::PointingHour => "pointing_hour",
            Self::OrganizationAssignment => "organization_assignment",
            Self::Role => "role",
        }
    }

    pub fn schema(&self) -> Result<FormSchema, ProgrammingError> {
        match self {
            Self::PointingHour => pointing_hour(),
            Self::OrganizationAssignment => organization_assignment(),
            Self::Role => role(),
        }
    }

    /// Open a session with the defaults a fresh record of this kind gets
    pub fn open(
        &self,
        context: SessionContext,
        margin_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<FormSession, FormError> {
        let mut session = FormSession::new(self.schema()?, context)?;
        match self {
            Self::PointingHour => {
                let start = now.duration_trunc(TimeDelta::minutes(1)).unwrap_or(now);
                session.load_initial([
                    ("start_time", FieldValue::Instant(start)),
                    ("duration", FieldValue::Minutes(margin_minutes)),
                ])?;
            }
            Self::OrganizationAssignment => {
                let user = session.context().user_id.clone();
                if !user.is_empty() {
                    session.load_initial([("user", FieldValue::Text(user))])?;
                }
            }
            Self::Role => {}
        }
        Ok(session)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown form {0}")]
pub struct UnknownForm(pub String);

impl FromStr for FormKind {
    type Err = UnknownForm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| UnknownForm(s.to_string()))
    }
}

/// A labelled time range assigned to a class service or to a single person
pub fn pointing_hour() -> Result<FormSchema, ProgrammingError> {
    FormSchema::builder("pointing_hour")
        .field(FieldSpec::text("label", "Label").required())
        .field(FieldSpec::instant("start_time", "Start").required())
        .field(
            FieldSpec::minutes("duration", "Margin (min)")
                .validate(Validator::MaxMinutes(MAX_MARGIN_MINUTES)),
        )
        .field(FieldSpec::instant("end_time", "End").required())
        .field(FieldSpec::text("class_service", "Class service"))
        .field(FieldSpec::text("assignee", "Assignee"))
        .field(FieldSpec::text("validator", "Validator"))
        .rule(DerivationRule::time_span("start_time", "duration", "end_time"))
        .invariant(Invariant::strictly_after("end_time", "start_time"))
        .group(
            ExclusivityGroup::new("assignment", &["class_service", "assignee"])
                .dependent("validator")
                .require_one(),
        )
        .build()
}

/// Place a user in exactly one level of the organization tree
pub fn organization_assignment() -> Result<FormSchema, ProgrammingError> {
    FormSchema::builder("organization_assignment")
        .field(FieldSpec::text("user", "User").required())
        .field(FieldSpec::text("department", "Department"))
        .field(FieldSpec::text("sub_department", "Sub-department"))
        .field(FieldSpec::text("third_level_department", "Third-level department"))
        .field(FieldSpec::text("supervisor_unit", "Supervising unit"))
        .field(FieldSpec::text("supervisor_user", "Supervising user"))
        .field(FieldSpec::text("validator", "Validator"))
        .group(
            ExclusivityGroup::new(
                "department",
                &["department", "sub_department", "third_level_department"],
            )
            .dependent("validator"),
        )
        .group(
            ExclusivityGroup::new("supervisor", &["supervisor_unit", "supervisor_user"])
                .dependent("validator"),
        )
        .build()
}

/// A named permission set scoped to the organization or one unit
pub fn role() -> Result<FormSchema, ProgrammingError> {
    FormSchema::builder("role")
        .field(
            FieldSpec::text("name", "Name")
                .required()
                .validate(Validator::MaxLength(ROLE_NAME_MAX)),
        )
        .field(FieldSpec::text("organization_scope", "Organization scope"))
        .field(FieldSpec::text("unit_scope", "Unit scope"))
        .field(FieldSpec::list("permissions", "Permissions").validate(Validator::MinItems(1)))
        .group(
            ExclusivityGroup::new("scope", &["organization_scope", "unit_scope"])
                .dependent("permissions"),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ErrorKind, FieldError, FieldKind, FormError, TriadState, ViolationKind};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn ctx() -> SessionContext {
        SessionContext {
            user_id: "u-42".into(),
            display_name: "Ada".into(),
            organization_id: Some("org-1".into()),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 30).unwrap()
    }

    #[test]
    fn test_every_schema_builds() {
        for kind in FormKind::ALL {
            assert!(kind.schema().is_ok(), "{kind} schema");
        }
    }

    #[test]
    fn test_kind_round_trips_through_slug() {
        for kind in FormKind::ALL {
            assert_eq!(kind.slug().parse::<FormKind>(), Ok(kind));
        }
        assert!("timesheet".parse::<FormKind>().is_err());
    }

    mod pointing_hour {
        use super::*;
        use pretty_assertions::assert_eq;

        fn open() -> FormSession {
            FormKind::PointingHour.open(ctx(), 30, now()).unwrap()
        }

        #[test]
        fn test_opens_with_start_margin_and_derived_end() {
            let session = open();
            let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
            assert_eq!(session.value("start_time"), &FieldValue::Instant(start));
            assert_eq!(
                session.value("end_time"),
                &FieldValue::Instant(start + Duration::minutes(30))
            );
            assert_eq!(
                session.triad_state("end_time"),
                Some(TriadState::StartAndDuration)
            );
        }

        #[test]
        fn test_fresh_form_lists_missing_fields() {
            let session = open();
            assert_eq!(
                session.errors(),
                vec![
                    FieldError::new("label", ErrorKind::Required),
                    FieldError::new(
                        "class_service",
                        ErrorKind::OneOfRequired {
                            group: "class_service/assignee".into()
                        }
                    ),
                ]
            );
        }

        #[test]
        fn test_complete_form_is_submittable() {
            let mut session = open();
            session.patch("label", FieldValue::text("Morning shift")).unwrap();
            session.patch("assignee", FieldValue::text("u-7")).unwrap();
            assert!(!session.is_submittable());
            assert_eq!(
                session.errors(),
                vec![FieldError::new("validator", ErrorKind::Required)]
            );
            session.patch("validator", FieldValue::text("u-1")).unwrap();
            assert!(session.is_submittable());
            assert!(!session.field("class_service").unwrap().enabled);
        }

        #[test]
        fn test_margin_over_a_day_is_invalid() {
            let mut session = open();
            session
                .patch("duration", FieldValue::minutes(MAX_MARGIN_MINUTES + 1))
                .unwrap();
            assert!(session
                .errors()
                .iter()
                .any(|e| e.field == "duration" && matches!(e.kind, ErrorKind::Invalid { .. })));
        }

        #[test]
        fn test_typed_margin_past_the_calendar_is_a_violation() {
            let mut session = open();
            let typed = FieldValue::parse(FieldKind::Minutes, "999999999999999").unwrap();
            let err = session.patch("duration", typed.clone()).unwrap_err();
            match err {
                FormError::Constraint(v) => {
                    assert_eq!(v.kind, ViolationKind::OutOfDomain);
                    assert_eq!(v.field, "end_time");
                }
                other => panic!("expected a constraint violation, got {other:?}"),
            }
            assert!(!session.is_poisoned());
            assert_eq!(session.value("duration"), &typed);
            assert!(!session.is_submittable());
            assert!(session.errors().contains(&FieldError::new(
                "end_time",
                ErrorKind::Conflict {
                    with: "start_time".into()
                }
            )));

            session.patch("duration", FieldValue::minutes(45)).unwrap();
            assert!(session.errors().iter().all(|e| e.field != "end_time"));
        }

        #[test]
        fn test_opening_with_a_huge_margin_leaves_end_empty() {
            let session = FormKind::PointingHour
                .open(ctx(), 200_000_000_000, now())
                .unwrap();
            assert!(!session.is_poisoned());
            assert!(session.value("end_time").is_empty());
            assert!(session.errors().contains(&FieldError::new(
                "end_time",
                ErrorKind::Conflict {
                    with: "start_time".into()
                }
            )));
            assert!(!session.is_submittable());
        }
    }

    mod organization_assignment {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_user_defaults_to_acting_user() {
            let session = FormKind::OrganizationAssignment
                .open(ctx(), DEFAULT_MARGIN_MINUTES, now())
                .unwrap();
            assert_eq!(session.value("user"), &FieldValue::text("u-42"));
            assert!(!session.field("user").unwrap().touched_by_user);
        }

        #[test]
        fn test_validator_required_while_either_group_is_active() {
            let mut session = FormKind::OrganizationAssignment
                .open(ctx(), DEFAULT_MARGIN_MINUTES, now())
                .unwrap();
            session.activate("department", "sub_department").unwrap();
            session.activate("supervisor", "supervisor_user").unwrap();
            session.deactivate_all("department").unwrap();
            assert!(session.field("validator").unwrap().required_now);
            session.deactivate_all("supervisor").unwrap();
            assert!(!session.field("validator").unwrap().required_now);
            assert!(session.is_submittable());
        }
    }

    mod role {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_scoped_role_needs_permissions() {
            let mut session = FormKind::Role
                .open(ctx(), DEFAULT_MARGIN_MINUTES, now())
                .unwrap();
            session.patch("name", FieldValue::text("auditor")).unwrap();
            session
                .patch("unit_scope", FieldValue::text("unit-3"))
                .unwrap();
            assert_eq!(
                session.errors(),
                vec![FieldError::new("permissions", ErrorKind::Required)]
            );
            session
                .patch(
                    "permissions",
                    FieldValue::List(vec!["read".into(), "export".into()]),
                )
                .unwrap();
            assert!(session.is_submittable());
        }

        #[test]
        fn test_long_name_is_invalid() {
            let mut session = FormKind::Role
                .open(ctx(), DEFAULT_MARGIN_MINUTES, now())
                .unwrap();
            session
                .patch("name", FieldValue::text("x".repeat(ROLE_NAME_MAX + 1)))
                .unwrap();
            assert!(matches!(
                session.errors()[0].kind,
                ErrorKind::Invalid { .. }
            ));
        }
    }
}
