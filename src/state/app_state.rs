//! Host state for the terminal form editor

use super::forms::{FieldValue, FormError, FormSession};
use crate::presets::FormKind;

/// Current view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// List of forms to open
    #[default]
    FormPicker,
    /// Editing the open session
    Form,
}

/// What happened to the last committed input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// The input did not parse for the field's kind
    Unparsed(String),
    /// The session refused the value
    Rejected(FormError),
}

/// Main application state
#[derive(Debug, Default)]
pub struct AppState {
    // Navigation
    pub current_view: View,
    pub selected_index: usize,

    // Open form
    pub form_kind: Option<FormKind>,
    pub session: Option<FormSession>,
    pub active_form_field: usize,
    /// Text being typed into the active field
    pub input: String,

    // Messages
    pub status_message: Option<String>,
    error_queue: Vec<String>,
}

impl AppState {
    /// Move selection down
    pub fn move_selection_down(&mut self, max: usize) {
        if max > 0 && self.selected_index < max - 1 {
            self.selected_index += 1;
        }
    }

    /// Move selection up
    pub fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn selected_form(&self) -> FormKind {
        FormKind::ALL
            .get(self.selected_index)
            .copied()
            .unwrap_or_default()
    }

    /// Make `session` the open form and select its first field
    pub fn open_form(&mut self, kind: FormKind, session: FormSession) {
        self.form_kind = Some(kind);
        self.session = Some(session);
        self.active_form_field = 0;
        self.current_view = View::Form;
        self.reload_input();
    }

    /// Close the open form and return to the picker
    pub fn close_form(&mut self) {
        self.form_kind = None;
        self.session = None;
        self.active_form_field = 0;
        self.input.clear();
        self.current_view = View::FormPicker;
    }

    pub fn form_field_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.fields().count())
    }

    /// Name of the selected field
    pub fn active_field_name(&self) -> Option<String> {
        self.session
            .as_ref()?
            .fields()
            .nth(self.active_form_field)
            .map(|f| f.name.clone())
    }

    /// Move to next form field
    pub fn next_form_field(&mut self) {
        let count = self.form_field_count();
        if count == 0 {
            return;
        }
        self.active_form_field = (self.active_form_field + 1) % count;
        self.reload_input();
    }

    /// Move to previous form field
    pub fn prev_form_field(&mut self) {
        let count = self.form_field_count();
        if count == 0 {
            return;
        }
        if self.active_form_field == 0 {
            self.active_form_field = count - 1;
        } else {
            self.active_form_field -= 1;
        }
        self.reload_input();
    }

    /// Replace the input with the selected field's current value
    pub fn reload_input(&mut self) {
        self.input = self
            .session
            .as_ref()
            .and_then(|s| s.fields().nth(self.active_form_field))
            .map(|f| f.value.display_value())
            .unwrap_or_default();
    }

    pub fn form_input_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn form_backspace(&mut self) {
        self.input.pop();
    }

    /// Parse the input for the selected field and patch it into the session
    pub fn commit_input(&mut self) -> Option<CommitOutcome> {
        let session = self.session.as_mut()?;
        let field = session.fields().nth(self.active_form_field)?;
        let (name, kind) = (field.name.clone(), field.kind);

        let outcome = match FieldValue::parse(kind, &self.input) {
            Ok(value) => match session.patch(&name, value) {
                Ok(()) => CommitOutcome::Applied,
                Err(e) => CommitOutcome::Rejected(e),
            },
            Err(e) => CommitOutcome::Unparsed(e.to_string()),
        };
        self.after_commit(&outcome);
        Some(outcome)
    }

    /// Patch the selected field with an empty value
    pub fn clear_active_field(&mut self) -> Option<CommitOutcome> {
        let session = self.session.as_mut()?;
        let name = session.fields().nth(self.active_form_field)?.name.clone();
        let outcome = match session.patch(&name, FieldValue::Empty) {
            Ok(()) => CommitOutcome::Applied,
            Err(e) => CommitOutcome::Rejected(e),
        };
        self.after_commit(&outcome);
        Some(outcome)
    }

    fn after_commit(&mut self, outcome: &CommitOutcome) {
        match outcome {
            CommitOutcome::Applied => {
                self.status_message = None;
                self.reload_input();
            }
            CommitOutcome::Unparsed(reason) => {
                self.status_message = Some(reason.clone());
            }
            CommitOutcome::Rejected(FormError::Constraint(v)) => {
                self.status_message = Some(v.to_string());
                self.reload_input();
            }
            CommitOutcome::Rejected(FormError::Programming(e)) => {
                self.push_error(format!("This form can no longer be edited: {e}"));
            }
        }
    }

    /// Push an error message to the error queue for display
    pub fn push_error(&mut self, message: String) {
        self.error_queue.push(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.error_queue.is_empty()
    }

    pub fn current_error(&self) -> Option<&str> {
        self.error_queue.first().map(String::as_str)
    }

    /// Dismiss the oldest error
    pub fn dismiss_error(&mut self) {
        if !self.error_queue.is_empty() {
            self.error_queue.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionContext;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn with_form(kind: FormKind) -> AppState {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let session = kind.open(SessionContext::default(), 30, now).unwrap();
        let mut state = AppState::default();
        state.open_form(kind, session);
        state
    }

    fn select(state: &mut AppState, name: &str) {
        while state.active_field_name().as_deref() != Some(name) {
            state.next_form_field();
        }
    }

    fn type_text(state: &mut AppState, text: &str) {
        state.input.clear();
        text.chars().for_each(|c| state.form_input_char(c));
    }

    mod navigation {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_picker_selection_is_bounded() {
            let mut state = AppState::default();
            state.move_selection_up();
            assert_eq!(state.selected_form(), FormKind::PointingHour);
            for _ in 0..5 {
                state.move_selection_down(FormKind::ALL.len());
            }
            assert_eq!(state.selected_form(), FormKind::Role);
        }

        #[test]
        fn test_field_selection_wraps() {
            let mut state = with_form(FormKind::Role);
            state.prev_form_field();
            assert_eq!(state.active_field_name().as_deref(), Some("permissions"));
            state.next_form_field();
            assert_eq!(state.active_field_name().as_deref(), Some("name"));
        }

        #[test]
        fn test_selecting_a_field_loads_its_value() {
            let mut state = with_form(FormKind::PointingHour);
            select(&mut state, "duration");
            assert_eq!(state.input, "30 min");
            assert_eq!(state.commit_input(), Some(CommitOutcome::Applied));
        }

        #[test]
        fn test_close_form_returns_to_picker() {
            let mut state = with_form(FormKind::Role);
            state.close_form();
            assert_eq!(state.current_view, View::FormPicker);
            assert!(state.session.is_none());
        }
    }

    mod editing {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_commit_patches_and_derives() {
            let mut state = with_form(FormKind::PointingHour);
            select(&mut state, "end_time");
            type_text(&mut state, "2026-03-02 09:15");
            assert_eq!(state.commit_input(), Some(CommitOutcome::Applied));
            let session = state.session.as_ref().unwrap();
            assert_eq!(session.value("duration"), &FieldValue::minutes(75));
        }

        #[test]
        fn test_unparsable_input_keeps_buffer() {
            let mut state = with_form(FormKind::PointingHour);
            select(&mut state, "duration");
            type_text(&mut state, "soon");
            assert!(matches!(
                state.commit_input(),
                Some(CommitOutcome::Unparsed(_))
            ));
            assert_eq!(state.input, "soon");
            assert!(state.status_message.is_some());
        }

        #[test]
        fn test_violation_is_reported_in_status() {
            let mut state = with_form(FormKind::PointingHour);
            select(&mut state, "end_time");
            type_text(&mut state, "2026-03-02 07:00");
            assert!(matches!(
                state.commit_input(),
                Some(CommitOutcome::Rejected(FormError::Constraint(_)))
            ));
            assert_eq!(
                state.status_message.as_deref(),
                Some("constraint violation: end_time must be after start_time")
            );
            assert!(!state.has_errors());
        }

        #[test]
        fn test_clear_active_field() {
            let mut state = with_form(FormKind::PointingHour);
            select(&mut state, "assignee");
            type_text(&mut state, "u-7");
            state.commit_input();
            assert_eq!(
                state.session.as_ref().unwrap().active_member("assignment"),
                Some("assignee")
            );
            assert_eq!(state.clear_active_field(), Some(CommitOutcome::Applied));
            assert_eq!(
                state.session.as_ref().unwrap().active_member("assignment"),
                None
            );
            assert_eq!(state.input, "");
        }

        #[test]
        fn test_commit_without_form_does_nothing() {
            let mut state = AppState::default();
            assert_eq!(state.commit_input(), None);
        }
    }

    mod errors {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_error_queue_order() {
            let mut state = AppState::default();
            state.push_error("first".into());
            state.push_error("second".into());
            assert_eq!(state.current_error(), Some("first"));
            state.dismiss_error();
            assert_eq!(state.current_error(), Some("second"));
            state.dismiss_error();
            assert!(!state.has_errors());
        }
    }
}
