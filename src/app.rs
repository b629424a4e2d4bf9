//! Application state and core logic

use crate::platform::is_shortcut;
use anyhow::Result;
use checkin_form::config::AppConfig;
use checkin_form::presets::FormKind;
use checkin_form::state::{AppState, SessionContext, View};
use checkin_form::submission::{submit_session, SubmissionError, SubmissionSink};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};

/// Main application struct
pub struct App {
    /// Current application state
    pub state: AppState,
    pub config: AppConfig,
    /// Acting user for every session this app opens
    pub context: SessionContext,
    sink: Box<dyn SubmissionSink>,
    /// Whether the app should quit
    quit: bool,
}

impl App {
    /// Create a new App instance with the configured form already open
    pub fn new(config: AppConfig, sink: Box<dyn SubmissionSink>) -> Self {
        let context = config.session_context();
        let mut app = Self {
            state: AppState::default(),
            config,
            context,
            sink,
            quit: false,
        };
        let form = app.config.form();
        app.state.selected_index = FormKind::ALL.iter().position(|k| *k == form).unwrap_or(0);
        if app.config.default_form.is_some() {
            app.open_form(form);
        }
        app
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    fn open_form(&mut self, kind: FormKind) {
        match kind.open(
            self.context.clone(),
            self.config.margin_minutes(),
            Utc::now(),
        ) {
            Ok(session) => {
                tracing::info!("opened {kind} form");
                self.state.open_form(kind, session);
            }
            Err(e) => {
                tracing::error!("could not open {kind} form: {e}");
                self.state.push_error(format!("Could not open {}: {e}", kind.label()));
            }
        }
    }

    /// Handle a key press
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle error dialog dismissal first (modal)
        if self.state.has_errors() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.state.dismiss_error();
                if self
                    .state
                    .session
                    .as_ref()
                    .is_some_and(|s| s.is_poisoned())
                {
                    self.state.close_form();
                }
            }
            return Ok(());
        }

        match self.state.current_view {
            View::FormPicker => self.handle_picker_key(key),
            View::Form => self.handle_form_key(key).await?,
        }
        Ok(())
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.state.move_selection_down(FormKind::ALL.len());
            }
            KeyCode::Up | KeyCode::Char('k') => self.state.move_selection_up(),
            KeyCode::Enter => self.open_form(self.state.selected_form()),
            KeyCode::Esc | KeyCode::Char('q') => self.quit = true,
            _ => {}
        }
    }

    async fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Tab | KeyCode::Down => self.state.next_form_field(),
            KeyCode::BackTab | KeyCode::Up => self.state.prev_form_field(),
            KeyCode::Char('s') if is_shortcut(key.modifiers) => self.submit().await,
            KeyCode::Char('d') if is_shortcut(key.modifiers) => {
                self.state.clear_active_field();
            }
            KeyCode::Esc => {
                self.state.status_message = None;
                self.state.close_form();
            }
            KeyCode::Enter => {
                self.state.commit_input();
            }
            KeyCode::Char(c) => self.state.form_input_char(c),
            KeyCode::Backspace => self.state.form_backspace(),
            _ => {}
        }
        Ok(())
    }

    /// Submit the open form through the sink. On success the form closes.
    async fn submit(&mut self) {
        let (Some(kind), Some(session)) = (self.state.form_kind, self.state.session.as_ref())
        else {
            return;
        };
        match submit_session(self.sink.as_ref(), kind, session).await {
            Ok((_, location)) => {
                self.state.close_form();
                self.state.status_message = Some(format!("Submitted to {location}"));
            }
            Err(e) => match e.downcast_ref::<SubmissionError>() {
                Some(SubmissionError::NotSubmittable { errors, .. }) => {
                    self.state.status_message =
                        Some(format!("Fix {} error(s) before submitting", errors.len()));
                }
                _ => {
                    tracing::error!("submission failed: {e:#}");
                    self.state.push_error(format!("Submission failed: {e:#}"));
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_form::state::FieldValue;
    use checkin_form::submission::Submission;
    use crossterm::event::KeyModifiers;
    use std::sync::{Arc, Mutex};

    /// Records what it receives
    #[derive(Default, Clone)]
    struct RecordingSink {
        received: Arc<Mutex<Vec<Submission>>>,
    }

    #[async_trait::async_trait]
    impl SubmissionSink for RecordingSink {
        async fn submit(&self, submission: &Submission) -> Result<String> {
            self.received.lock().unwrap().push(submission.clone());
            Ok("memory".to_string())
        }
    }

    fn app_with(form: Option<FormKind>) -> (App, RecordingSink) {
        let sink = RecordingSink::default();
        let config = AppConfig {
            default_form: form,
            user_id: Some("u-1".into()),
            ..Default::default()
        };
        (App::new(config, Box::new(sink.clone())), sink)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    async fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_starts_on_picker_without_default_form() {
        let (app, _) = app_with(None);
        assert_eq!(app.state.current_view, View::FormPicker);
        assert!(!app.should_quit());
    }

    #[tokio::test]
    async fn test_picker_opens_selected_form() {
        let (mut app, _) = app_with(None);
        app.handle_key(key(KeyCode::Char('j'))).await.unwrap();
        app.handle_key(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.state.current_view, View::Form);
        assert_eq!(app.state.form_kind, Some(FormKind::OrganizationAssignment));
    }

    #[tokio::test]
    async fn test_esc_on_picker_quits() {
        let (mut app, _) = app_with(None);
        app.handle_key(key(KeyCode::Esc)).await.unwrap();
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn test_fill_and_submit_role() {
        let (mut app, sink) = app_with(Some(FormKind::Role));
        assert_eq!(app.state.current_view, View::Form);

        type_str(&mut app, "auditor").await;
        app.handle_key(key(KeyCode::Enter)).await.unwrap();
        app.handle_key(ctrl('s')).await.unwrap();

        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].submitted_by, "u-1");
        assert_eq!(received[0].values.get("name"), Some(&FieldValue::text("auditor")));
        assert_eq!(app.state.current_view, View::FormPicker);
    }

    #[tokio::test]
    async fn test_incomplete_form_is_not_sent() {
        let (mut app, sink) = app_with(Some(FormKind::Role));
        app.handle_key(ctrl('s')).await.unwrap();
        assert!(sink.received.lock().unwrap().is_empty());
        assert_eq!(app.state.current_view, View::Form);
        assert_eq!(
            app.state.status_message.as_deref(),
            Some("Fix 1 error(s) before submitting")
        );
    }

    #[tokio::test]
    async fn test_ctrl_d_clears_selected_field() {
        let (mut app, _) = app_with(Some(FormKind::Role));
        type_str(&mut app, "auditor").await;
        app.handle_key(key(KeyCode::Enter)).await.unwrap();
        app.handle_key(ctrl('d')).await.unwrap();
        let session = app.state.session.as_ref().unwrap();
        assert!(session.value("name").is_empty());
    }
}
