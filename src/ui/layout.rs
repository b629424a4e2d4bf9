//! Layout components (content area and status bar)

use crate::app::App;
use crate::platform::{CLEAR_SHORTCUT, SUBMIT_SHORTCUT};
use checkin_form::state::View;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Split off the bottom line for the status bar
pub fn create_layout(area: Rect) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    chunks[0]
}

/// Draw the status bar
pub fn draw_status_bar(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let status_area = Rect {
        x: area.x,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", get_view_hints(app.state.current_view)),
        Style::default().fg(Color::White),
    )];

    if let Some(msg) = &app.state.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg, Style::default().fg(Color::Yellow)));
    }

    let user = &app.context.display_name;
    if !user.is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("@{user}"),
            Style::default().fg(Color::Blue),
        ));
    }

    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, status_area);
}

/// Get keyboard hints for the current view
fn get_view_hints(view: View) -> String {
    match view {
        View::FormPicker => "j/k:nav  Enter:open  Esc:quit".to_string(),
        View::Form => format!(
            "Tab:next  Enter:apply  {CLEAR_SHORTCUT}:clear  {SUBMIT_SHORTCUT}:submit  Esc:close"
        ),
    }
}
