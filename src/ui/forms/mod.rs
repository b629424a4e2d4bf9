//! Form session view: field list, input line and validation errors

mod field_renderer;

use crate::app::App;
use field_renderer::{draw_input, field_line};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn draw_session(frame: &mut Frame, area: Rect, app: &App) {
    let Some(session) = app.state.session.as_ref() else {
        return;
    };
    let title = match app.state.form_kind {
        Some(kind) => kind.label(),
        None => session.name(),
    };

    let errors = session.errors();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),                                  // Fields
            Constraint::Length(3),                               // Input
            Constraint::Length((errors.len() as u16 + 2).min(8)), // Errors
        ])
        .split(area);

    let items: Vec<ListItem> = session
        .fields()
        .enumerate()
        .map(|(i, f)| ListItem::new(field_line(f, i == app.state.active_form_field)))
        .collect();

    let (badge, badge_color) = if session.is_submittable() {
        ("ready", Color::Green)
    } else {
        ("incomplete", Color::Red)
    };
    let block = Block::default()
        .title(Line::from(vec![
            Span::raw(format!(" {title} ")),
            Span::styled(
                format!("[{badge}] "),
                Style::default()
                    .fg(badge_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut list_state = ListState::default().with_selected(Some(app.state.active_form_field));
    frame.render_stateful_widget(List::new(items).block(block), chunks[0], &mut list_state);

    if let Some(field) = session.fields().nth(app.state.active_form_field) {
        draw_input(frame, chunks[1], field, &app.state.input);
    }

    let lines: Vec<Line> = if errors.is_empty() {
        vec![Line::from(Span::styled(
            "No errors",
            Style::default().fg(Color::Green),
        ))]
    } else {
        errors
            .iter()
            .map(|e| {
                let label = session
                    .field(&e.field)
                    .map(|f| f.label.clone())
                    .unwrap_or_else(|| e.field.clone());
                Line::from(vec![
                    Span::styled(format!("{label}: "), Style::default().fg(Color::Red)),
                    Span::raw(e.message()),
                ])
            })
            .collect()
    };
    let errors_block = Block::default()
        .title(" Errors ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(errors_block),
        chunks[2],
    );
}
