//! Field rendering utilities for forms

use checkin_form::state::Field;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// One row of the field list: markers, label and current value
pub fn field_line(field: &Field, is_active: bool) -> Line<'static> {
    let label_style = match (is_active, field.enabled) {
        (true, _) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        (false, true) => Style::default(),
        (false, false) => Style::default().fg(Color::DarkGray),
    };
    let value_style = if field.enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    };

    let value = field.value.display_value();
    let value = if value.is_empty() {
        if field.enabled {
            "(empty)".to_string()
        } else {
            "(disabled)".to_string()
        }
    } else {
        value
    };

    Line::from(vec![
        Span::styled(markers(field), Style::default().fg(Color::Yellow)),
        Span::styled(format!("{:<24}", field.label), label_style),
        Span::styled(value, value_style),
    ])
}

/// `*` required now, `✎` edited by the user
fn markers(field: &Field) -> String {
    let required = if field.required_now { '*' } else { ' ' };
    let touched = if field.touched_by_user { '✎' } else { ' ' };
    format!("{required}{touched} ")
}

/// Draw the input box for the selected field
pub fn draw_input(frame: &mut Frame, area: Rect, field: &Field, input: &str) {
    let (border, hint) = if field.enabled {
        (Color::Cyan, field.kind.label())
    } else {
        (Color::DarkGray, "disabled")
    };

    let content = Paragraph::new(Line::from(vec![
        Span::styled(input.to_string(), Style::default().fg(Color::Cyan)),
        Span::styled("▌", Style::default().fg(Color::Cyan)),
    ]));

    let block = Block::default()
        .title(format!(" {} ({hint}) ", field.label))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    frame.render_widget(content.wrap(Wrap { trim: false }).block(block), area);
}
