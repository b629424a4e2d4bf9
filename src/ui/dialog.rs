//! Error dialog overlay

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const MAX_WIDTH: u16 = 60;

/// Render an error dialog centered on the screen
pub fn render_error_dialog(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let width = MAX_WIDTH.min(area.width);
    let inner_width = width.saturating_sub(4).max(1);
    // title + blank + message + blank + hint + borders
    let height = (wrapped_height(message, inner_width as usize) + 6).min(area.height);

    let dialog_area = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, dialog_area);

    let key = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let content = vec![
        Line::from(Span::styled(
            "Error",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("Enter", key),
            Span::raw(" or "),
            Span::styled("Esc", key),
            Span::raw(" to dismiss"),
        ]),
    ];

    let dialog = Paragraph::new(content).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(dialog, dialog_area);
}

/// Lines `text` needs at `width` columns, counted by characters
fn wrapped_height(text: &str, width: usize) -> u16 {
    text.split('\n')
        .map(|line| line.chars().count().max(1).div_ceil(width))
        .sum::<usize>() as u16
}
