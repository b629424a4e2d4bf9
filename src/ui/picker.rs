//! Form picker

use crate::app::App;
use checkin_form::presets::FormKind;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = FormKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let style = if i == app.state.selected_index {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let mut spans = vec![Span::styled(kind.label(), style)];
            if Some(*kind) == app.config.default_form {
                spans.push(Span::styled(
                    " (default)",
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Open a form ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_symbol("▸ ");

    // Keeps the selected item in view
    let mut list_state = ListState::default().with_selected(Some(app.state.selected_index));
    frame.render_stateful_widget(list, area, &mut list_state);
}
