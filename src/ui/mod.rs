//! UI module for rendering the TUI

mod dialog;
mod forms;
mod layout;
mod picker;

use crate::app::App;
use checkin_form::state::View;
use ratatui::Frame;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let main_area = layout::create_layout(frame.area());

    match app.state.current_view {
        View::FormPicker => picker::draw(frame, main_area, app),
        View::Form => forms::draw_session(frame, main_area, app),
    }

    layout::draw_status_bar(frame, app);

    if let Some(message) = app.state.current_error() {
        dialog::render_error_dialog(frame, message);
    }
}
