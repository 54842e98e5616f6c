use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::state::TraceState;
use crate::tui::component::Component;
use crate::tui::components::{TableView, TitleBar};

pub fn draw_ui(frame: &mut Frame, state: &TraceState) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0)]);
    let [title_area, table_area] = layout.areas(frame.area());

    TitleBar::new(state.kind, state.received, state.phase).render(frame, title_area);
    TableView::new(&state.table).render(frame, table_area);
}

/// The table alone, filling the frame. Used for the copy left on the
/// normal screen after the session.
pub fn draw_table(frame: &mut Frame, state: &TraceState) {
    TableView::new(&state.table).render(frame, frame.area());
}
