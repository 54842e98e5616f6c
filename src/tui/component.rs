use ratatui::Frame;
use ratatui::layout::Rect;

/// A reusable UI component.
///
/// Components receive their data via props (struct fields) and render
/// into a `Frame` within a given `Rect`. They never touch session state
/// directly; the caller builds them fresh from `TraceState` on every paint.
pub trait Component {
    /// Render the component into the given area.
    fn render(&mut self, frame: &mut Frame, area: Rect);
}
