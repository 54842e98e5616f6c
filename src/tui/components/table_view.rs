//! # TableView Component
//!
//! Paints a [`Table`] into the area below the title bar: one header row,
//! then the newest rows that fit, oldest on top.
//!
//! Column widths come from [`Table::column_widths`] at the width of the
//! area being painted, so every paint picks up the current terminal size.
//! Each cell keeps one column of gutter; text that does not fit is cut
//! and marked with `…`.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::table::{Align, Cell, Header, Row, Table, Tone};
use crate::tui::component::Component;

const HEADER_HEIGHT: u16 = 1;
const GUTTER: u16 = 1;

pub struct TableView<'a> {
    pub table: &'a Table,
}

impl<'a> TableView<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// Rows that fit in `height` lines below the header.
    pub fn visible_rows(height: u16) -> usize {
        usize::from(height.saturating_sub(HEADER_HEIGHT))
    }
}

impl Component for TableView<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let widths = self.table.column_widths(area.width);
        let headers = self.table.headers();

        let header = widgets::Row::new(
            headers
                .iter()
                .zip(&widths)
                .map(|(header, &width)| header_cell(header, width)),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self
            .table
            .tail(Self::visible_rows(area.height))
            .map(|row| body_row(row, headers, &widths));

        let table = widgets::Table::new(rows, widths.iter().map(|&w| Constraint::Length(w)))
            .header(header)
            .column_spacing(0);
        frame.render_widget(table, area);
    }
}

fn header_cell(header: &Header, width: u16) -> widgets::Cell<'static> {
    let line = Line::from(fit(&header.title, text_width(width))).alignment(alignment(header.align));
    let mut style = Style::default();
    if let Some(tone) = header.tone {
        style = style.fg(color(tone));
    }
    widgets::Cell::from(line).style(style)
}

fn body_row(row: &Row, headers: &[Header], widths: &[u16]) -> widgets::Row<'static> {
    widgets::Row::new(
        row.cells
            .iter()
            .zip(headers)
            .zip(widths)
            .map(|((cell, header), &width)| body_cell(cell, header.align, width)),
    )
}

fn body_cell(cell: &Cell, align: Align, width: u16) -> widgets::Cell<'static> {
    let line = Line::from(fit(&cell.text, text_width(width))).alignment(alignment(align));
    let style = cell
        .tone
        .map(|tone| Style::default().fg(color(tone)))
        .unwrap_or_default();
    widgets::Cell::from(line).style(style)
}

fn text_width(column_width: u16) -> usize {
    usize::from(column_width.saturating_sub(GUTTER))
}

fn alignment(align: Align) -> Alignment {
    match align {
        Align::Left => Alignment::Left,
        Align::Center => Alignment::Center,
    }
}

fn color(tone: Tone) -> Color {
    match tone {
        Tone::Ok => Color::Green,
        Tone::Alert => Color::Red,
    }
}

/// Cuts `text` to at most `width` display columns, ending with `…` when
/// anything was dropped.
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
