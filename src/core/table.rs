//! # Table Model
//!
//! Column definitions and the buffer of rows waiting to be painted.
//! Layout math lives here too so it can be tested without a terminal;
//! the ratatui painter in `tui::components::table_view` only turns the
//! numbers into widgets.
//!
//! ```text
//! Table
//! ├── headers: Vec<Header>     // fixed count, widths configurable before first draw
//! ├── rows: VecDeque<Row>      // FIFO, oldest first
//! └── history: usize           // rows kept before the oldest is evicted
//! ```

use std::collections::VecDeque;

/// Number of rows a table keeps when no history is configured.
pub const DEFAULT_HISTORY: usize = 1000;

// Absorbs f32 representation error so 0.12 * 100 floors to 12, not 11.
const WIDTH_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// Semantic color of a cell. The painter picks the concrete color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Ok,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub tone: Option<Tone>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: None,
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub title: String,
    /// Fraction of the terminal width, 0.0..=1.0.
    pub width: f32,
    pub align: Align,
    pub tone: Option<Tone>,
}

impl Header {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: 0.0,
            align: Align::Left,
            tone: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<Header>,
    rows: VecDeque<Row>,
    history: usize,
}

impl Table {
    /// Creates a table with one column per title. Widths are split evenly
    /// until a caller configures them through [`Table::headers_mut`].
    pub fn new<I, S>(titles: I, history: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut headers: Vec<Header> = titles.into_iter().map(Header::new).collect();
        let even = 1.0 / headers.len().max(1) as f32;
        for header in &mut headers {
            header.width = even;
        }
        Self {
            headers,
            rows: VecDeque::new(),
            history: history.max(1),
        }
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut [Header] {
        &mut self.headers
    }

    /// Appends a row, evicting the oldest one once `history` is reached.
    ///
    /// Rows with the wrong number of cells are padded with empty cells or
    /// cut, so every buffered row matches the header count.
    pub fn add_row(&mut self, mut row: Row) {
        let columns = self.headers.len();
        if row.len() != columns {
            log::warn!(
                "Row has {} cells but table has {} columns; adjusting",
                row.len(),
                columns
            );
            row.cells.resize_with(columns, || Cell::new(""));
        }
        if self.rows.len() == self.history {
            self.rows.pop_front();
        }
        self.rows.push_back(row);
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &Row> + DoubleEndedIterator {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The newest `count` rows, oldest first.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &Row> {
        self.rows.iter().skip(self.rows.len().saturating_sub(count))
    }

    /// Sum of all fractional column widths.
    pub fn total_width(&self) -> f32 {
        self.headers.iter().map(|h| h.width).sum()
    }

    /// Column widths in terminal cells for a terminal `total` cells wide.
    ///
    /// Each width is `floor(fraction * total)`, so the sum never exceeds
    /// `total` as long as the fractions sum to at most 1.0.
    pub fn column_widths(&self, total: u16) -> Vec<u16> {
        self.headers
            .iter()
            .map(|h| (h.width.clamp(0.0, 1.0) * f32::from(total) + WIDTH_EPSILON).floor() as u16)
            .collect()
    }
}
