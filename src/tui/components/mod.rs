//! # TUI Components
//!
//! Both components are stateless and props-based: they receive all data
//! as struct fields and render what they are given.
//!
//! - `TitleBar`: one status line naming the log, the event count, and the quit keys
//! - `TableView`: header row plus the newest buffered rows that fit
//!
//! ```text
//! components/
//! ├── mod.rs           (this file)
//! ├── title_bar.rs     (Top status bar)
//! └── table_view.rs    (Event table)
//! ```

mod table_view;
mod title_bar;

pub use table_view::TableView;
pub use title_bar::TitleBar;
