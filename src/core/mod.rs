//! # Core Trace Logic
//!
//! This module contains kestrace's business logic.
//! It knows nothing about terminals or HTTP.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • TraceState           │
//!                    │  • Action (inputs)      │
//!                    │  • update() (reducer)   │
//!                    │  • format (event → row) │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │
//!                   ┌────────────┴────────────┐
//!                   ▼                         ▼
//!            ┌────────────┐            ┌────────────┐
//!            │    TUI     │            │   Line     │
//!            │  Adapter   │            │  output    │
//!            │ (ratatui)  │            │ (--json)   │
//!            └────────────┘            └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`event`]: `LogEvent`, the audit/error sum type decoded from the wire
//! - [`format`]: pure `LogEvent` → `Row` mapping
//! - [`table`]: headers, rows, and column layout math
//! - [`state`]: `TraceState`, everything a session owns
//! - [`action`]: the `Action` enum and the `update()` reducer
//! - [`config`]: settings resolution

pub mod action;
pub mod config;
pub mod event;
pub mod format;
pub mod state;
pub mod table;
