//! zsimview-core - browse periodic simulator statistics as tables.
//!
//! Provides:
//! - `container` - uniform read-only view over hierarchical stats files
//! - `classify` - leaf shape/type -> record shape
//! - `snapshot` - ordered snapshot index with phase/time previews
//! - `schema` - per-snapshot module -> record normalization
//! - `selection` - selection state machine across snapshots
//! - `view` - UI-agnostic grid model and the table materializer
//! - `session` - the open file, current snapshot and selection
//! - `config`, `error`, `fmt` - shared plumbing
//!
//! With `tui` feature (default):
//! - `tui` - terminal front end (ratatui/crossterm)

pub mod classify;
pub mod config;
pub mod container;
pub mod error;
pub mod fmt;
pub mod schema;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod view;

#[cfg(feature = "tui")]
pub mod tui;

pub use config::ViewerConfig;
pub use error::{SchemaWarning, SelectError, ViewerError};
pub use session::{Session, ViewState};
