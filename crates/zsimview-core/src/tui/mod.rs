//! Terminal front end.
//!
//! Three panes (snapshots, modules, grid) driven entirely by the
//! [`ViewState`](crate::session::ViewState) of a session.

mod app;
mod event;
mod input;
mod navigable;
mod render;
pub(crate) mod state;
pub(crate) mod style;
mod widgets;

pub use app::App;
pub use state::{AppState, Pane, PopupState};
