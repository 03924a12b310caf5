//! Terminal frontend for toolgrid.
//!
//! Draws a fixed bordered frame with plain cursor-addressed escapes (no raw
//! mode, no alternate screen) and reads the operator's choice line by line.

pub mod dashboard;
pub mod frame;
pub mod input;
pub mod layout;
pub mod output;
pub mod terminal;
pub mod text;
pub mod theme;

pub use dashboard::{Dashboard, DashboardOptions, Exit, RunRecord};
