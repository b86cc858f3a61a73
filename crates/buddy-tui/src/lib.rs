//! buddy-tui: terminal UI components
//!
//! Widgets, key mapping and colors for the console-buddy chat screen, built on
//! ratatui and crossterm.

pub mod input;
pub mod theme;
pub mod widgets;

pub use input::{Action, event_to_action, key_to_action};
pub use theme::Theme;
