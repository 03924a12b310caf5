//! Colours used by the frame.
//!
//! Everything is emitted as SGR runs through crossterm's `Stylize`, so styled
//! strings stay measurable by [`crate::text::visible_width`].

use crossterm::style::{Color, Stylize};
use toolgrid_core::exec::{LineKind, OutputLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub border: Color,
    pub title: Color,
    pub index: Color,
    pub name: Color,
    pub heading: Color,
    pub info: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border: Color::Magenta,
            title: Color::DarkYellow,
            index: Color::DarkGreen,
            name: Color::Magenta,
            heading: Color::DarkCyan,
            info: Color::DarkYellow,
            error: Color::DarkRed,
        }
    }
}

impl Theme {
    pub fn border(&self, text: &str) -> String {
        text.with(self.border).bold().to_string()
    }

    pub fn title(&self, text: &str) -> String {
        text.with(self.title).bold().to_string()
    }

    /// `"{index}. {name}"` with the number and the name coloured apart.
    pub fn item_label(&self, index: usize, name: &str) -> String {
        format!(
            "{} {}",
            format!("{index}.").with(self.index),
            name.with(self.name)
        )
    }

    pub fn heading(&self, label: &str, value: &str) -> String {
        format!("{label} {}", value.with(self.heading))
    }

    pub fn info(&self, text: &str) -> String {
        text.with(self.info).to_string()
    }

    /// Whole text in the error colour, without the `Error:` label.
    pub fn alert(&self, text: &str) -> String {
        text.with(self.error).to_string()
    }

    pub fn error(&self, text: &str) -> String {
        format!("{} {text}", "Error:".with(self.error).bold())
    }

    /// Renders one buffered output line; child stdout passes through unstyled.
    pub fn output_line(&self, line: &OutputLine) -> String {
        match line.kind {
            LineKind::Output => line.text.clone(),
            LineKind::Info => self.info(&line.text),
            LineKind::Error => self.error(&line.text),
        }
    }
}
