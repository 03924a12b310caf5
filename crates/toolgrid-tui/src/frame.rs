//! Frame drawing.
//!
//! Every line is written at an absolute position and followed by a
//! clear-to-end-of-line, so a narrower redraw never leaves stale cells.

use std::io::Write;
use std::iter;

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::style::Print;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use toolgrid_core::items::Item;

use crate::layout::{LayoutState, PROMPT_MARKER, SEPARATOR};
use crate::output::OutputBuffer;
use crate::text::{fit, visible_width};
use crate::theme::Theme;

/// What the content region shows.
#[derive(Debug, Clone, Copy)]
pub enum Content<'a> {
    /// The item grid, one page of it.
    Grid { items: &'a [Item], page: usize },
    /// Free text, one entry per row (empty and error states).
    Message { lines: &'a [String] },
    /// Streamed output of the named item.
    Output {
        name: &'a str,
        buffer: &'a OutputBuffer,
    },
}

#[derive(Debug, Clone)]
pub struct FrameRenderer {
    theme: Theme,
    title: String,
}

impl FrameRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            theme: Theme::default(),
            title: title.into(),
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Clears from the top of the frame down and draws everything, leaving
    /// the cursor at the end of `prompt`.
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails.
    pub fn draw_frame<W: Write>(
        &self,
        out: &mut W,
        layout: &LayoutState,
        content: &Content<'_>,
        prompt: &str,
    ) -> Result<()> {
        queue!(out, MoveTo(0, layout.top_row), Clear(ClearType::FromCursorDown))?;

        let fill = usize::from(layout.total_width - 2);
        let top = layout.top_row;
        put_line(out, top, &self.rule('╔', '═', '╗', fill))?;
        put_line(out, top + 1, &self.title_line(layout, content))?;
        put_line(out, top + 2, &self.rule('╠', '═', '╣', fill))?;
        self.queue_content(out, layout, content)?;
        put_line(out, layout.prompt_row - 1, &self.rule('╟', '─', '╢', fill))?;
        put_line(out, layout.bottom_row(), &self.rule('╚', '═', '╝', fill))?;
        self.queue_prompt(out, layout, prompt)?;
        out.flush()?;
        Ok(())
    }

    /// Redraws only the content rows; borders and header stay as they are.
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails.
    pub fn draw_content<W: Write>(
        &self,
        out: &mut W,
        layout: &LayoutState,
        content: &Content<'_>,
        prompt: &str,
    ) -> Result<()> {
        self.queue_content(out, layout, content)?;
        self.queue_prompt(out, layout, prompt)?;
        out.flush()?;
        Ok(())
    }

    /// Rewrites the prompt row and leaves the cursor after `text`.
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails.
    pub fn draw_prompt<W: Write>(&self, out: &mut W, layout: &LayoutState, text: &str) -> Result<()> {
        self.queue_prompt(out, layout, text)?;
        out.flush()?;
        Ok(())
    }

    fn rule(&self, left: char, fill: char, right: char, width: usize) -> String {
        let mut line = String::with_capacity((width + 2) * 3);
        line.push(left);
        line.extend(iter::repeat_n(fill, width));
        line.push(right);
        self.theme.border(&line)
    }

    /// `║ body ║` with `body` fitted to the inner width.
    fn boxed(&self, layout: &LayoutState, body: &str) -> String {
        format!(
            "{}{}{}",
            self.theme.border("║ "),
            fit(body, usize::from(layout.inner_width())),
            self.theme.border(" ║")
        )
    }

    fn title_line(&self, layout: &LayoutState, content: &Content<'_>) -> String {
        let mut title = self.title.clone();
        if let Content::Grid { page, .. } = content {
            let pages = layout.page_count();
            if pages > 1 {
                title.push_str(&format!(" (page {}/{pages})", page + 1));
            }
        }
        let width = usize::from(layout.total_width - 2);
        let left = width.saturating_sub(visible_width(&title)) / 2;
        let centered = format!("{}{}", " ".repeat(left), self.theme.title(&title));
        format!(
            "{}{}{}",
            self.theme.border("║"),
            fit(&centered, width),
            self.theme.border("║")
        )
    }

    fn queue_content<W: Write>(
        &self,
        out: &mut W,
        layout: &LayoutState,
        content: &Content<'_>,
    ) -> Result<()> {
        let start = layout.content_start_row;
        match content {
            Content::Grid { items, page } => {
                let shown = items.get(layout.page_range(*page)).unwrap_or_default();
                for row in 0..layout.content_height {
                    let line = self.grid_row(layout, shown, row);
                    put_line(out, start + row, &self.boxed(layout, &line))?;
                }
            }
            Content::Message { lines } => {
                for row in 0..layout.content_height {
                    let text = lines.get(usize::from(row)).map_or("", String::as_str);
                    put_line(out, start + row, &self.boxed(layout, text))?;
                }
            }
            Content::Output { name, buffer } => {
                let heading = self.theme.heading("Output for:", name);
                put_line(out, start, &self.boxed(layout, &heading))?;
                let mut lines = buffer.lines();
                for row in 1..layout.content_height {
                    let text = lines
                        .next()
                        .map(|line| self.theme.output_line(line))
                        .unwrap_or_default();
                    put_line(out, start + row, &self.boxed(layout, &text))?;
                }
            }
        }
        Ok(())
    }

    fn grid_row(&self, layout: &LayoutState, shown: &[Item], row: u16) -> String {
        let cells: Vec<String> = layout
            .column_widths
            .iter()
            .zip(0u16..)
            .map(|(&width, col)| {
                let label = shown
                    .get(layout.slot(row, col))
                    .map(|item| self.theme.item_label(item.index, &item.name))
                    .unwrap_or_default();
                fit(&label, usize::from(width))
            })
            .collect();
        cells.join(SEPARATOR)
    }

    fn queue_prompt<W: Write>(&self, out: &mut W, layout: &LayoutState, text: &str) -> Result<()> {
        let width = usize::from(layout.prompt_width());
        let line = format!(
            "{}{}{}{}",
            self.theme.border("║"),
            self.theme.title(PROMPT_MARKER),
            fit(text, width),
            self.theme.border(" ║")
        );
        put_line(out, layout.prompt_row, &line)?;
        let typed = u16::try_from(visible_width(text).min(width)).unwrap_or(0);
        queue!(out, MoveTo(layout.prompt_col + typed, layout.prompt_row))?;
        Ok(())
    }
}

/// Moves the cursor to the first row under the frame.
///
/// # Errors
/// Returns an error if writing to `out` fails.
pub fn park_cursor<W: Write>(out: &mut W, layout: &LayoutState) -> Result<()> {
    queue!(out, MoveTo(0, layout.bottom_row().saturating_add(1)))?;
    out.flush()?;
    Ok(())
}

fn put_line<W: Write>(out: &mut W, row: u16, line: &str) -> Result<()> {
    queue!(out, MoveTo(0, row), Print(line), Clear(ClearType::UntilNewLine))?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use toolgrid_core::exec::OutputLine;

    use super::screen::replay;
    use super::*;
    use crate::layout::{GridLayout, LayoutConstraints};

    fn items(names: &[&str]) -> Vec<Item> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Item {
                index: i + 1,
                name: (*name).to_string(),
                path: PathBuf::from(name),
            })
            .collect()
    }

    fn layout(width: u16, height: u16, count: usize) -> LayoutState {
        GridLayout::compute(width, height, count, &LayoutConstraints::default())
    }

    #[test]
    fn test_full_frame_lines_have_exact_width() {
        let items = items(&["backup.sh", "cleanup.sh", "zdiag.sh"]);
        let layout = layout(60, 12, items.len());
        let renderer = FrameRenderer::new("Tools");
        let mut out = Vec::new();
        renderer
            .draw_frame(
                &mut out,
                &layout,
                &Content::Grid {
                    items: &items,
                    page: 0,
                },
                "Choice: ",
            )
            .unwrap();

        let rows = replay(&out);
        assert_eq!(rows.len(), 12);
        for (row, line) in &rows {
            assert_eq!(visible_width(line), 60, "row {row}: {line:?}");
        }
        assert!(rows[&0].starts_with('╔'));
        assert!(rows[&1].contains("Tools"));
        assert!(rows[&2].starts_with('╠'));
        assert!(rows[&3].contains("1. backup.sh"));
        assert!(rows[&4].contains("2. cleanup.sh"));
        assert!(rows[&5].contains("3. zdiag.sh"));
        assert!(rows[&(layout.prompt_row - 1)].starts_with('╟'));
        assert!(rows[&layout.prompt_row].starts_with("║ > Choice:"));
        assert!(rows[&11].starts_with('╚'));
    }

    #[test]
    fn test_every_line_clears_to_end() {
        let layout = layout(40, 9, 0);
        let mut out = Vec::new();
        FrameRenderer::new("T")
            .draw_frame(&mut out, &layout, &Content::Grid { items: &[], page: 0 }, "")
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        // One clear per line: 3 header, 3 content, 3 footer.
        assert_eq!(text.matches("\x1b[K").count(), 9);
        assert!(text.starts_with("\x1b[1;1H\x1b[J"));
    }

    #[test]
    fn test_long_names_truncated_in_column() {
        let items = items(&["a-really-long-tool-name-that-overflows.sh"]);
        let layout = layout(40, 9, 1);
        let mut out = Vec::new();
        FrameRenderer::new("T")
            .draw_content(&mut out, &layout, &Content::Grid { items: &items, page: 0 }, "")
            .unwrap();
        let rows = replay(&out);
        let first = &rows[&layout.content_start_row];
        assert!(first.contains("1. a-real…"), "{first:?}");
        assert_eq!(visible_width(first), 40);
    }

    #[test]
    fn test_second_page_and_title_marker() {
        let names: Vec<String> = (1..=12).map(|i| format!("t{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let items = items(&refs);
        let layout = layout(40, 9, items.len());
        let mut out = Vec::new();
        FrameRenderer::new("T")
            .draw_frame(&mut out, &layout, &Content::Grid { items: &items, page: 1 }, "")
            .unwrap();
        let rows = replay(&out);
        assert!(rows[&1].contains("T (page 2/2)"));
        assert!(rows[&3].contains("10. t10"));
        assert!(rows[&5].contains("12. t12"));
        assert!(!rows[&3].contains("1. t01"));
    }

    #[test]
    fn test_output_mode_shows_header_and_tail() {
        let layout = layout(40, 10, 0);
        let mut buffer = OutputBuffer::new(layout.output_rows());
        for i in 0..10 {
            buffer.push(OutputLine::output(format!("line {i}")));
        }
        let mut out = Vec::new();
        FrameRenderer::new("T")
            .draw_content(
                &mut out,
                &layout,
                &Content::Output {
                    name: "cleanup.sh",
                    buffer: &buffer,
                },
                "Now executing",
            )
            .unwrap();
        let rows = replay(&out);
        let start = layout.content_start_row;
        assert!(rows[&start].contains("Output for: cleanup.sh"));
        assert!(rows[&(start + 1)].contains("line 7"));
        assert!(rows[&(start + 3)].contains("line 9"));
        // Only content rows and the prompt were touched.
        assert!(!rows.contains_key(&0));
    }

    #[test]
    fn test_message_rows() {
        let layout = layout(40, 9, 0);
        let lines = vec!["No items found.".to_string()];
        let mut out = Vec::new();
        FrameRenderer::new("T")
            .draw_content(&mut out, &layout, &Content::Message { lines: &lines }, "")
            .unwrap();
        let rows = replay(&out);
        assert!(rows[&3].starts_with("║ No items found."));
        assert_eq!(rows[&4].trim_matches(|c| c == '║' || c == ' '), "");
    }

    #[test]
    fn test_prompt_cursor_after_text() {
        let layout = layout(40, 9, 0);
        let mut out = Vec::new();
        FrameRenderer::new("T")
            .draw_prompt(&mut out, &layout, "Choice: ")
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = format!("\x1b[{};{}H", layout.prompt_row + 1, 4 + 8 + 1);
        assert!(text.ends_with(&expected), "{text:?}");
    }
}
