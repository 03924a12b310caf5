//! Grid geometry.
//!
//! [`GridLayout::compute`] is a pure function of the terminal size and the
//! item count. The returned [`LayoutState`] is passed by value to the
//! renderer; nothing about it is remembered between draws.
//!
//! Frame rows, from `top_row` down:
//!
//! ```text
//! ╔════════╗  top border
//! ║ title  ║
//! ╠════════╣
//! ║ ...    ║  content_height rows
//! ╟────────╢
//! ║ > ...  ║  prompt
//! ╚════════╝  bottom border
//! ```

use std::ops::Range;

use toolgrid_core::config::UiConfig;

/// Top border, title and separator.
pub const HEADER_LINES: u16 = 3;
/// Prompt separator, prompt and bottom border.
pub const FOOTER_LINES: u16 = 3;
/// `"║ "` on the left plus `" ║"` on the right.
pub const BORDER_WIDTH: u16 = 4;
pub const SEPARATOR: &str = "   ";
pub const SEPARATOR_WIDTH: u16 = 3;
pub const MAX_COLUMNS: u16 = 3;
/// Text drawn after the left border on the prompt row.
pub const PROMPT_MARKER: &str = " > ";
const PROMPT_COL: u16 = 4;

/// Lower bounds the layout clamps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConstraints {
    /// Row of the top border.
    pub top_offset: u16,
    pub min_width: u16,
    pub min_content_height: u16,
    pub min_column_width: u16,
}

impl Default for LayoutConstraints {
    fn default() -> Self {
        Self {
            top_offset: 0,
            min_width: 40,
            min_content_height: 3,
            min_column_width: 10,
        }
    }
}

impl From<&UiConfig> for LayoutConstraints {
    fn from(ui: &UiConfig) -> Self {
        Self {
            top_offset: 0,
            min_width: ui.min_width,
            min_content_height: ui.min_content_height,
            min_column_width: ui.min_column_width,
        }
    }
}

impl LayoutConstraints {
    /// Output mode needs a header row plus at least two output rows, and one
    /// column must always fit inside the borders.
    fn normalized(self) -> Self {
        let min_column_width = self.min_column_width.clamp(1, u16::MAX - BORDER_WIDTH);
        Self {
            top_offset: self.top_offset,
            min_width: self.min_width.max(min_column_width + BORDER_WIDTH),
            min_content_height: self.min_content_height.max(3),
            min_column_width,
        }
    }
}

/// Geometry of one draw cycle. Rows and columns are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutState {
    pub top_row: u16,
    pub content_start_row: u16,
    pub content_height: u16,
    pub total_width: u16,
    pub column_count: u16,
    pub column_widths: Vec<u16>,
    pub prompt_row: u16,
    /// Column where prompt text starts.
    pub prompt_col: u16,
    pub item_count: usize,
}

impl LayoutState {
    pub fn inner_width(&self) -> u16 {
        self.total_width - BORDER_WIDTH
    }

    /// Columns available for prompt text before the right border.
    pub fn prompt_width(&self) -> u16 {
        self.total_width
            .saturating_sub(self.prompt_col)
            .saturating_sub(2)
    }

    pub fn bottom_row(&self) -> u16 {
        self.prompt_row.saturating_add(1)
    }

    /// Rows left for streamed output under the `Output for:` header.
    pub fn output_rows(&self) -> usize {
        usize::from(self.content_height - 1)
    }

    /// Items one page can show.
    pub fn page_capacity(&self) -> usize {
        usize::from(self.column_count) * usize::from(self.content_height)
    }

    /// Always at least 1, even with no items.
    pub fn page_count(&self) -> usize {
        self.item_count.div_ceil(self.page_capacity()).max(1)
    }

    /// Range of item positions (0-based) shown on `page`.
    pub fn page_range(&self, page: usize) -> Range<usize> {
        let start = (page * self.page_capacity()).min(self.item_count);
        let end = (start + self.page_capacity()).min(self.item_count);
        start..end
    }

    /// Cell of the `slot`-th item of a page, filled column by column.
    pub fn cell(&self, slot: usize) -> Option<(u16, u16)> {
        let height = usize::from(self.content_height);
        let row = slot % height;
        let col = slot / height;
        if col >= usize::from(self.column_count) {
            return None;
        }
        Some((u16::try_from(row).ok()?, u16::try_from(col).ok()?))
    }

    /// Inverse of [`cell`](Self::cell).
    pub fn slot(&self, row: u16, col: u16) -> usize {
        usize::from(col) * usize::from(self.content_height) + usize::from(row)
    }
}

pub struct GridLayout;

impl GridLayout {
    /// Derives the layout for a terminal of `width` x `height` cells.
    ///
    /// Total: undersized terminals are clamped to the minimums.
    pub fn compute(
        width: u16,
        height: u16,
        item_count: usize,
        constraints: &LayoutConstraints,
    ) -> LayoutState {
        let c = constraints.normalized();

        let chrome = c.top_offset + HEADER_LINES + FOOTER_LINES;
        let content_height = height.saturating_sub(chrome).max(c.min_content_height);
        let total_width = width.max(c.min_width);
        let inner = total_width - BORDER_WIDTH;

        let column_count = (1..=MAX_COLUMNS)
            .rev()
            .find(|&n| {
                u32::from(inner)
                    >= u32::from(n) * u32::from(c.min_column_width)
                        + u32::from(n - 1) * u32::from(SEPARATOR_WIDTH)
            })
            .unwrap_or(1);
        let column_widths = distribute(inner - (column_count - 1) * SEPARATOR_WIDTH, column_count);

        let content_start_row = c.top_offset + HEADER_LINES;
        let prompt_row = content_start_row
            .saturating_add(content_height)
            .saturating_add(1);

        tracing::debug!(
            width,
            height,
            content_height,
            column_count,
            "layout computed"
        );

        LayoutState {
            top_row: c.top_offset,
            content_start_row,
            content_height,
            total_width,
            column_count,
            column_widths,
            prompt_row,
            prompt_col: PROMPT_COL,
            item_count,
        }
    }
}

/// Splits `available` into `count` widths; the first `available % count`
/// columns get one extra cell.
fn distribute(available: u16, count: u16) -> Vec<u16> {
    let base = available / count;
    let remainder = available % count;
    (0..count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}
