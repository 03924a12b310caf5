//! Width-aware text utilities for strings that carry inline SGR escapes.
//!
//! Strings are scanned with a two-state automaton: `Plain` text occupies
//! terminal columns, an `Escape` run (from ESC up to and including the first
//! ASCII letter) occupies none.

use std::borrow::Cow;
use std::iter;

use unicode_width::UnicodeWidthChar;

/// Single-column marker appended when text is cut.
pub const ELLIPSIS: char = '…';
const ELLIPSIS_WIDTH: usize = 1;

/// Resets colour and attributes.
pub const RESET: &str = "\x1b[0m";

const ESC: char = '\x1b';
const TAB_SPACES: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Plain,
    Escape,
}

impl ScanState {
    /// Consumes `ch`, returning the next state and whether `ch` is rendered.
    fn step(self, ch: char) -> (Self, bool) {
        match self {
            ScanState::Plain if ch == ESC => (ScanState::Escape, false),
            ScanState::Plain => (ScanState::Plain, true),
            ScanState::Escape if ch.is_ascii_alphabetic() => (ScanState::Plain, false),
            ScanState::Escape => (ScanState::Escape, false),
        }
    }
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Number of terminal columns `text` occupies, ignoring escape runs.
pub fn visible_width(text: &str) -> usize {
    let mut state = ScanState::Plain;
    let mut width = 0;
    for ch in text.chars() {
        let (next, visible) = state.step(ch);
        if visible {
            width += char_width(ch);
        }
        state = next;
    }
    width
}

/// Cuts `text` to at most `max_width` visible columns.
///
/// Text that already fits is returned untouched. Otherwise the result keeps
/// every escape run before the cut, ends with [`ELLIPSIS`] and then [`RESET`]
/// so no colour leaks into whatever is printed next. Applying it twice with
/// the same width changes nothing.
pub fn truncate(text: &str, max_width: usize) -> Cow<'_, str> {
    if visible_width(text) <= max_width {
        return Cow::Borrowed(text);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_width - ELLIPSIS_WIDTH;
    let mut out = String::with_capacity(text.len() + RESET.len());
    let mut used = 0;
    let mut state = ScanState::Plain;
    for ch in text.chars() {
        let (next, visible) = state.step(ch);
        if visible {
            let w = char_width(ch);
            if used + w > budget {
                break;
            }
            used += w;
        }
        out.push(ch);
        state = next;
    }
    out.push(ELLIPSIS);
    out.push_str(RESET);
    Cow::Owned(out)
}

/// Truncates, then pads with spaces to exactly `width` visible columns.
pub fn fit(text: &str, width: usize) -> String {
    let cut = truncate(text, width);
    let pad = width.saturating_sub(visible_width(&cut));
    let mut out = String::with_capacity(cut.len() + pad);
    out.push_str(&cut);
    out.extend(iter::repeat_n(' ', pad));
    out
}

/// Cleans one line of child output so it cannot disturb the frame.
///
/// - trailing whitespace dropped
/// - only the text after the last carriage return kept (what a terminal shows)
/// - tabs expanded to four spaces
/// - colour (SGR) escapes kept, every other escape and control char removed
pub fn sanitize_for_display(line: &str) -> Cow<'_, str> {
    let trimmed = line.trim_end();
    let shown = trimmed.rsplit('\r').next().unwrap_or(trimmed);
    if !shown.chars().any(char::is_control) {
        return Cow::Borrowed(shown);
    }

    let mut out = String::with_capacity(shown.len());
    let mut run = String::new();
    let mut state = ScanState::Plain;
    for ch in shown.chars() {
        let (next, _) = state.step(ch);
        match state {
            ScanState::Plain if ch == ESC => {
                run.clear();
                run.push(ch);
            }
            ScanState::Plain if ch == '\t' => out.push_str(TAB_SPACES),
            ScanState::Plain if ch.is_control() => {}
            ScanState::Plain => out.push(ch),
            ScanState::Escape => {
                run.push(ch);
                if next == ScanState::Plain && ch == 'm' {
                    out.push_str(&run);
                }
            }
        }
        state = next;
    }
    Cow::Owned(out)
}
