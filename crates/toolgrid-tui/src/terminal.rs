//! Terminal lifecycle management.
//!
//! Input is line-based, so there is no raw mode or alternate screen: setup
//! clears the screen, restore puts colours and the cursor back. Restore runs on:
//! - Normal exit (via [`TerminalGuard`]'s Drop)
//! - Second Ctrl+C (via the interrupt restore hook)
//! - Panic

use std::io::{self, Write};
use std::panic;

use anyhow::{Context, Result};
use crossterm::cursor::{MoveTo, Show};
use crossterm::execute;
use crossterm::style::{Attribute, ResetColor, SetAttribute};
use crossterm::terminal::{Clear, ClearType};
use toolgrid_core::interrupt;

/// Used when the size cannot be queried (e.g. not a TTY).
pub const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Clears the screen and homes the cursor.
///
/// # Errors
/// Returns an error if writing to `out` fails.
pub fn setup_terminal<W: Write>(out: &mut W) -> Result<()> {
    execute!(out, Clear(ClearType::All), MoveTo(0, 0)).context("Failed to clear terminal")?;
    Ok(())
}

/// Resets colours and attributes and shows the cursor.
///
/// Idempotent and safe to call multiple times.
///
/// # Errors
/// Returns an error if writing to stdout fails.
pub fn restore_terminal() -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, ResetColor, SetAttribute(Attribute::Reset), Show)
        .context("Failed to restore terminal")?;
    Ok(())
}

/// Current terminal size as `(columns, rows)`.
pub fn terminal_size() -> (u16, u16) {
    crossterm::terminal::size().unwrap_or(FALLBACK_SIZE)
}

/// Installs a panic hook that restores the terminal before printing the panic.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        // Start the report on a fresh line below whatever was drawn.
        eprintln!();
        original_hook(panic_info);
    }));
}

/// Owns the screen for the lifetime of the dashboard.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    /// Installs the restore hooks and clears the screen.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be written.
    pub fn enter() -> Result<Self> {
        install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = restore_terminal();
            println!();
        });
        setup_terminal(&mut io::stdout())?;
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = restore_terminal() {
            tracing::warn!("terminal restore failed: {e:#}");
        }
    }
}
