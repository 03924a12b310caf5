//! Interactive dashboard command.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result, bail};
use tokio::io::BufReader;
use toolgrid_core::config::Config;
use toolgrid_core::exec::ExecutionBridge;
use toolgrid_core::interrupt::{self, InterruptedError, Signal};
use toolgrid_tui::terminal::TerminalGuard;
use toolgrid_tui::{Dashboard, DashboardOptions, Exit};

pub async fn run(config: &Config) -> Result<()> {
    if !io::stdout().is_terminal() {
        bail!(
            "toolgrid needs an interactive terminal on stdout.\n\
             Hint: use `toolgrid list` to print the items instead."
        );
    }

    let (mut source, repo) = super::item_source(&config.source);
    source.refresh().context("Failed to prepare items")?;

    let exit = {
        let _guard = TerminalGuard::enter()?;
        let mut dashboard = Dashboard::new(
            source,
            ExecutionBridge::new(&config.runner),
            DashboardOptions::from(&config.ui),
            BufReader::new(tokio::io::stdin()),
            io::stdout(),
        );
        dashboard.run().await?
    };

    super::cleanup(&config.source, repo.as_ref())?;

    match exit {
        Exit::Quit | Exit::InputClosed => Ok(()),
        Exit::Interrupted => {
            interrupt::reset();
            Err(InterruptedError(Signal::Interrupt).into())
        }
        Exit::Terminated => Err(InterruptedError(Signal::Terminate).into()),
    }
}
