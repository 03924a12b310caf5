//! CLI entry and dispatch.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use toolgrid_core::config::{self, Config};
use toolgrid_core::interrupt;
use toolgrid_core::logging::{self, LogGuard};

mod commands;

/// How long shutdown waits for a stdin read still blocked on the terminal.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "toolgrid")]
#[command(version)]
#[command(about = "Pick a tool from a grid and watch its output live")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the items (overrides [source].dir)
    #[arg(long, global = true, value_name = "DIR", env = "TOOLGRID_DIR")]
    dir: Option<PathBuf>,

    /// Git remote to clone into the item directory; empty disables
    #[arg(long, global = true, value_name = "URL")]
    repo: Option<String>,

    /// Program that runs each item; empty runs items directly
    #[arg(long, global = true, value_name = "PROGRAM")]
    interpreter: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the numbered item list and exit
    List,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    let result = rt.block_on(dispatch(cli));
    // A line read left pending on stdin must not hold the process open.
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        dir,
        repo,
        interpreter,
    } = cli;

    let load = move || -> Result<Config> {
        Ok(Config::load()
            .context("load config")?
            .with_overrides(dir, repo, interpreter))
    };

    match command {
        None => {
            let config = load()?;
            let _log_guard = init_logging();
            commands::dashboard::run(&config).await
        }
        Some(Commands::List) => {
            let config = load()?;
            let _log_guard = init_logging();
            commands::list::run(&config)
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}

/// File logging is best effort: without it the tool still works.
fn init_logging() -> Option<LogGuard> {
    match logging::init(&config::paths::logs_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    }
}
