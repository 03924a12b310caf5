//! CLI command handlers.

pub mod config;
pub mod dashboard;
pub mod list;

use anyhow::Result;
use toolgrid_core::config::SourceConfig;
use toolgrid_core::items::{DirectorySource, ItemSource, RepoSource};

/// The configured item source, plus the repo handle when one is cloned.
fn item_source(config: &SourceConfig) -> (Box<dyn ItemSource>, Option<RepoSource>) {
    let listing = DirectorySource::new(&config.dir).include_hidden(config.include_hidden);
    match &config.repo_url {
        Some(url) => {
            let repo = RepoSource::new(url.clone(), listing);
            (Box::new(repo.clone()), Some(repo))
        }
        None => (Box::new(listing), None),
    }
}

/// Removes the clone when `cleanup_on_exit` asks for it.
fn cleanup(config: &SourceConfig, repo: Option<&RepoSource>) -> Result<()> {
    match repo {
        Some(repo) if config.cleanup_on_exit => {
            tracing::info!(url = repo.url(), "removing clone");
            repo.cleanup()
        }
        _ => Ok(()),
    }
}
