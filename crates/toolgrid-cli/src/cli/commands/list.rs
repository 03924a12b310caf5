//! Non-interactive item listing.

use anyhow::{Context, Result};
use toolgrid_core::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let (mut source, repo) = super::item_source(&config.source);
    source.refresh().context("Failed to prepare items")?;
    let items = source.items()?;

    if items.is_empty() {
        println!("No items found in {}", source.describe());
    }
    for item in &items {
        println!("{}. {}", item.index, item.name);
    }

    super::cleanup(&config.source, repo.as_ref())
}
