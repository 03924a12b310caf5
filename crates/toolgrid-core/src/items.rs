//! Runnable item discovery.
//!
//! An item is a regular file in the source directory. The list is sorted
//! case-insensitively and numbered from 1; the numbering is what the
//! operator types at the prompt.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// One selectable entry in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// 1-based position in the sorted list.
    pub index: usize,
    pub name: String,
    pub path: PathBuf,
}

/// Supplies the items shown by the dashboard.
pub trait ItemSource {
    /// Brings external state up to date (e.g. pulls a remote).
    ///
    /// # Errors
    /// Returns an error if the sync fails.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    /// Lists the items in display order. An empty list is not an error.
    ///
    /// # Errors
    /// Returns an error if the listing cannot be read.
    fn items(&self) -> Result<Vec<Item>>;

    /// Human-readable location, used in messages.
    fn describe(&self) -> String;
}

/// Lists the regular files of one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    include_hidden: bool,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            include_hidden: false,
        }
    }

    #[must_use]
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ItemSource for DirectorySource {
    fn items(&self) -> Result<Vec<Item>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list {}", self.dir.display()));
            }
        };

        let mut found: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to list {}", self.dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == ".git" || (!self.include_hidden && name.starts_with('.')) {
                continue;
            }
            let path = entry.path();
            // Follows symlinks so linked scripts count as items.
            if path.is_file() {
                found.push((name, path));
            }
        }

        Ok(number_items(found))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Sorts case-insensitively (raw name breaks ties) and assigns 1-based indices.
fn number_items(mut found: Vec<(String, PathBuf)>) -> Vec<Item> {
    found.sort_by(|(a, _), (b, _)| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    found
        .into_iter()
        .enumerate()
        .map(|(i, (name, path))| Item {
            index: i + 1,
            name,
            path,
        })
        .collect()
}

/// A git clone kept in sync with its remote, listed like a directory.
#[derive(Debug, Clone)]
pub struct RepoSource {
    url: String,
    listing: DirectorySource,
}

impl RepoSource {
    pub fn new(url: impl Into<String>, listing: DirectorySource) -> Self {
        Self {
            url: url.into(),
            listing,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Removes the local clone.
    ///
    /// # Errors
    /// Returns an error if the directory exists but cannot be removed.
    pub fn cleanup(&self) -> Result<()> {
        let dir = self.listing.dir();
        match fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", dir.display())),
        }
    }
}

impl ItemSource for RepoSource {
    fn refresh(&mut self) -> Result<()> {
        let dir = self.listing.dir();
        if dir.join(".git").is_dir() {
            tracing::info!(dir = %dir.display(), "updating repository");
            run_git(Command::new("git").arg("-C").arg(dir).arg("pull"), "git pull")
        } else {
            if let Some(parent) = dir.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create directory {}", parent.display()))?;
            }
            tracing::info!(url = %self.url, dir = %dir.display(), "cloning repository");
            run_git(
                Command::new("git").arg("clone").arg(&self.url).arg(dir),
                "git clone",
            )
        }
    }

    fn items(&self) -> Result<Vec<Item>> {
        self.listing.items()
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.listing.describe(), self.url)
    }
}

fn run_git(command: &mut Command, what: &str) -> Result<()> {
    let output = command.output().with_context(|| format!("run {what}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{what} failed: {}", stderr.trim());
    }
    Ok(())
}
