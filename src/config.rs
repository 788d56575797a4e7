//! Filter configuration
//!
//! Controls which parts of the filesystem are indexed. Filters are
//! exclude globs with include globs as overrides, compiled once into
//! [`globset::GlobSet`]s so the per-path check stays cheap; it runs for
//! every path the walker and the refresh engine touch.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// Pseudo-filesystems and volatile trees that are never worth indexing
const DEFAULT_EXCLUDES: &[&str] = &["/proc", "/sys", "/dev", "/run", "/tmp"];

/// User-facing filter settings, loaded from a JSON config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Glob patterns for paths to leave out of the index
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Glob patterns that override an exclude match
    #[serde(default)]
    pub include: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            include: Vec::new(),
        }
    }
}

impl FilterConfig {
    /// Read a config file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no config file at {:?}, using default filters", path);
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Compile the glob lists into a reusable filter
    pub fn compile(&self) -> Result<PathFilter> {
        Ok(PathFilter {
            exclude: build_set(&self.exclude)?,
            include: build_set(&self.include)?,
        })
    }
}

/// Each pattern matches both the path itself and everything below it, so
/// `/proc` also covers `/proc/self/fd` without the user spelling out `**`.
fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("invalid glob pattern {:?}", pattern))?,
        );
        let subtree = format!("{}/**", pattern.trim_end_matches('/'));
        builder.add(
            Glob::new(&subtree)
                .with_context(|| format!("invalid glob pattern {:?}", subtree))?,
        );
    }
    builder.build().context("failed to build glob set")
}

/// Compiled filter predicate
///
/// Pure and cheap; shared between the walker, the refresh engine and the
/// watcher.
pub struct PathFilter {
    exclude: GlobSet,
    include: GlobSet,
}

impl PathFilter {
    /// Whether `path` should be kept out of the index
    pub fn is_filtered(&self, path: &Path) -> bool {
        self.exclude.is_match(path) && !self.include.is_match(path)
    }

    /// A filter that keeps everything (used by tests and bare setups)
    pub fn allow_all() -> Self {
        Self {
            exclude: GlobSet::empty(),
            include: GlobSet::empty(),
        }
    }
}
