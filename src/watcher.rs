//! Filesystem change source
//!
//! Translates kernel file events into the directory-level change
//! messages the refresh engine consumes. Every create, remove or rename
//! is reduced to the *containing directory* of the affected path plus an
//! advisory kind; the refresh engine re-reads the directory either way,
//! so a misclassified kind is harmless. Content and metadata writes are
//! dropped here since they cannot change the name index.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, TrySendError};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::PathFilter;

/// Advisory classification of a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Delete,
}

/// One directory whose contents may have changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChange {
    /// Absolute path of the containing directory
    pub dir: String,
    pub kind: ChangeKind,
}

/// Reduce a kernel event to the affected paths and their change kinds
///
/// Returns an empty list for events that cannot affect the name index.
pub fn classify(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|p| (p.clone(), ChangeKind::Create))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .map(|p| (p.clone(), ChangeKind::Delete))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .map(|p| (p.clone(), ChangeKind::Delete))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                changes.push((from.clone(), ChangeKind::Delete));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push((to.clone(), ChangeKind::Create));
            }
            changes
        }
        // To / Any / Other: the kind is advisory, refresh re-reads anyway
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| (p.clone(), ChangeKind::Create))
            .collect(),
        _ => Vec::new(),
    }
}

/// Start watching `root` recursively, delivering [`DirChange`]s into `tx`
///
/// The returned watcher must stay alive for events to keep flowing.
/// When the bounded channel is full the event is dropped and counted;
/// the next event on the same directory reconciles it anyway.
pub fn spawn(
    root: &Path,
    filter: Arc<PathFilter>,
    tx: Sender<DirChange>,
) -> Result<RecommendedWatcher> {
    log::info!("starting filesystem watcher for {:?}", root);
    let dropped = Arc::new(AtomicU64::new(0));

    let handler = move |result: notify::Result<Event>| {
        let event = match result {
            Ok(event) => event,
            Err(err) => {
                log::warn!("watch error: {}", err);
                return;
            }
        };
        for (path, kind) in classify(&event) {
            let Some(parent) = path.parent() else {
                continue;
            };
            if filter.is_filtered(&path) || filter.is_filtered(parent) {
                continue;
            }
            let change = DirChange {
                dir: parent.to_string_lossy().into_owned(),
                kind,
            };
            match tx.try_send(change) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let count = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 1024 == 1 {
                        log::warn!("change queue saturated, {} events dropped so far", count);
                    }
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    };

    let mut watcher =
        RecommendedWatcher::new(handler, Config::default()).context("failed to create watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .context("failed to start watching root")?;
    Ok(watcher)
}
