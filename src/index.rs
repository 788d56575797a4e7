//! Refresh engine
//!
//! Owns the path tree and the name trie and keeps them consistent with
//! the live filesystem. The initial population walks the whole root; after
//! that, every change event triggers [`Index::refresh`], which reconciles
//! one directory's indexed children against its current on-disk children.
//! No periodic rescans.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ignore::WalkBuilder;

use crate::config::PathFilter;
use crate::tree::{NodeId, PathTree, TreeError};
use crate::trie::{FileEntry, NameTrie};

/// Counts reported by the initial scan
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub files: u64,
    pub directories: u64,
}

/// Join a directory path and a child basename with a single separator
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// The in-memory index: path tree plus name trie, mutated only here
pub struct Index {
    tree: PathTree,
    names: NameTrie,
    filter: Arc<PathFilter>,
}

impl Index {
    pub fn new(filter: Arc<PathFilter>) -> Self {
        Self {
            tree: PathTree::new(),
            names: NameTrie::new(),
            filter,
        }
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    pub fn names(&self) -> &NameTrie {
        &self.names
    }

    /// Populate the index by walking `root`
    pub fn initial_scan(&mut self, root: &Path) -> IndexStats {
        log::info!("starting initial scan of {:?}", root);
        let start = Instant::now();
        let stats = self.add_subtree(root);
        log::info!(
            "indexed {} files and {} directories in {:.2}s",
            stats.files,
            stats.directories,
            start.elapsed().as_secs_f64()
        );
        stats
    }

    /// Reconcile the indexed contents of `dir` with its on-disk contents
    ///
    /// A directory that cannot be enumerated (vanished, permissions) is
    /// reconciled against an empty listing, which removes its stale
    /// subtree from the index. A directory that is on disk but not yet
    /// indexed is reconciled against an empty indexed set, which adds
    /// everything below it.
    pub fn refresh(&mut self, dir: &str) {
        log::debug!("refreshing directory {}", dir);

        let mut on_disk: HashMap<String, bool> = HashMap::new();
        match fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = match entry {
                        Ok(e) => e,
                        Err(err) => {
                            log::warn!("couldn't read entry in {}: {}", dir, err);
                            continue;
                        }
                    };
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let child_path = join_path(dir, &name);
                    if self.filter.is_filtered(Path::new(&child_path)) {
                        continue;
                    }
                    let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                    on_disk.insert(name, is_dir);
                }
            }
            Err(err) => {
                log::warn!("couldn't read directory {}: {}", dir, err);
            }
        }

        let indexed: HashSet<String> = match self.tree.children_of(dir) {
            Ok(children) => children.into_iter().map(str::to_string).collect(),
            Err(TreeError::NotFound(_)) | Err(TreeError::InvalidPath(_)) => HashSet::new(),
        };

        let created: Vec<String> = on_disk
            .keys()
            .filter(|name| !indexed.contains(*name))
            .cloned()
            .collect();
        let deleted: Vec<String> = indexed
            .iter()
            .filter(|name| !on_disk.contains_key(*name))
            .cloned()
            .collect();

        if !created.is_empty() {
            log::debug!("indexing new entries under {}: {:?}", dir, created);
        }
        if !deleted.is_empty() {
            log::debug!("removing deleted entries under {}: {:?}", dir, deleted);
        }

        for name in &created {
            let path = join_path(dir, name);
            if on_disk[name] {
                self.add_subtree(Path::new(&path));
            } else if let Err(err) = self.insert_path(&path) {
                log::warn!("skipping unindexable path {}: {}", path, err);
            }
        }
        for name in &deleted {
            self.remove_subtree(&join_path(dir, name));
        }
    }

    /// Walk `root` and index every non-filtered entry below it
    ///
    /// Filter hits on a directory prune its whole subtree from the walk.
    fn add_subtree(&mut self, root: &Path) -> IndexStats {
        let filter = Arc::clone(&self.filter);
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(move |entry| !filter.is_filtered(entry.path()))
            .build();

        let mut stats = IndexStats::default();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    log::warn!("walk error under {:?}: {}", root, err);
                    continue;
                }
            };
            let path = entry.path().to_string_lossy();
            if let Err(err) = self.insert_path(&path) {
                log::warn!("skipping unindexable path {:?}: {}", entry.path(), err);
                continue;
            }
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                stats.directories += 1;
            } else {
                stats.files += 1;
            }
        }
        stats
    }

    /// Ensure tree nodes for every component of `path`, giving each newly
    /// created node its trie entry
    fn insert_path(&mut self, path: &str) -> Result<NodeId, TreeError> {
        let mut current = self.tree.root();
        for comp in PathTree::components(path)? {
            match self.tree.child(current, comp) {
                Some(id) => current = id,
                None => {
                    let id = self.tree.add_child(current, comp);
                    self.names.insert(comp.as_bytes(), FileEntry { node: id });
                    current = id;
                }
            }
        }
        Ok(current)
    }

    /// Drop `path` and everything below it from both structures
    ///
    /// Trie entries go first, children before parents, while the tree can
    /// still reconstruct each node's path; the tree nodes are unlinked
    /// after.
    fn remove_subtree(&mut self, path: &str) {
        let Some(id) = self.tree.lookup(path) else {
            return;
        };
        for node in self.tree.subtree_post_order(id) {
            let node_path = self.tree.path_of(node);
            if let Some(name) = self.tree.name_of(node) {
                self.names.remove(name.as_bytes(), &node_path, &self.tree);
            }
        }
        self.tree.delete_at(path);
    }
}
