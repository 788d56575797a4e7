//! snapfind: live whole-filesystem name index
//!
//! snapfind answers interactive filename queries with sub-second latency
//! and stays consistent with the live filesystem without periodic
//! rescans. Two structures back it: a path tree holding the directory
//! hierarchy, and a radix trie mapping basenames to tree nodes. A
//! filesystem watcher reports directory mutations; each one triggers an
//! incremental refresh that reconciles the affected directory against
//! its on-disk contents.
//!
//! # Architecture
//!
//! - **Path Tree**: arena of nodes, one per indexed path; paths are
//!   reconstructed by walking parent links
//! - **Name Trie**: patricia trie over basenames with prefix, substring
//!   and fuzzy traversals
//! - **Refresh Engine**: reconciles one directory per change event
//! - **Query Engine**: deterministic, ranked result streaming
//! - **Event Loop**: a single thread owning the index; all mutations and
//!   reads are serialized through it
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use snapfind::{Index, PathFilter};
//!
//! let mut index = Index::new(Arc::new(PathFilter::allow_all()));
//! index.initial_scan(std::path::Path::new("/home"));
//! index.names().visit_subtree(b"readme", |_, entries| {
//!     for entry in entries {
//!         println!("{}", index.tree().path_of(entry.node));
//!     }
//! });
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod index;
pub mod query;
pub mod server;
pub mod tree;
pub mod trie;
pub mod watcher;

// Re-export commonly used types
pub use config::{FilterConfig, PathFilter};
pub use index::{Index, IndexStats};
pub use query::{QueryRequest, QuerySettings, SearchMode};
pub use server::WireRequest;
pub use tree::{NodeId, PathTree, TreeError};
pub use trie::{FileEntry, NameTrie};
pub use watcher::{ChangeKind, DirChange};
