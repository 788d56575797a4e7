//! Query engine
//!
//! Dispatches a request to the matching trie traversal, reconstructs
//! absolute paths and streams them into the reply channel. The default
//! ordering is worst-first (longest path, or highest skipped count for
//! fuzzy), so the best hit lands right above an interactive prompt;
//! `reverse_sort` flips to best-first. `no_sort` skips collection
//! entirely and streams results in trie order for minimal latency to the
//! first hit.

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::index::Index;

/// How the query pattern is matched against basenames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Basename starts with the pattern
    #[default]
    Prefix,
    /// Basename contains the pattern contiguously
    Substring,
    /// Basename contains the pattern as a subsequence
    Fuzzy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuerySettings {
    pub mode: SearchMode,
    #[serde(default)]
    pub no_sort: bool,
    #[serde(default)]
    pub reverse_sort: bool,
}

/// One query plus the channel its results stream into
///
/// The reply sender is dropped when processing finishes, which closes
/// the sink exactly once, on the happy path and on empty results alike.
/// Sends to a sink whose reader is gone are dropped silently.
pub struct QueryRequest {
    pub query: String,
    pub settings: QuerySettings,
    pub reply: Sender<String>,
}

/// Execute one request against the index and stream the results
pub fn run(index: &Index, request: QueryRequest) {
    let QueryRequest {
        query,
        settings,
        reply,
    } = request;
    let pattern = query.as_bytes();

    match settings.mode {
        SearchMode::Prefix | SearchMode::Substring => {
            let visit = |cb: &mut dyn FnMut(&[crate::trie::FileEntry])| match settings.mode {
                SearchMode::Prefix => index.names().visit_subtree(pattern, |_, e| cb(e)),
                SearchMode::Substring => index.names().visit_substring(pattern, |_, e| cb(e)),
                SearchMode::Fuzzy => unreachable!(),
            };

            if settings.no_sort {
                visit(&mut |entries| {
                    for entry in entries {
                        let _ = reply.send(index.tree().path_of(entry.node));
                    }
                });
                return;
            }

            let mut results: Vec<String> = Vec::new();
            visit(&mut |entries| {
                for entry in entries {
                    results.push(index.tree().path_of(entry.node));
                }
            });
            // Stable by length, so equal-length paths keep trie order
            results.sort_by_key(String::len);
            if !settings.reverse_sort {
                results.reverse();
            }
            for path in results {
                let _ = reply.send(path);
            }
        }
        SearchMode::Fuzzy => {
            if settings.no_sort {
                index.names().visit_fuzzy(pattern, |_, entries, _| {
                    for entry in entries {
                        let _ = reply.send(index.tree().path_of(entry.node));
                    }
                });
                return;
            }

            let mut results: Vec<(usize, String)> = Vec::new();
            index.names().visit_fuzzy(pattern, |_, entries, skipped| {
                for entry in entries {
                    results.push((skipped, index.tree().path_of(entry.node)));
                }
            });
            results.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.len().cmp(&b.1.len())));
            if !settings.reverse_sort {
                results.reverse();
            }
            for (_, path) in results {
                let _ = reply.send(path);
            }
        }
    }
}
