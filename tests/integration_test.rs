//! Integration tests for snapfind
//!
//! End-to-end coverage of the index lifecycle: populate, mutate the
//! filesystem, refresh, query, plus one full daemon round trip over the
//! Unix socket.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use snapfind::{
    engine, query, server, DirChange, FilterConfig, Index, PathFilter, QueryRequest,
    QuerySettings, SearchMode, WireRequest,
};
use tempfile::TempDir;

fn fresh_index() -> Index {
    Index::new(Arc::new(PathFilter::allow_all()))
}

fn run_query(index: &Index, pattern: &str, mode: SearchMode, reverse_sort: bool) -> Vec<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    query::run(
        index,
        QueryRequest {
            query: pattern.to_string(),
            settings: QuerySettings {
                mode,
                no_sort: false,
                reverse_sort,
            },
            reply: tx,
        },
    );
    rx.iter().collect()
}

// ==================== Refresh Scenarios ====================

#[test]
fn test_create_then_query() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();

    // Start from an empty index and let a single refresh of the root
    // discover the new directory recursively
    let mut index = fresh_index();
    std::fs::create_dir(temp.path().join("a")).unwrap();
    std::fs::write(temp.path().join("a/foo.txt"), "").unwrap();
    std::fs::write(temp.path().join("a/bar.txt"), "").unwrap();
    index.refresh(&root);

    assert_eq!(
        run_query(&index, "foo", SearchMode::Prefix, false),
        vec![format!("{root}/a/foo.txt")]
    );

    // Empty prefix matches every indexed name, longest path first; the
    // two equal-length files keep reversed trie order
    let all = run_query(&index, "", SearchMode::Prefix, false);
    assert_eq!(all[0], format!("{root}/a/foo.txt"));
    assert_eq!(all[1], format!("{root}/a/bar.txt"));
    assert!(all.contains(&format!("{root}/a")));
}

#[test]
fn test_vanished_directory_is_dropped_on_refresh() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();
    std::fs::create_dir(temp.path().join("a")).unwrap();
    std::fs::write(temp.path().join("a/x"), "").unwrap();
    std::fs::write(temp.path().join("a/y"), "").unwrap();

    let mut index = fresh_index();
    index.initial_scan(temp.path());
    assert_eq!(run_query(&index, "x", SearchMode::Prefix, false).len(), 1);

    std::fs::remove_dir_all(temp.path().join("a")).unwrap();
    index.refresh(&root);

    assert!(run_query(&index, "x", SearchMode::Prefix, false).is_empty());
    assert!(run_query(&index, "y", SearchMode::Prefix, false).is_empty());
    assert!(index.tree().lookup(&format!("{root}/a")).is_none());
}

#[test]
fn test_filtered_paths_never_enter_the_index() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();
    std::fs::create_dir(temp.path().join("cache")).unwrap();
    std::fs::write(temp.path().join("cache/blob.bin"), "").unwrap();
    std::fs::write(temp.path().join("kept.txt"), "").unwrap();

    let config = FilterConfig {
        exclude: vec![format!("{root}/cache")],
        include: Vec::new(),
    };
    let mut index = Index::new(Arc::new(config.compile().unwrap()));
    index.initial_scan(temp.path());

    assert!(run_query(&index, "cache", SearchMode::Prefix, false).is_empty());
    assert!(run_query(&index, "blob.bin", SearchMode::Prefix, false).is_empty());
    assert_eq!(run_query(&index, "kept.txt", SearchMode::Prefix, false).len(), 1);

    // Still skipped when it shows up again through a refresh
    std::fs::write(temp.path().join("cache/other.bin"), "").unwrap();
    index.refresh(&format!("{root}/cache"));
    assert!(run_query(&index, "other.bin", SearchMode::Prefix, false).is_empty());
}

// ==================== Query Scenarios ====================

#[test]
fn test_fuzzy_ranking_best_result_adjacent_to_prompt() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();
    std::fs::create_dir(temp.path().join("x")).unwrap();
    for name in ["abc", "axbxc", "aXXXXbXXXXc"] {
        std::fs::write(temp.path().join("x").join(name), "").unwrap();
    }

    let mut index = fresh_index();
    index.initial_scan(temp.path());

    // Compare only the fixture files; the temp dir's own random name
    // could fuzzy-match as well
    let under_x = |results: Vec<String>| -> Vec<String> {
        results
            .into_iter()
            .filter(|p| p.starts_with(&format!("{root}/x/")))
            .collect()
    };

    let worst_first = under_x(run_query(&index, "abc", SearchMode::Fuzzy, false));
    assert_eq!(
        worst_first,
        vec![
            format!("{root}/x/aXXXXbXXXXc"),
            format!("{root}/x/axbxc"),
            format!("{root}/x/abc"),
        ]
    );

    let best_first = under_x(run_query(&index, "abc", SearchMode::Fuzzy, true));
    assert_eq!(best_first.first().unwrap(), &format!("{root}/x/abc"));
}

#[test]
fn test_substring_matches_infix_not_elsewhere() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();
    std::fs::create_dir(temp.path().join("p")).unwrap();
    for name in ["report.txt", "export.csv", "note.md"] {
        std::fs::write(temp.path().join("p").join(name), "").unwrap();
    }

    let mut index = fresh_index();
    index.initial_scan(temp.path());

    let results = run_query(&index, "port", SearchMode::Substring, false);
    assert_eq!(
        results,
        vec![
            format!("{root}/p/report.txt"),
            format!("{root}/p/export.csv"),
        ]
    );
}

#[test]
fn test_duplicate_basenames_removed_one_at_a_time() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();
    std::fs::create_dir(temp.path().join("a")).unwrap();
    std::fs::create_dir(temp.path().join("b")).unwrap();
    std::fs::write(temp.path().join("a/README"), "").unwrap();
    std::fs::write(temp.path().join("b/README"), "").unwrap();

    let mut index = fresh_index();
    index.initial_scan(temp.path());

    let both = run_query(&index, "README", SearchMode::Prefix, false);
    assert_eq!(both.len(), 2);
    assert!(both.contains(&format!("{root}/a/README")));
    assert!(both.contains(&format!("{root}/b/README")));

    std::fs::remove_file(temp.path().join("a/README")).unwrap();
    index.refresh(&format!("{root}/a"));
    assert_eq!(
        run_query(&index, "README", SearchMode::Prefix, false),
        vec![format!("{root}/b/README")]
    );

    std::fs::remove_file(temp.path().join("b/README")).unwrap();
    index.refresh(&format!("{root}/b"));
    assert!(run_query(&index, "README", SearchMode::Prefix, false).is_empty());
    assert!(!index.names().contains_key(b"README"));
}

// ==================== Invariants ====================

#[test]
fn test_every_trie_entry_resolves_to_a_live_node() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();
    std::fs::create_dir_all(temp.path().join("d1/d2")).unwrap();
    std::fs::write(temp.path().join("d1/f1"), "").unwrap();
    std::fs::write(temp.path().join("d1/d2/f2"), "").unwrap();

    let mut index = fresh_index();
    index.initial_scan(temp.path());

    std::fs::remove_file(temp.path().join("d1/f1")).unwrap();
    std::fs::write(temp.path().join("d1/f3"), "").unwrap();
    index.refresh(&format!("{root}/d1"));

    let mut entries = 0;
    index.names().visit_subtree(b"", |key, list| {
        for entry in list {
            let path = index.tree().path_of(entry.node);
            assert!(
                index.tree().lookup(&path).is_some(),
                "dangling entry for key {:?}",
                String::from_utf8_lossy(key)
            );
            assert!(path.ends_with(&format!("/{}", String::from_utf8_lossy(key))));
            entries += 1;
        }
    });
    // Every non-root tree node has exactly one trie entry
    assert_eq!(entries, index.tree().len() - 1);
}

// ==================== Daemon Round Trip ====================

#[test]
fn test_daemon_answers_over_unix_socket() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("wanted_by_client.txt"), "").unwrap();

    let mut index = fresh_index();
    index.initial_scan(temp.path());

    let socket = temp.path().join("snapfind-test.sock");
    let (change_tx, change_rx) = crossbeam_channel::bounded::<DirChange>(4);
    let (request_tx, request_rx) = crossbeam_channel::bounded(4);

    thread::spawn(move || engine::run(index, change_rx, request_rx));
    let socket_for_server = socket.clone();
    thread::spawn(move || {
        let _ = server::serve(&socket_for_server, request_tx);
    });

    for _ in 0..100 {
        if socket.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    let mut out = Vec::new();
    server::query_daemon(
        &socket,
        &WireRequest {
            query: "wanted_by_client".to_string(),
            mode: SearchMode::Prefix,
            no_sort: false,
            reverse_sort: false,
        },
        &mut out,
    )
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("wanted_by_client.txt"));
    drop(change_tx);
}
