//! CLI argument parsing and command handlers

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::FilterConfig;
use crate::engine;
use crate::index::Index;
use crate::query::SearchMode;
use crate::server::{self, WireRequest};
use crate::watcher;

/// Change events buffered ahead of the event loop
const CHANGE_QUEUE: usize = 4096;
/// Query requests buffered ahead of the event loop
const REQUEST_QUEUE: usize = 64;

/// snapfind: live filesystem name index
#[derive(Parser, Debug)]
#[command(
    name = "snapfind",
    version,
    about = "Instant filename search over a live, always-current index",
    long_about = "snapfind keeps an in-memory index of every filename under a root \
                  directory and keeps it consistent with the live filesystem by \
                  watching for changes, with no periodic rescans. Queries answer in \
                  milliseconds with prefix, substring or fuzzy matching."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index a directory tree and answer queries over a Unix socket
    Serve {
        /// Root of the tree to index
        #[arg(long, default_value = "/")]
        root: PathBuf,

        /// Socket path to listen on
        #[arg(long, default_value = server::DEFAULT_SOCKET)]
        socket: PathBuf,

        /// Filter config file (JSON with "exclude"/"include" glob lists)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Search the running daemon's index
    ///
    /// Matching modes:
    ///   - Default: basename starts with the pattern
    ///   - --substring: basename contains the pattern anywhere
    ///   - --fuzzy: pattern characters appear in order, gaps allowed
    ///
    /// Results print worst match first so the best one ends up next to
    /// your prompt; use --reverse for best-first.
    Query {
        /// Name or name fragment to search for
        pattern: String,

        /// Match the pattern anywhere in the basename
        #[arg(short, long, conflicts_with = "fuzzy")]
        substring: bool,

        /// Match the pattern as a subsequence of the basename
        #[arg(short, long)]
        fuzzy: bool,

        /// Stream results as found instead of sorting them
        #[arg(long)]
        no_sort: bool,

        /// Print best matches first
        #[arg(short, long)]
        reverse: bool,

        /// Socket path the daemon listens on
        #[arg(long, default_value = server::DEFAULT_SOCKET)]
        socket: PathBuf,
    },
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        // Setup logging based on verbosity
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        match self.command {
            Command::Serve {
                root,
                socket,
                config,
            } => handle_serve(root, socket, config),
            Command::Query {
                pattern,
                substring,
                fuzzy,
                no_sort,
                reverse,
                socket,
            } => {
                let mode = if fuzzy {
                    SearchMode::Fuzzy
                } else if substring {
                    SearchMode::Substring
                } else {
                    SearchMode::Prefix
                };
                let request = WireRequest {
                    query: pattern,
                    mode,
                    no_sort,
                    reverse_sort: reverse,
                };
                server::query_daemon(&socket, &request, &mut std::io::stdout())
            }
        }
    }
}

/// Handle the `serve` subcommand
///
/// Scans the root, then runs watcher + socket server + event loop until
/// interrupted.
fn handle_serve(root: PathBuf, socket: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let config = match config {
        Some(path) => FilterConfig::load(&path)?,
        None => FilterConfig::default(),
    };
    let filter = Arc::new(config.compile()?);

    let root = root
        .canonicalize()
        .with_context(|| format!("cannot resolve root {:?}", root))?;

    let mut index = Index::new(Arc::clone(&filter));
    index.initial_scan(&root);

    let (change_tx, change_rx) = crossbeam_channel::bounded(CHANGE_QUEUE);
    let (request_tx, request_rx) = crossbeam_channel::bounded(REQUEST_QUEUE);

    // Must outlive the event loop; dropping it stops event delivery
    let _watcher = watcher::spawn(&root, Arc::clone(&filter), change_tx)
        .context("failed to start filesystem watcher")?;

    thread::spawn(move || {
        if let Err(err) = server::serve(&socket, request_tx) {
            log::error!("server stopped: {:#}", err);
        }
    });

    engine::run(index, change_rx, request_rx);
    Ok(())
}
