//! Unix-socket request transport
//!
//! The daemon answers queries from thin clients over a Unix domain
//! socket. Each connection carries exactly one request (a single JSON
//! line) and receives matching paths back, one per line, until the
//! engine closes the sink. The transport owns nothing: it forwards
//! requests into the event loop and copies the reply stream onto the
//! socket.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender};
use serde::{Deserialize, Serialize};

use crate::query::{QueryRequest, QuerySettings, SearchMode};

pub const DEFAULT_SOCKET: &str = "/tmp/snapfind.sock";

/// Per-request reply buffer; the engine blocks when the client reads
/// slower than this
const RESPONSE_QUEUE: usize = 1024;

/// The on-wire request format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    pub query: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub no_sort: bool,
    #[serde(default)]
    pub reverse_sort: bool,
}

/// Accept connections forever, one handler thread per client
pub fn serve(socket_path: &Path, requests: Sender<QueryRequest>) -> Result<()> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)
            .with_context(|| format!("failed to remove stale socket {:?}", socket_path))?;
    }
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("failed to bind socket {:?}", socket_path))?;
    log::info!("listening on {:?}", socket_path);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let requests = requests.clone();
                thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, requests) {
                        log::warn!("connection error: {:#}", err);
                    }
                });
            }
            Err(err) => log::warn!("accept failed: {}", err),
        }
    }
    Ok(())
}

fn handle_connection(stream: UnixStream, requests: Sender<QueryRequest>) -> Result<()> {
    let mut reader =
        BufReader::new(stream.try_clone().context("failed to clone connection")?);
    let mut line = String::new();
    reader.read_line(&mut line).context("failed to read request")?;
    let wire: WireRequest =
        serde_json::from_str(line.trim_end()).context("malformed request")?;
    log::debug!("query {:?} ({:?})", wire.query, wire.mode);

    let (reply_tx, reply_rx) = bounded(RESPONSE_QUEUE);
    requests
        .send(QueryRequest {
            query: wire.query,
            settings: QuerySettings {
                mode: wire.mode,
                no_sort: wire.no_sort,
                reverse_sort: wire.reverse_sort,
            },
            reply: reply_tx,
        })
        .context("index engine is not running")?;

    let mut writer = BufWriter::new(stream);
    let mut client_gone = false;
    for path in reply_rx.iter() {
        // Keep draining after a write failure so the engine's sends
        // never block on a dead client
        if client_gone {
            continue;
        }
        if writeln!(writer, "{}", path).is_err() {
            client_gone = true;
        }
    }
    writer.flush().ok();
    Ok(())
}

/// Send one request to a running daemon and copy the results to `out`
pub fn query_daemon(
    socket_path: &Path,
    request: &WireRequest,
    out: &mut impl Write,
) -> Result<()> {
    let stream = UnixStream::connect(socket_path)
        .with_context(|| format!("couldn't connect to daemon at {:?}", socket_path))?;

    let mut writer = BufWriter::new(stream.try_clone().context("failed to clone connection")?);
    serde_json::to_writer(&mut writer, request).context("failed to send request")?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);
    stream.shutdown(std::net::Shutdown::Write).ok();

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line.context("connection lost")?;
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_request_defaults() {
        let wire: WireRequest = serde_json::from_str(r#"{"query": "readme"}"#).unwrap();
        assert_eq!(wire.query, "readme");
        assert_eq!(wire.mode, SearchMode::Prefix);
        assert!(!wire.no_sort);
        assert!(!wire.reverse_sort);
    }

    #[test]
    fn test_wire_request_roundtrip() {
        let wire = WireRequest {
            query: "main.rs".to_string(),
            mode: SearchMode::Fuzzy,
            no_sort: false,
            reverse_sort: true,
        };
        let json = serde_json::to_string(&wire).unwrap();
        let back: WireRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.query, wire.query);
        assert_eq!(back.mode, SearchMode::Fuzzy);
        assert!(back.reverse_sort);
    }

    #[test]
    fn test_mode_names_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&SearchMode::Substring).unwrap(),
            r#""substring""#
        );
        let mode: SearchMode = serde_json::from_str(r#""fuzzy""#).unwrap();
        assert_eq!(mode, SearchMode::Fuzzy);
    }
}
