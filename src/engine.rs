//! Event loop
//!
//! Single-threaded multiplexer over the change-event channel and the
//! request channel. This thread is the sole owner of the index: every
//! mutation and every read happens here, one message at a time, which is
//! what keeps the tree/trie invariants lock-free. A large query
//! head-of-line blocks subsequent changes; that is the intended trade.

use crossbeam_channel::{never, select, Receiver};

use crate::index::Index;
use crate::query::{self, QueryRequest};
use crate::watcher::DirChange;

/// Run the event loop until every producer has disconnected
///
/// Change events are applied in delivery order; a query observes all
/// changes processed before it and none after. Individual operations
/// log failures and continue; the loop itself never fails.
pub fn run(mut index: Index, changes: Receiver<DirChange>, requests: Receiver<QueryRequest>) {
    let mut changes = changes;
    let mut requests = requests;
    let mut changes_open = true;
    let mut requests_open = true;

    while changes_open || requests_open {
        select! {
            recv(changes) -> msg => match msg {
                Ok(change) => {
                    log::debug!("change in {} ({:?})", change.dir, change.kind);
                    index.refresh(&change.dir);
                }
                Err(_) => {
                    changes = never();
                    changes_open = false;
                }
            },
            recv(requests) -> msg => match msg {
                Ok(request) => query::run(&index, request),
                Err(_) => {
                    requests = never();
                    requests_open = false;
                }
            },
        }
    }
    log::info!("event loop stopped: all producers disconnected");
}
