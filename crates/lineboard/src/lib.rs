pub mod plain;
pub mod transport;

use lineboard_core::reconcile::ItemChange;
use lineboard_core::sync::{BoardObserver, BoardView};
use tokio::sync::watch;
use tracing::debug;

/// Publishes the latest view to the renderer task. Older views are
/// superseded, never queued.
pub struct WatchObserver {
    tx: watch::Sender<BoardView>,
}

impl WatchObserver {
    pub fn new(tx: watch::Sender<BoardView>) -> Self {
        Self { tx }
    }
}

impl BoardObserver for WatchObserver {
    fn board_changed(&mut self, view: &BoardView, changes: &[ItemChange]) {
        if !changes.is_empty() {
            debug!(event = "board_changes", count = changes.len());
        }
        self.tx.send_replace(view.clone());
    }
}
