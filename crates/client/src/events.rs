//! Queue events broadcast to UI subscribers.
//!
//! The synchronizer emits one of these after each change to the local
//! queue or each outbound sync, so a view layer can re-render without
//! polling.

use printq_core::queue::QueueEntry;
use printq_core::types::{FlatQueue, Timestamp};
use serde::Serialize;

use crate::transport::StartMode;

/// A change in the local queue or in its sync state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueEvent {
    /// The queue was rebuilt from the server's list.
    Replaced {
        entries: Vec<QueueEntry>,
        at: Timestamp,
    },

    /// A local mutation changed the queue.
    Changed {
        entries: Vec<QueueEntry>,
        at: Timestamp,
    },

    /// The flat queue was written to the server.
    Synced { flat: FlatQueue, at: Timestamp },

    /// A write to the server failed. Not retried.
    SyncFailed { error: String, at: Timestamp },

    /// The queue was handed to the server for printing.
    Started {
        mode: StartMode,
        flat: FlatQueue,
        at: Timestamp,
    },
}
