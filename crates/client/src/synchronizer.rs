//! Client-side owner of the print queue.
//!
//! [`QueueSynchronizer`] applies local edits, writes the flat queue to
//! the server whenever it actually changed, and folds server pushes back
//! into the local queue.
//!
//! Consistency: there is no version number on the server queue. A local
//! write and an inbound `set_queue` push can cross in flight, and whichever
//! is applied last wins. `last_sent` only suppresses redundant writes.

use chrono::Utc;
use printq_core::error::CoreError;
use printq_core::queue::{PrintQueue, QueueEntry};
use printq_core::types::{EntryId, FlatQueue};
use tokio::sync::broadcast;

use crate::api::PrintQueueApiError;
use crate::events::QueueEvent;
use crate::messages::PrintQueueMessage;
use crate::transport::{QueueTransport, StartMode};

/// Errors surfaced to the UI layer. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A request to the print server failed.
    #[error("Network error: {0}")]
    Network(#[from] PrintQueueApiError),

    /// The requested edit is invalid for the current queue.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Holds the sync flag for the duration of a bulk update and clears it on
/// every exit path, unwinding included.
struct SuppressSync<'a> {
    flag: &'a mut bool,
}

impl<'a> SuppressSync<'a> {
    fn engage(flag: &'a mut bool) -> Self {
        *flag = true;
        Self { flag }
    }
}

impl Drop for SuppressSync<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

/// Local print queue kept eventually consistent with the server's.
pub struct QueueSynchronizer<T> {
    transport: T,
    queue: PrintQueue,
    /// Flat queue most recently sent to (or received from) the server.
    last_sent: FlatQueue,
    suppress_sync: bool,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl<T: QueueTransport> QueueSynchronizer<T> {
    pub fn new(transport: T, event_tx: broadcast::Sender<QueueEvent>) -> Self {
        Self {
            transport,
            queue: PrintQueue::new(),
            last_sent: Vec::new(),
            suppress_sync: false,
            event_tx,
        }
    }

    pub fn entries(&self) -> &[QueueEntry] {
        self.queue.entries()
    }

    /// The flat queue last written to or read from the server.
    pub fn last_sent(&self) -> &[String] {
        &self.last_sent
    }

    pub fn is_sync_suppressed(&self) -> bool {
        self.suppress_sync
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Subscribe to queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// Read the server's queue and rebuild the local one from it.
    ///
    /// On failure the local queue is left untouched.
    pub async fn fetch_remote_queue(&mut self) -> Result<(), SyncError> {
        let flat = self.transport.fetch_queue().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to fetch print queue");
            e
        })?;
        self.replace_from_remote(&flat);
        Ok(())
    }

    /// Rebuild the local queue from the server's flat list.
    ///
    /// Adjacent equal filenames collapse into one entry. Never writes back
    /// to the server.
    pub fn replace_from_remote(&mut self, flat: &[String]) {
        let flat_len = flat.len();
        self.bulk_update(|queue| queue.replace_from_flat(flat));
        self.last_sent = self.queue.flatten();

        tracing::info!(
            entries = self.queue.len(),
            prints = flat_len,
            "Received print queue from server",
        );
        self.emit(QueueEvent::Replaced {
            entries: self.queue.entries().to_vec(),
            at: Utc::now(),
        });
    }

    /// Write the flat queue to the server if it differs from `last_sent`.
    ///
    /// Returns whether a write was issued. `last_sent` is updated before the
    /// request goes out, so a failed write is not resent until the queue
    /// changes again.
    pub async fn on_queue_mutated(&mut self) -> Result<bool, SyncError> {
        if self.suppress_sync {
            return Ok(false);
        }

        let current = self.queue.flatten();
        if current == self.last_sent {
            return Ok(false);
        }

        tracing::info!(prints = current.len(), "Print queue changed, sending to server");
        self.last_sent = current;

        match self.transport.push_queue(&self.last_sent).await {
            Ok(()) => {
                self.emit(QueueEvent::Synced {
                    flat: self.last_sent.clone(),
                    at: Utc::now(),
                });
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send print queue");
                self.emit(QueueEvent::SyncFailed {
                    error: e.to_string(),
                    at: Utc::now(),
                });
                Err(e.into())
            }
        }
    }

    /// Append `copies` prints of `file_name`.
    pub async fn add_entry(
        &mut self,
        file_name: impl Into<String>,
        copies: u32,
    ) -> Result<EntryId, SyncError> {
        let id = self.queue.push(file_name, copies)?;
        self.after_local_change().await?;
        Ok(id)
    }

    /// Append an empty row to be filled by the next `file_selected` push.
    pub async fn add_placeholder(&mut self) -> Result<EntryId, SyncError> {
        let id = self.queue.push_placeholder();
        self.after_local_change().await?;
        Ok(id)
    }

    /// Append the server's selected file, or a placeholder when nothing is
    /// selected yet.
    pub async fn add_selected_file(&mut self) -> Result<EntryId, SyncError> {
        match self.transport.selected_file().await? {
            Some(file_name) => self.add_entry(file_name, 1).await,
            None => self.add_placeholder().await,
        }
    }

    /// Move an entry one row towards the head. Returns `false` when it is
    /// already first or unknown.
    pub async fn move_up(&mut self, id: EntryId) -> Result<bool, SyncError> {
        if !self.queue.move_up(id) {
            return Ok(false);
        }
        self.after_local_change().await?;
        Ok(true)
    }

    /// Move an entry one row towards the tail. Returns `false` when it is
    /// already last or unknown.
    pub async fn move_down(&mut self, id: EntryId) -> Result<bool, SyncError> {
        if !self.queue.move_down(id) {
            return Ok(false);
        }
        self.after_local_change().await?;
        Ok(true)
    }

    /// Remove an entry. Returns `false` when the id is unknown.
    pub async fn remove_entry(&mut self, id: EntryId) -> Result<bool, SyncError> {
        if self.queue.remove(id).is_none() {
            return Ok(false);
        }
        self.after_local_change().await?;
        Ok(true)
    }

    /// Change how many times an entry is printed.
    pub async fn set_copies(&mut self, id: EntryId, copies: u32) -> Result<bool, SyncError> {
        if !self.queue.set_copies(id, copies)? {
            return Ok(false);
        }
        self.after_local_change().await?;
        Ok(true)
    }

    /// Empty the queue.
    pub async fn clear(&mut self) -> Result<(), SyncError> {
        if self.queue.clear() {
            self.emit_changed();
        }
        self.on_queue_mutated().await?;
        Ok(())
    }

    /// Print the queue once, in order.
    pub async fn start_queue(&mut self) -> Result<(), SyncError> {
        self.start(StartMode::Sequential).await
    }

    /// Print the queue in a loop.
    pub async fn start_continuous(&mut self) -> Result<(), SyncError> {
        self.start(StartMode::Continuous).await
    }

    /// Hand the flat queue to the server's start endpoint, then consume any
    /// pending selection. Execution itself belongs to the server.
    ///
    /// `Started` is emitted as soon as the start request succeeds; a failed
    /// clear afterwards is still returned as an error.
    pub async fn start(&mut self, mode: StartMode) -> Result<(), SyncError> {
        let flat = self.queue.flatten();
        self.last_sent = flat.clone();

        tracing::info!(?mode, prints = flat.len(), "Starting print queue");
        self.transport.start(&flat, mode).await?;
        self.emit(QueueEvent::Started {
            mode,
            flat,
            at: Utc::now(),
        });

        self.transport.clear_selected_file().await.map_err(|e| {
            tracing::warn!(error = %e, "Queue started but selection was not cleared");
            e
        })?;
        Ok(())
    }

    /// Fill every placeholder with a file the server reports as selected.
    ///
    /// Returns how many rows were filled. When any were, the selection is
    /// consumed with a single clear request and the changed queue is synced.
    /// The sync runs even if the clear fails; the first error is returned.
    pub async fn on_remote_file_selected(&mut self, file_name: &str) -> Result<usize, SyncError> {
        if file_name.is_empty() {
            return Ok(0);
        }

        let filled = self.queue.fill_placeholders(file_name);
        if filled == 0 {
            tracing::debug!(file_name, "File selected with no placeholder waiting");
            return Ok(0);
        }

        tracing::info!(file_name, filled, "Filled placeholder from selected file");
        self.emit_changed();
        let cleared = self.transport.clear_selected_file().await;
        if let Err(e) = &cleared {
            tracing::warn!(error = %e, "Failed to clear selected file");
        }
        let synced = self.on_queue_mutated().await;

        cleared?;
        synced?;
        Ok(filled)
    }

    /// Apply a message received on the push channel.
    pub async fn handle_push(&mut self, message: PrintQueueMessage) -> Result<(), SyncError> {
        match message {
            PrintQueueMessage::SetQueue { print_queue } => {
                self.replace_from_remote(&print_queue);
            }
            PrintQueueMessage::FileSelected { filename } => {
                self.on_remote_file_selected(&filename).await?;
            }
        }
        Ok(())
    }

    // ---- private helpers ----

    /// Run `update` with outbound sync suppressed.
    fn bulk_update<R>(&mut self, update: impl FnOnce(&mut PrintQueue) -> R) -> R {
        let _guard = SuppressSync::engage(&mut self.suppress_sync);
        update(&mut self.queue)
    }

    async fn after_local_change(&mut self) -> Result<bool, SyncError> {
        self.emit_changed();
        self.on_queue_mutated().await
    }

    fn emit_changed(&self) {
        self.emit(QueueEvent::Changed {
            entries: self.queue.entries().to_vec(),
            at: Utc::now(),
        });
    }

    /// Broadcast an event. No subscribers is not an error.
    fn emit(&self, event: QueueEvent) {
        let _ = self.event_tx.send(event);
    }
}
