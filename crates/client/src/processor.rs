//! Single-owner event loop for the print queue.
//!
//! [`run`] owns the [`QueueSynchronizer`] and handles one event at a time:
//! push-channel events from [`run_push_loop`](crate::push::run_push_loop)
//! and [`QueueCommand`]s sent by the UI layer through a [`QueueHandle`].
//! Nothing else touches the queue, so each mutation is applied whole.

use printq_core::queue::QueueEntry;
use printq_core::types::EntryId;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::push::PushEvent;
use crate::synchronizer::{QueueSynchronizer, SyncError};
use crate::transport::{QueueTransport, StartMode};

/// Buffered commands before senders wait.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

/// A UI request, answered on its `reply` channel.
#[derive(Debug)]
pub enum QueueCommand {
    AddEntry {
        file_name: String,
        copies: u32,
        reply: Reply<EntryId>,
    },
    AddPlaceholder {
        reply: Reply<EntryId>,
    },
    AddSelectedFile {
        reply: Reply<EntryId>,
    },
    MoveUp {
        id: EntryId,
        reply: Reply<bool>,
    },
    MoveDown {
        id: EntryId,
        reply: Reply<bool>,
    },
    Remove {
        id: EntryId,
        reply: Reply<bool>,
    },
    SetCopies {
        id: EntryId,
        copies: u32,
        reply: Reply<bool>,
    },
    Clear {
        reply: Reply<()>,
    },
    Start {
        mode: StartMode,
        reply: Reply<()>,
    },
    Refresh {
        reply: Reply<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<QueueEntry>>,
    },
}

/// Errors returned to [`QueueHandle`] callers.
#[derive(Debug, thiserror::Error)]
pub enum QueueHandleError {
    /// The event loop is no longer running.
    #[error("Queue event loop has stopped")]
    Closed,

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Cloneable front end for sending commands to the event loop.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<QueueCommand>,
}

impl QueueHandle {
    /// Create a handle and the receiver to pass to [`run`].
    pub fn channel() -> (Self, mpsc::Receiver<QueueCommand>) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    pub async fn add_entry(
        &self,
        file_name: impl Into<String>,
        copies: u32,
    ) -> Result<EntryId, QueueHandleError> {
        let file_name = file_name.into();
        Ok(self
            .request(|reply| QueueCommand::AddEntry {
                file_name,
                copies,
                reply,
            })
            .await??)
    }

    pub async fn add_placeholder(&self) -> Result<EntryId, QueueHandleError> {
        Ok(self
            .request(|reply| QueueCommand::AddPlaceholder { reply })
            .await??)
    }

    pub async fn add_selected_file(&self) -> Result<EntryId, QueueHandleError> {
        Ok(self
            .request(|reply| QueueCommand::AddSelectedFile { reply })
            .await??)
    }

    pub async fn move_up(&self, id: EntryId) -> Result<bool, QueueHandleError> {
        Ok(self
            .request(|reply| QueueCommand::MoveUp { id, reply })
            .await??)
    }

    pub async fn move_down(&self, id: EntryId) -> Result<bool, QueueHandleError> {
        Ok(self
            .request(|reply| QueueCommand::MoveDown { id, reply })
            .await??)
    }

    pub async fn remove(&self, id: EntryId) -> Result<bool, QueueHandleError> {
        Ok(self
            .request(|reply| QueueCommand::Remove { id, reply })
            .await??)
    }

    pub async fn set_copies(&self, id: EntryId, copies: u32) -> Result<bool, QueueHandleError> {
        Ok(self
            .request(|reply| QueueCommand::SetCopies { id, copies, reply })
            .await??)
    }

    pub async fn clear(&self) -> Result<(), QueueHandleError> {
        Ok(self.request(|reply| QueueCommand::Clear { reply }).await??)
    }

    pub async fn start(&self, mode: StartMode) -> Result<(), QueueHandleError> {
        Ok(self
            .request(|reply| QueueCommand::Start { mode, reply })
            .await??)
    }

    /// Re-read the server queue.
    pub async fn refresh(&self) -> Result<(), QueueHandleError> {
        Ok(self.request(|reply| QueueCommand::Refresh { reply }).await??)
    }

    /// Current entries, in order.
    pub async fn snapshot(&self) -> Result<Vec<QueueEntry>, QueueHandleError> {
        self.request(|reply| QueueCommand::Snapshot { reply }).await
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> QueueCommand,
    ) -> Result<R, QueueHandleError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| QueueHandleError::Closed)?;
        rx.await.map_err(|_| QueueHandleError::Closed)
    }
}

/// Drive the queue until `cancel` fires or both input channels close.
///
/// The server queue is fetched on every push (re)connect, since pushes
/// sent while disconnected are lost.
pub async fn run<T: QueueTransport>(
    mut sync: QueueSynchronizer<T>,
    mut push_rx: mpsc::Receiver<PushEvent>,
    mut commands: mpsc::Receiver<QueueCommand>,
    cancel: CancellationToken,
) {
    let mut push_open = true;
    let mut commands_open = true;

    while push_open || commands_open {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Queue event loop cancelled");
                return;
            }
            event = push_rx.recv(), if push_open => match event {
                Some(event) => handle_push_event(&mut sync, event).await,
                None => push_open = false,
            },
            command = commands.recv(), if commands_open => match command {
                Some(command) => handle_command(&mut sync, command).await,
                None => commands_open = false,
            },
        }
    }

    tracing::info!("Queue event loop inputs closed");
}

async fn handle_push_event<T: QueueTransport>(sync: &mut QueueSynchronizer<T>, event: PushEvent) {
    match event {
        PushEvent::Connected => {
            if let Err(e) = sync.fetch_remote_queue().await {
                tracing::error!(error = %e, "Failed to load print queue after connect");
            }
        }
        PushEvent::Disconnected => {
            tracing::warn!("Push channel disconnected, queue may be stale");
        }
        PushEvent::Message(message) => {
            if let Err(e) = sync.handle_push(message).await {
                tracing::error!(error = %e, "Failed to apply push message");
            }
        }
    }
}

async fn handle_command<T: QueueTransport>(sync: &mut QueueSynchronizer<T>, command: QueueCommand) {
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        QueueCommand::AddEntry {
            file_name,
            copies,
            reply,
        } => {
            let _ = reply.send(sync.add_entry(file_name, copies).await);
        }
        QueueCommand::AddPlaceholder { reply } => {
            let _ = reply.send(sync.add_placeholder().await);
        }
        QueueCommand::AddSelectedFile { reply } => {
            let _ = reply.send(sync.add_selected_file().await);
        }
        QueueCommand::MoveUp { id, reply } => {
            let _ = reply.send(sync.move_up(id).await);
        }
        QueueCommand::MoveDown { id, reply } => {
            let _ = reply.send(sync.move_down(id).await);
        }
        QueueCommand::Remove { id, reply } => {
            let _ = reply.send(sync.remove_entry(id).await);
        }
        QueueCommand::SetCopies { id, copies, reply } => {
            let _ = reply.send(sync.set_copies(id, copies).await);
        }
        QueueCommand::Clear { reply } => {
            let _ = reply.send(sync.clear().await);
        }
        QueueCommand::Start { mode, reply } => {
            let _ = reply.send(sync.start(mode).await);
        }
        QueueCommand::Refresh { reply } => {
            let _ = reply.send(sync.fetch_remote_queue().await);
        }
        QueueCommand::Snapshot { reply } => {
            let _ = reply.send(sync.entries().to_vec());
        }
    }
}
