//! Network seam between the synchronizer and the print server.
//!
//! [`QueueTransport`] lists every request the synchronizer makes.
//! [`PrintQueueApi`](crate::api::PrintQueueApi) is the HTTP
//! implementation; tests substitute an in-memory recorder.

use async_trait::async_trait;
use printq_core::types::FlatQueue;
use serde::Serialize;

use crate::api::PrintQueueApiError;

/// How the server should work through a started queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// Print each queued file once, in order.
    Sequential,
    /// Loop over the queue until stopped on the server.
    Continuous,
}

/// Requests the synchronizer issues against the print server.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Read the server's flat queue.
    async fn fetch_queue(&self) -> Result<FlatQueue, PrintQueueApiError>;

    /// Replace the server's queue with `flat`.
    async fn push_queue(&self, flat: &[String]) -> Result<(), PrintQueueApiError>;

    /// Hand `flat` to the server and start printing it.
    async fn start(&self, flat: &[String], mode: StartMode) -> Result<(), PrintQueueApiError>;

    /// Consume the server-side file selection.
    async fn clear_selected_file(&self) -> Result<(), PrintQueueApiError>;

    /// The file currently selected on the server, if any.
    async fn selected_file(&self) -> Result<Option<String>, PrintQueueApiError>;
}
