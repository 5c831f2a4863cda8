//! In-memory [`QueueTransport`] that records every request.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use printq_client::api::PrintQueueApiError;
use printq_client::transport::{QueueTransport, StartMode};
use printq_core::types::FlatQueue;

/// One request seen by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchQueue,
    PushQueue(FlatQueue),
    Start(FlatQueue, StartMode),
    ClearSelectedFile,
    SelectedFile,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    remote_queue: FlatQueue,
    selected: Option<String>,
    fail_requests: bool,
    fail_clear: bool,
}

/// Cloneable fake; clones share recorded state.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<State>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_queue(queue: &[&str]) -> Self {
        let transport = Self::new();
        transport.state.lock().unwrap().remote_queue = names(queue);
        transport
    }

    pub fn set_selected(&self, file_name: Option<&str>) {
        self.state.lock().unwrap().selected = file_name.map(str::to_string);
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().fail_requests = failing;
    }

    /// Fail only the clear-selection request.
    pub fn set_failing_clear(&self, failing: bool) {
        self.state.lock().unwrap().fail_clear = failing;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.lock().unwrap().calls)
    }

    pub fn pushes(&self) -> Vec<FlatQueue> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PushQueue(flat) => Some(flat),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }

    fn record(&self, call: Call) -> Result<(), PrintQueueApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail_requests {
            return Err(PrintQueueApiError::ApiError {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl QueueTransport for RecordingTransport {
    async fn fetch_queue(&self) -> Result<FlatQueue, PrintQueueApiError> {
        self.record(Call::FetchQueue)?;
        Ok(self.state.lock().unwrap().remote_queue.clone())
    }

    async fn push_queue(&self, flat: &[String]) -> Result<(), PrintQueueApiError> {
        self.record(Call::PushQueue(flat.to_vec()))?;
        self.state.lock().unwrap().remote_queue = flat.to_vec();
        Ok(())
    }

    async fn start(&self, flat: &[String], mode: StartMode) -> Result<(), PrintQueueApiError> {
        self.record(Call::Start(flat.to_vec(), mode))
    }

    async fn clear_selected_file(&self) -> Result<(), PrintQueueApiError> {
        self.record(Call::ClearSelectedFile)?;
        let mut state = self.state.lock().unwrap();
        if state.fail_clear {
            return Err(PrintQueueApiError::ApiError {
                status: 500,
                body: "clear failed".into(),
            });
        }
        state.selected = None;
        Ok(())
    }

    async fn selected_file(&self) -> Result<Option<String>, PrintQueueApiError> {
        self.record(Call::SelectedFile)?;
        Ok(self.state.lock().unwrap().selected.clone())
    }
}

pub fn names(list: &[&str]) -> FlatQueue {
    list.iter().map(|s| s.to_string()).collect()
}
