//! REST client for the `print_queue` plugin endpoints.
//!
//! Wraps the plugin's HTTP API (queue read/write, start, selection
//! handling) using [`reqwest`]. Every request carries the host API key.

use std::time::Duration;

use async_trait::async_trait;
use printq_core::protocol::{
    plugin_url, API_KEY_HEADER, PATH_CLEAR_SELECTED_FILE, PATH_QUEUE, PATH_SELECTED_FILE,
    PATH_START, PATH_START_CONTINUOUS,
};
use printq_core::types::FlatQueue;
use serde::Deserialize;

use crate::transport::{QueueTransport, StartMode};

/// HTTP client for the print queue plugin on a single host.
pub struct PrintQueueApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Body of `GET /queue`.
#[derive(Debug, Deserialize)]
pub struct QueueResponse {
    pub print_queue: FlatQueue,
}

/// Body of `GET /selected_file`.
#[derive(Debug, Deserialize)]
pub struct SelectedFileResponse {
    /// `null`, missing, or empty when nothing is selected.
    #[serde(default)]
    pub filename: Option<String>,
}

/// Errors from the print queue REST layer.
#[derive(Debug, thiserror::Error)]
pub enum PrintQueueApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The host returned a non-2xx status code.
    #[error("Print queue API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl PrintQueueApi {
    /// Create a client for a host.
    ///
    /// * `base_url` - host root, e.g. `http://octopi.local`.
    /// * `api_key`  - value sent in the `X-Api-Key` header.
    pub fn new(base_url: String, api_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, PrintQueueApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read the server queue via `GET /queue`.
    pub async fn get_queue(&self) -> Result<FlatQueue, PrintQueueApiError> {
        let response = self
            .client
            .get(self.url(PATH_QUEUE))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let body: QueueResponse = Self::parse_response(response).await?;
        Ok(body.print_queue)
    }

    /// Replace the server queue via `POST /queue`.
    pub async fn set_queue(&self, flat: &[String]) -> Result<(), PrintQueueApiError> {
        self.post_flat(PATH_QUEUE, flat).await
    }

    /// Start printing `flat` in order via `POST /start`.
    pub async fn start_queue(&self, flat: &[String]) -> Result<(), PrintQueueApiError> {
        self.post_flat(PATH_START, flat).await
    }

    /// Start printing `flat` in a loop via `POST /start_continuous`.
    pub async fn start_continuous(&self, flat: &[String]) -> Result<(), PrintQueueApiError> {
        self.post_flat(PATH_START_CONTINUOUS, flat).await
    }

    /// Drop the server-side file selection via `POST /clear_selected_file`.
    pub async fn clear_selected_file(&self) -> Result<(), PrintQueueApiError> {
        let response = self
            .client
            .post(self.url(PATH_CLEAR_SELECTED_FILE))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Query the selected file via `GET /selected_file`.
    ///
    /// An empty filename is reported as `None`.
    pub async fn get_selected_file(&self) -> Result<Option<String>, PrintQueueApiError> {
        let response = self
            .client
            .get(self.url(PATH_SELECTED_FILE))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let body: SelectedFileResponse = Self::parse_response(response).await?;
        Ok(body.filename.filter(|name| !name.is_empty()))
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        plugin_url(&self.base_url, path)
    }

    async fn post_flat(&self, path: &str, flat: &[String]) -> Result<(), PrintQueueApiError> {
        let response = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(flat)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`PrintQueueApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PrintQueueApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PrintQueueApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PrintQueueApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), PrintQueueApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl QueueTransport for PrintQueueApi {
    async fn fetch_queue(&self) -> Result<FlatQueue, PrintQueueApiError> {
        self.get_queue().await
    }

    async fn push_queue(&self, flat: &[String]) -> Result<(), PrintQueueApiError> {
        self.set_queue(flat).await
    }

    async fn start(&self, flat: &[String], mode: StartMode) -> Result<(), PrintQueueApiError> {
        match mode {
            StartMode::Sequential => self.start_queue(flat).await,
            StartMode::Continuous => self.start_continuous(flat).await,
        }
    }

    async fn clear_selected_file(&self) -> Result<(), PrintQueueApiError> {
        PrintQueueApi::clear_selected_file(self).await
    }

    async fn selected_file(&self) -> Result<Option<String>, PrintQueueApiError> {
        self.get_selected_file().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_response_parses_flat_list() {
        let json = r#"{"print_queue":["a.gcode","a.gcode","b.gcode"]}"#;
        let body: QueueResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.print_queue, vec!["a.gcode", "a.gcode", "b.gcode"]);
    }

    #[test]
    fn queue_response_requires_print_queue() {
        assert!(serde_json::from_str::<QueueResponse>("{}").is_err());
    }

    #[test]
    fn selected_file_response_accepts_null_and_missing() {
        let body: SelectedFileResponse = serde_json::from_str(r#"{"filename":null}"#).unwrap();
        assert!(body.filename.is_none());
        let body: SelectedFileResponse = serde_json::from_str("{}").unwrap();
        assert!(body.filename.is_none());
    }

    #[test]
    fn urls_point_at_plugin_routes() {
        let api = PrintQueueApi::new("http://octopi.local/".into(), "key".into());
        assert_eq!(
            api.url(PATH_START_CONTINUOUS),
            "http://octopi.local/plugin/print_queue/start_continuous"
        );
    }
}
