//! Client configuration loaded from environment variables.

use std::time::Duration;

/// Default HTTP request timeout.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw WebSocket endpoint path on the host.
const PUSH_PATH: &str = "/sockjs/websocket";

/// Settings for talking to one print server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host root URL, e.g. `http://octopi.local`.
    pub base_url: String,
    /// Host API key sent as `X-Api-Key`.
    pub api_key: String,
    /// Push channel URL.
    pub ws_url: String,
    /// Optional `user:session` token for the push channel.
    pub push_auth: Option<String>,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

/// Configuration problems. Fatal for the binary.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                                  |
    /// |------------------------|------------------------------------------|
    /// | `OCTOPRINT_URL`        | required                                 |
    /// | `OCTOPRINT_API_KEY`    | required                                 |
    /// | `OCTOPRINT_WS_URL`     | `OCTOPRINT_URL` as ws(s) + `/sockjs/websocket` |
    /// | `PUSH_AUTH`            | unset                                    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let base_url = required("OCTOPRINT_URL")?.trim_end_matches('/').to_string();
        let api_key = required("OCTOPRINT_API_KEY")?;

        let ws_url = match lookup("OCTOPRINT_WS_URL").filter(|v| !v.is_empty()) {
            Some(url) => url,
            None => derive_ws_url(&base_url).ok_or_else(|| ConfigError::Invalid {
                var: "OCTOPRINT_URL",
                value: base_url.clone(),
            })?,
        };

        let push_auth = lookup("PUSH_AUTH").filter(|v| !v.is_empty());

        let request_timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_SECS",
                value,
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            api_key,
            ws_url,
            push_auth,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

/// Map an `http(s)` host URL to its push channel URL.
fn derive_ws_url(base_url: &str) -> Option<String> {
    let rest = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return None;
    };
    Some(format!("{rest}{PUSH_PATH}"))
}
