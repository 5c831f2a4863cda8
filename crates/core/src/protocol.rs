//! Wire-level constants for the `print_queue` server plugin.
//!
//! Shared by the REST client and the push-channel parser so both sides
//! agree on paths and message discriminators.

/// Plugin identifier used in URL paths and in push-message envelopes.
pub const PLUGIN_ID: &str = "print_queue";

/// Header carrying the host API key on every outbound request.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Read (GET) and write (POST) the server-side queue.
pub const PATH_QUEUE: &str = "queue";

/// Start printing the queue sequentially.
pub const PATH_START: &str = "start";

/// Start printing the queue in a continuous loop.
pub const PATH_START_CONTINUOUS: &str = "start_continuous";

/// Consume the server-side file selection.
pub const PATH_CLEAR_SELECTED_FILE: &str = "clear_selected_file";

/// Query the currently selected file.
pub const PATH_SELECTED_FILE: &str = "selected_file";

/// Push message type: the server's full queue.
pub const MSG_TYPE_SET_QUEUE: &str = "set_queue";

/// Push message type: a file became selected on the server.
pub const MSG_TYPE_FILE_SELECTED: &str = "file_selected";

/// Build the full URL of a plugin endpoint from the host base URL.
///
/// Trailing slashes on `base_url` are tolerated.
pub fn plugin_url(base_url: &str, path: &str) -> String {
    format!("{}/plugin/{PLUGIN_ID}/{path}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_url_joins_segments() {
        assert_eq!(
            plugin_url("http://octopi.local", PATH_QUEUE),
            "http://octopi.local/plugin/print_queue/queue"
        );
    }

    #[test]
    fn plugin_url_strips_trailing_slash() {
        assert_eq!(
            plugin_url("http://octopi.local/", PATH_START),
            "http://octopi.local/plugin/print_queue/start"
        );
    }
}
