//! Push-channel message types and parser.
//!
//! The host pushes JSON objects keyed by message family (`current`,
//! `event`, `plugin`, ...). Plugin messages look like
//! `{"plugin": {"plugin": "<id>", "data": {"type": "<kind>", ...}}}`.
//! Only `print_queue` plugin messages are of interest; everything else
//! is skipped.

use printq_core::protocol::PLUGIN_ID;
use printq_core::types::FlatQueue;
use serde::Deserialize;

/// Messages the `print_queue` plugin pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum PrintQueueMessage {
    /// The server's full queue, in flat form.
    #[serde(rename = "set_queue")]
    SetQueue { print_queue: FlatQueue },

    /// A file became selected on the server.
    #[serde(rename = "file_selected")]
    FileSelected {
        #[serde(alias = "file_name", alias = "path")]
        filename: String,
    },
}

/// Outer frame. Only the `plugin` family is read.
#[derive(Debug, Deserialize)]
struct PushFrame {
    #[serde(default)]
    plugin: Option<PluginEnvelope>,
}

/// Plugin family envelope naming the sending plugin.
#[derive(Debug, Deserialize)]
struct PluginEnvelope {
    plugin: String,
    data: serde_json::Value,
}

/// Parse a push-channel text frame.
///
/// Returns `Ok(None)` for frames that are not `print_queue` plugin
/// messages. Returns `Err` for malformed JSON, unknown message types, or
/// missing fields; callers should log and drop those.
pub fn parse_frame(text: &str) -> Result<Option<PrintQueueMessage>, serde_json::Error> {
    let frame: PushFrame = serde_json::from_str(text)?;
    match frame.plugin {
        Some(envelope) if envelope.plugin == PLUGIN_ID => {
            serde_json::from_value(envelope.data).map(Some)
        }
        _ => Ok(None),
    }
}
