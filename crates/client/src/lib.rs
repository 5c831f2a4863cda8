//! Print queue sync client library.
//!
//! Keeps a local, reorderable print queue in step with the `print_queue`
//! plugin on an OctoPrint-style host: REST calls for reads and writes,
//! a WebSocket push channel for server-initiated updates, and a single
//! event loop that owns the queue.

pub mod api;
pub mod config;
pub mod console;
pub mod events;
pub mod messages;
pub mod processor;
pub mod push;
pub mod reconnect;
pub mod synchronizer;
pub mod transport;
