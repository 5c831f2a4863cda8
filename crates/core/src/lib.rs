//! Domain model for the print queue client.
//!
//! Holds the queue entries, the run-length wire encoding, and the
//! protocol constants shared with the `print_queue` server plugin. No I/O
//! happens in this crate.

pub mod error;
pub mod protocol;
pub mod queue;
pub mod types;
