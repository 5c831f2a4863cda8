/// Client-side row identity for queue entries. Never sent over the wire.
pub type EntryId = u64;

/// Wire representation of the queue: one filename per copy, in order.
pub type FlatQueue = Vec<String>;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
