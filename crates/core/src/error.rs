use crate::types::EntryId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Queue entry not found: {0}")]
    NotFound(EntryId),

    #[error("Validation failed: {0}")]
    Validation(String),
}
