use ripshelf_domain::{JobId, JobStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("collection item not found: {0}")]
    CollectionNotFound(i64),

    #[error("wanted item not found: {0}")]
    WantedNotFound(i64),

    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("invalid field value: {0}")]
    Domain(#[from] ripshelf_domain::DomainError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}
