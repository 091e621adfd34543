use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("disc read failed on drive {drive_id}: {details}")]
    DiscRead { drive_id: String, details: String },

    #[error("rip failed on drive {drive_id}, title {title_index}: {details}")]
    Rip {
        drive_id: String,
        title_index: u32,
        details: String,
    },

    #[error("rip produced no artifact under {}", dir.display())]
    NoArtifact { dir: PathBuf },

    #[error("encode failed: {details}")]
    Encode { details: String },

    #[error("catalog request failed: {0}")]
    Catalog(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
