mod error;
mod types;

pub use error::DomainError;
pub use types::{
    active_mode_enabled, CollectionItem, ContentType, DriveId, Identification, Job, JobId,
    JobStatus, MovieCandidate, MovieDetails, NewWantedItem, WantedItem, ACTIVE_MODE_KEY, YEAR_MAX,
    YEAR_MIN,
};

#[cfg(test)]
mod tests;
