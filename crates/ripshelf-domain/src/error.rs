use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("year {0} outside 1800..=2100")]
    InvalidYear(i32),

    #[error("confidence {0} outside 0.0..=1.0")]
    InvalidConfidence(f64),
}
