use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] ripshelf_store::StoreError),

    #[error("driver error: {0}")]
    Driver(#[from] ripshelf_driver::DriverError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
