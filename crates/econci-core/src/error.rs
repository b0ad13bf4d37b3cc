use thiserror::Error;

#[derive(Error, Debug)]
pub enum EconCiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Numerical failure: {0}")]
    Numerical(String),
}

/// Raised when a result is read, or a stage is run, before the stage it depends on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("compute indexes first")]
    IndexesNotComputed,

    #[error("build product space first")]
    ProductSpaceNotBuilt,
}

pub type Result<T> = std::result::Result<T, EconCiError>;
