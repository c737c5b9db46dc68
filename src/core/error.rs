use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Sequence id out of order: {offered} enrolled after {last}")]
    OutOfOrderEnrollment { last: u64, offered: u64 },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Current context is not associated with a transaction")]
    NoActiveTransaction,

    #[error("Transaction timeout")]
    TransactionTimeout,

    #[error("Context already has a different transaction")]
    ResumeConflict,

    #[error("Result unavailable: {0}")]
    ResultUnavailable(String),

    #[error("Read view for '{0}' has been closed")]
    ViewClosed(String),

    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl<T> From<std::sync::PoisonError<T>> for IndexError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
