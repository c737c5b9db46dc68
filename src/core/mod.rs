pub mod config;
pub mod document;
pub mod error;

pub use config::RuntimeConfig;
pub use document::{Document, WriteOp};
pub use error::{IndexError, Result};
