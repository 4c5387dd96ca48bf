//! Domain-level errors

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::number::NumberError;

/// Domain errors cover reading and converting script content.
/// Grammar problems are not errors; the parser reports them as diagnostics.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("malformed number '{token}': {reason}")]
    MalformedNumber { token: String, reason: NumberError },

    #[error("failed to read {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
