use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::xml::CodecError;
use crate::domain::ValidationError;

/// Errors returned by repository operations.
///
/// "Not found" and "duplicate key" are ordinary outcomes (`false` or a
/// summary entry), not errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid {field}: {0}", field = .0.field())]
    Validation(#[from] ValidationError),

    #[error("Path ISBN '{path}' must match payload ISBN '{payload}'")]
    KeyMismatch { path: String, payload: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed store document {}: {source}", .path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Returns true if the caller's input was rejected before any storage access
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::Validation(_) | StoreError::KeyMismatch { .. })
    }
}
