use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    /// Invalid or missing generation parameters. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Coordinate arithmetic left the representable range.
    #[error("coordinate out of range: {0}")]
    OutOfRange(String),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorldError {
    #[inline]
    pub fn is_configuration(&self) -> bool {
        matches!(self, WorldError::Configuration(_) | WorldError::Io { .. })
    }

    #[inline]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, WorldError::OutOfRange(_))
    }
}
