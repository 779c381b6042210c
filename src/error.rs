use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by an archive backend.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive request timed out: {0}")]
    Timeout(String),

    #[error("archive request failed: {0}")]
    Request(String),

    #[error("unexpected archive response: {0}")]
    Response(String),

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Timeout-class failures are the only ones worth retrying.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ArchiveError::Timeout(_))
    }
}

impl From<reqwest::Error> for ArchiveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ArchiveError::Timeout(e.to_string())
        } else {
            ArchiveError::Request(e.to_string())
        }
    }
}

/// Errors raised while resolving a target to a local file.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("all {attempts} archive query attempts timed out: {last}")]
    RetriesExhausted { attempts: u32, last: ArchiveError },

    #[error("no matching {collection} observations found for '{target}'")]
    NoObservations { target: String, collection: String },

    #[error("no calibrated products found for observation {obs_id}")]
    NoCalibratedProducts { obs_id: String },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to store {path} in cache: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration values rejected before any work starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid color mode '{0}': choose from 'grayscale' or 'false_color'")]
    UnsupportedColorMode(String),

    #[error("invalid stretch '{0}': choose from 'log', 'asinh' or 'linear'")]
    UnsupportedStretch(String),

    #[error("unknown target '{0}': choose from {1}")]
    UnknownTarget(String, String),

    #[error("invalid output '{0}': use 'viewer', 'none' or 'dir:<path>'")]
    InvalidOutput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_are_retryable() {
        assert!(ArchiveError::Timeout("read".into()).is_timeout());
        assert!(!ArchiveError::Request("refused".into()).is_timeout());
        assert!(!ArchiveError::Response("bad json".into()).is_timeout());
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        let err = AcquisitionError::NoObservations {
            target: "M16".into(),
            collection: "JWST".into(),
        };
        assert_eq!(err.to_string(), "no matching JWST observations found for 'M16'");

        let err = ConfigError::UnsupportedColorMode("sepia".into());
        assert!(err.to_string().contains("sepia"));
    }
}
