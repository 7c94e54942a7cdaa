//! Error types for the seedr-dl library.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Broad category of a failure reported by the remote storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The service could not be reached or the connection dropped.
    Network,
    /// The access token was rejected.
    Authentication,
    /// The service answered with a 5xx status.
    Server,
    /// The service understood the request and refused it.
    Api,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::Server => "server",
            Self::Api => "API",
        })
    }
}

/// Step of a file transfer that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    /// Asking the service for the file's download link.
    ResolveUrl,
    /// Opening the HTTP stream.
    Connect,
    /// Creating the local `.part` file.
    CreateFile,
    /// Reading the response body.
    Read,
    /// Writing bytes or finalizing the local file.
    Write,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ResolveUrl => "failed to get download URL for",
            Self::Connect => "failed to start download for",
            Self::CreateFile => "failed to create local file for",
            Self::Read => "failed to read download stream for",
            Self::Write => "failed to write to file for",
        })
    }
}

/// Failures collected while downloading a batch of files.
#[derive(Debug)]
pub struct BatchFailure {
    /// Number of files the batch attempted.
    pub attempted: usize,
    /// One error per failed file, in batch order.
    pub errors: Vec<Error>,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Errors that can occur while browsing or downloading.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reported by the remote storage service.
    #[error("{kind} error: {message}")]
    Remote {
        /// Failure category.
        kind: RemoteErrorKind,
        /// Human-readable detail.
        message: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The download stream did not announce a usable content length.
    #[error("cannot track progress for {name}: content length unknown")]
    Untrackable {
        /// Display name of the file.
        name: String,
    },

    /// An operation exceeded its time budget.
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        /// What was being attempted.
        operation: String,
        /// The budget that was exceeded.
        after: Duration,
    },

    /// A single file transfer failed at a specific stage.
    #[error("{stage} {name}: {source}")]
    Transfer {
        /// Stage at which the transfer failed.
        stage: TransferStage,
        /// Display name of the file.
        name: String,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// One or more files in a batch failed.
    #[error("{0}")]
    Batch(BatchFailure),

    /// The transfer was cancelled before it finished.
    #[error("transfer of {name} cancelled")]
    Cancelled {
        /// Display name of the file.
        name: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Stored credentials are missing or unreadable.
    #[error("token error: {0}")]
    Token(String),

    /// An external program (clipboard tool, media player) failed.
    #[error("{0}")]
    External(String),
}

impl Error {
    /// Builds a remote service error.
    pub fn remote(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self::Remote {
            kind,
            message: message.into(),
        }
    }

    /// Wraps `source` as a failure of `stage` while transferring `name`.
    pub fn transfer(stage: TransferStage, name: impl Into<String>, source: Self) -> Self {
        Self::Transfer {
            stage,
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Returns the remote failure category, looking through transfer wrappers.
    #[must_use]
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Self::Remote { kind, .. } => Some(*kind),
            Self::Transfer { source, .. } => source.remote_kind(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for seedr-dl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_includes_kind() {
        let err = Error::remote(RemoteErrorKind::Server, "HTTP 503: Service Unavailable");
        assert_eq!(err.to_string(), "server error: HTTP 503: Service Unavailable");
    }

    #[test]
    fn transfer_error_names_stage_and_file() {
        let err = Error::transfer(
            TransferStage::ResolveUrl,
            "movie.mkv",
            Error::remote(RemoteErrorKind::Api, "file not found"),
        );
        assert_eq!(
            err.to_string(),
            "failed to get download URL for movie.mkv: API error: file not found"
        );
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::Api));
    }

    #[test]
    fn untrackable_message() {
        let err = Error::Untrackable {
            name: "a.bin".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot track progress for a.bin: content length unknown"
        );
    }

    #[test]
    fn timeout_message_in_seconds() {
        let err = Error::Timeout {
            operation: "download of a.bin".to_string(),
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "download of a.bin timed out after 30s");
    }

    #[test]
    fn batch_failure_joins_with_newlines() {
        let failure = BatchFailure {
            attempted: 3,
            errors: vec![
                Error::External("first".to_string()),
                Error::External("second".to_string()),
            ],
        };
        assert_eq!(Error::Batch(failure).to_string(), "first\nsecond");
    }
}
