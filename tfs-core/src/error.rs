//! Error types for the tiered file store

use thiserror::Error;

/// Result type alias
pub type TfsResult<T> = Result<T, TfsError>;

/// Main error type
#[derive(Error, Debug)]
pub enum TfsError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Cannot create directory {path}: {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage tier {tier} unavailable: {reason}")]
    TierUnavailable { tier: String, reason: String },

    #[error("Peer closed the connection without a response")]
    NoResponse,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl TfsError {
    /// Errors a handler reports by closing the connection rather than by
    /// writing a response.
    pub fn is_silent_abort(&self) -> bool {
        matches!(
            self,
            TfsError::NotFound(_) | TfsError::CreateDirectory { .. } | TfsError::NoResponse
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TfsError::Network(_) | TfsError::TierUnavailable { .. } | TfsError::NoResponse
        ) || matches!(self, TfsError::Io(e) if is_connection_error(e))
    }
}

fn is_connection_error(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_silent_abort() {
        assert!(TfsError::NotFound("a.c".into()).is_silent_abort());
        assert!(TfsError::NoResponse.is_silent_abort());
        assert!(TfsError::CreateDirectory {
            path: "/x".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .is_silent_abort());

        assert!(!TfsError::Archive("truncated".into()).is_silent_abort());
        assert!(!TfsError::InvalidCommand("frob".into()).is_silent_abort());
    }

    #[test]
    fn test_is_transport() {
        assert!(TfsError::Network("reset".into()).is_transport());
        assert!(TfsError::TierUnavailable { tier: "pdf".into(), reason: "refused".into() }.is_transport());
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(TfsError::from(reset).is_transport());

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!TfsError::from(denied).is_transport());
        assert!(!TfsError::NotFound("a.txt".into()).is_transport());
    }

    #[test]
    fn test_error_display() {
        let err = TfsError::NotFound("notes/a.c".into());
        assert_eq!(format!("{}", err), "Path not found: notes/a.c");

        let err = TfsError::TierUnavailable { tier: "pdf".into(), reason: "refused".into() };
        assert_eq!(format!("{}", err), "Storage tier pdf unavailable: refused");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let tfs_err: TfsError = io_err.into();
        assert!(matches!(tfs_err, TfsError::Io(_)));
    }
}
