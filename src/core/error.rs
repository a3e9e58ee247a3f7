use std::io;

use thiserror::Error;

/// Result type used by every node, backend and glob operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by node operations.
///
/// Every operation either fully succeeds or returns exactly one of these.
/// `Io` and `Other` together form the "generic" failure kind: an I/O-level or backend failure
/// not covered by the more specific variants (see [`Error::is_generic`]).
#[derive(Debug, Error)]
pub enum Error {
    /// A path or a name fails normalization/validation rules.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The referenced node does not exist in the backend.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create/rename/copy/move target is already occupied.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The node's permission bits, or the backend itself, refuse the operation.
    #[error("not permitted: {0}")]
    NotPermitted(String),

    /// Malformed glob pattern.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("i/o failure: {0}")]
    Io(io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Returns `true` for failures outside the named kinds (disk full, unexpected backend
    /// error, directory still not empty after a recursive delete, ...).
    pub fn is_generic(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Other(_))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        use io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => Error::NotFound(err.to_string()),
            ErrorKind::AlreadyExists => Error::AlreadyExists(err.to_string()),
            ErrorKind::PermissionDenied => Error::NotPermitted(err.to_string()),
            _ => Error::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds_are_mapped() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::NotFound(_)));

        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, Error::NotPermitted(_)));

        let err: Error = io::Error::new(io::ErrorKind::AlreadyExists, "taken").into();
        assert!(matches!(err, Error::AlreadyExists(_)));

        let err: Error = io::Error::other("disk full").into();
        assert!(err.is_generic());
    }

    #[test]
    fn test_anyhow_errors_are_generic() {
        let err: Error = anyhow::anyhow!("backend exploded").into();
        assert!(err.is_generic());
        assert_eq!(err.to_string(), "backend exploded");
    }
}
