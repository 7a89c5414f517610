use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RummageError {
    // Input validation
    #[error("Please enter both directory and file pattern.")]
    InvalidInput,

    #[error("Invalid directory path.")]
    InvalidRoot(PathBuf),

    #[error("Invalid file pattern: {0}")]
    InvalidPattern(String),

    // Traversal
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("symlink loop: {}", .0.display())]
    SymlinkLoop(PathBuf),

    #[error("IO error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Pool
    #[error("invalid pool capacity: {0}")]
    InvalidCapacity(usize),

    #[error("thread pool failure: {0}")]
    ThreadPool(String),

    // Runtime
    #[error("search cancelled")]
    Cancelled,

    // Third-party extensibility
    #[error("source error: {0}")]
    Source(String),

    #[error("matcher error: {0}")]
    Matcher(String),
}

impl RummageError {
    /// The path this error occurred at, if applicable.
    /// Callers use this to present "Skipped: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::InvalidRoot(p)
            | Self::PermissionDenied(p)
            | Self::NotFound(p)
            | Self::SymlinkLoop(p)
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether the search can continue after this error.
    ///
    /// Recoverable errors describe a single subtree that could not be listed
    /// (permission denied, vanished directory, symlink loop, IO). The walk
    /// skips that subtree and keeps going.
    ///
    /// Everything else (bad input, bad root, bad pattern, pool failure) ends
    /// the search before the walk starts.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::NotFound(_) | Self::SymlinkLoop(_) | Self::Io { .. }
        )
    }

    /// Classify an `io::Error` raised while listing `path`.
    pub(crate) fn from_io(path: PathBuf, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            std::io::ErrorKind::NotFound         => Self::NotFound(path),
            _                                    => Self::Io { path, source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_end_messages() {
        assert_eq!(
            RummageError::InvalidInput.to_string(),
            "Please enter both directory and file pattern."
        );
        assert_eq!(
            RummageError::InvalidRoot("/nope".into()).to_string(),
            "Invalid directory path."
        );
        assert!(RummageError::InvalidPattern("unclosed group".into())
            .to_string()
            .starts_with("Invalid file pattern"));
    }

    #[test]
    fn io_errors_are_classified() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let gone   = std::io::Error::from(std::io::ErrorKind::NotFound);
        let other  = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");

        assert!(matches!(RummageError::from_io("a".into(), denied), RummageError::PermissionDenied(_)));
        assert!(matches!(RummageError::from_io("b".into(), gone), RummageError::NotFound(_)));
        assert!(matches!(RummageError::from_io("c".into(), other), RummageError::Io { .. }));
    }

    #[test]
    fn only_traversal_errors_are_recoverable() {
        assert!(RummageError::PermissionDenied("x".into()).is_recoverable());
        assert!(RummageError::SymlinkLoop("x".into()).is_recoverable());
        assert!(!RummageError::InvalidRoot("x".into()).is_recoverable());
        assert!(!RummageError::InvalidPattern("(".into()).is_recoverable());
        assert!(!RummageError::Cancelled.is_recoverable());
    }

    #[test]
    fn path_is_exposed_for_traversal_errors() {
        let err = RummageError::PermissionDenied("/locked".into());
        assert_eq!(err.path(), Some(&PathBuf::from("/locked")));
        assert!(RummageError::InvalidInput.path().is_none());
    }
}
