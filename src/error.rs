//! Error types shared by the search and persistence stages.

use std::io;
use std::path::PathBuf;

use crate::crypto::EncodeError;

/// Errors that stop a search or fail to persist one of its results.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The operating system CSPRNG could not provide randomness.
    #[error("entropy source failed: {0}")]
    Entropy(#[from] rand::Error),

    /// A key record could not be encoded.
    #[error("failed to encode key record: {0}")]
    Encoding(#[from] EncodeError),

    /// An output file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// A worker thread panicked before reporting its exit.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}

impl SearchError {
    /// Returns true for errors that make the rest of the run pointless.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SearchError::FileSystem { .. } | SearchError::Encoding(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_error_names_path() {
        let err = SearchError::FileSystem {
            path: PathBuf::from("/nowhere/id_ed25519_00"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        let message = err.to_string();
        assert!(message.contains("/nowhere/id_ed25519_00"));
        assert!(message.contains("no such directory"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_worker_panic_is_fatal() {
        assert!(SearchError::WorkerPanicked(3).is_fatal());
        assert_eq!(SearchError::WorkerPanicked(3).to_string(), "worker 3 panicked");
    }
}
