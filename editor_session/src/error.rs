//! Error types for document sessions.

use std::io;
use std::path::PathBuf;

/// The backing store could not be read.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A save did not reach the backing store.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("cannot write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The buffer reported the write as unsuccessful without an I/O error.
    #[error("write was rejected by the backing store")]
    Rejected,
}

/// Errors returned by [`DocumentSession`](crate::DocumentSession) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The command needs loaded content. Callers normally ignore this.
    #[error("document is not loaded")]
    NotLoaded,
    #[error("document session is closed")]
    Closed,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Errors returned by the [`SessionHost`](crate::SessionHost).
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("unsupported file type: {0:?}")]
    UnsupportedFileType(PathBuf),
    #[error("no session with id {0}")]
    UnknownSession(usize),
    #[error("no active session")]
    NoActiveSession,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The settings file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
