//! Error types for the store layer.
//!
//! Backend failures are classified once, when the underlying `io::Error` is
//! observed, so callers can match on the variant instead of inspecting OS
//! error codes.

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    #[error("an item already exists at {path}")]
    AlreadyExists { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("not a regular file: {path}")]
    NotAFile { path: String },

    #[error("path {path:?} escapes the store root")]
    PathEscapesRoot { path: String },

    #[error("An error occurred trying to read the root path {path}: {error}")]
    RootPathInvalid {
        path: std::path::PathBuf,
        error: io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Classify an OS error observed while operating on `path`.
    pub fn from_io(path: impl Into<String>, error: io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            // A file standing in for an intermediate directory means the
            // target cannot exist either.
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Error::NotFound { path },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied { path },
            io::ErrorKind::AlreadyExists => Error::AlreadyExists { path },
            _ => Error::Io {
                path,
                source: error,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
