mod bin;
mod builder;
mod config;
pub mod progress;

pub use bin::*;
pub use builder::Builder;
pub use config::Config;

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Bytes read and written per chunk when copying entry data
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Archive created by the command line tool when no output is given
pub const DEFAULT_OUTPUT: &str = "out.nsp";

#[derive(thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] pfs0_core::Error),

    #[error("File not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied: {}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{context}{}", match path {
        Some(path) => format!(": {}", path.display()),
        None => String::new(),
    })]
    Io {
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
        context: &'static str,
    },

    #[error("Failed to parse config {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No input files provided")]
    EmptyInput,

    #[error("Path has no file name: {}", path.display())]
    InvalidName { path: PathBuf },

    #[error("Short write to {}: expected {expected} bytes, wrote {actual} bytes", path.display())]
    ShortWrite {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Size mismatch for {} during write: expected {expected} bytes, wrote {actual} bytes", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Truncated archive {}: header needs {declared} bytes, file has {actual} bytes", path.display())]
    Truncated {
        path: PathBuf,
        declared: u64,
        actual: u64,
    },

    #[error("Unsupported entry (not a regular file): {}", path.display())]
    UnsupportedEntry { path: PathBuf },
}

impl Error {
    /// Wrap an io error, sorting out missing files and permission problems
    /// when the error is tied to a path.
    pub fn from_io(source: io::Error, path: Option<PathBuf>, context: &'static str) -> Error {
        match (source.kind(), path) {
            (io::ErrorKind::NotFound, Some(path)) => Error::NotFound { path, source },
            (io::ErrorKind::PermissionDenied, Some(path)) => {
                Error::PermissionDenied { path, source }
            }
            (_, path) => Error::Io {
                source,
                path,
                context,
            },
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;

        let mut source = self.source();
        while let Some(err) = source {
            writeln!(f, "\tCaused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}

/// Produce a closure for `map_err` that wraps an [`io::Error`] into an
/// [`Error`], with an optional path and a short context string.
#[macro_export]
macro_rules! wrap_io_err {
    ($path:expr, $context:expr) => {
        |source| $crate::Error::from_io(source, Some(::std::path::PathBuf::from(&$path)), $context)
    };
    ($context:expr) => {
        |source| $crate::Error::from_io(source, None, $context)
    };
}
