//! Error types for cgroup discovery and CPU accounting reads.
//!
//! [`Error::SourceUnavailable`] and [`Error::Parse`] are expected at runtime: a container
//! that exits takes its accounting directory with it. Callers close the affected monitor
//! and keep going. [`Error::ReadDir`] only happens while discovering containers at
//! startup and is fatal there.

use std::num::ParseIntError;
use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("accounting source `{path}` is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse accounting source `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    ReadDir(#[from] fsutil::ReadDirError),
}

impl From<fsutil::FileOpenError> for Error {
    fn from(err: fsutil::FileOpenError) -> Self {
        Error::SourceUnavailable {
            path: err.path,
            source: err.source,
        }
    }
}

/// Errors raised while parsing the content of a CPU accounting file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid value at line {line}: '{value}': {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("missing field '{field}'")]
    MissingField { field: &'static str },

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
