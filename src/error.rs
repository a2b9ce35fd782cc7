use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::platform::Platform;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Network, HTTP status, JSON or field-path failure while fetching views.
    #[error("failed to retrieve views for {platform} ID {id}: {reason}")]
    Retrieval {
        platform: Platform,
        id: String,
        reason: String,
    },

    #[error("request for {platform} ID {id} timed out after {}s", .after.as_secs())]
    Timeout {
        platform: Platform,
        id: String,
        after: Duration,
    },

    #[error("{}:{line}: {reason}", .path.display())]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
