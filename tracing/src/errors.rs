//! Error types for parsing the event log grammar and opening log files

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open log file {path:?}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed log line: {0}")]
    MalformedLine(String),

    #[error("malformed subject {0:?}: expected a function name followed by a sample id")]
    MalformedSubject(String),

    #[error("malformed feature token {token:?}: {reason}")]
    MalformedFeature { token: String, reason: String },

    #[error("unknown feature type {0:?}")]
    UnknownFeatureType(String),

    #[error("{name:?} cannot be logged: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("unknown event kind {0:?}")]
    UnknownEventKind(String),
}

pub type Result<T> = std::result::Result<T, Error>;
