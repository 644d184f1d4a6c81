//! Failures of a correlation, encoding or merge run.
//!
//! Every variant is fatal to the run: no partial output is produced.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {source}")]
    Format {
        file: String,
        line: usize,
        #[source]
        source: idcm_tracing::errors::Error,
    },

    #[error("{file}:{line}: {subject} started but {function} was never started with sample id 1")]
    UnknownFunction {
        file: String,
        line: usize,
        function: String,
        subject: String,
    },

    #[error("{file}:{line}: event for {subject} before its FUNC_START")]
    UnknownSubject {
        file: String,
        line: usize,
        subject: String,
    },

    #[error("{file}:{line}: {subject} started twice")]
    DuplicateSample {
        file: String,
        line: usize,
        subject: String,
    },

    #[error("{file}:{line}: {kind} for {subject} after its FUNC_END")]
    EventAfterEnd {
        file: String,
        line: usize,
        subject: String,
        kind: String,
    },

    #[error("incorrect log file format (no end): {subject} has no FUNC_END")]
    MissingEnd { subject: String },

    #[error("{file}:{line}: RPC_end for {subject} without a pending RPC_start")]
    RemoteCallWithoutStart {
        file: String,
        line: usize,
        subject: String,
    },

    #[error("remote call {remote_call_id} not found in {file}")]
    UnknownRemoteCall { file: String, remote_call_id: u32 },

    #[error(
        "remote call {remote_call_id} is started at {file}:{first_line} and again at line {second_line}"
    )]
    AmbiguousRemoteCall {
        file: String,
        remote_call_id: u32,
        first_line: usize,
        second_line: usize,
    },

    #[error("remote call {remote_call_id} starting at {file}:{line} has no FUNC_END")]
    UnterminatedRemoteCall {
        file: String,
        line: usize,
        remote_call_id: u32,
    },

    #[error("client log {0:?} contains no events")]
    EmptyLog(PathBuf),

    #[error("function name {0:?} cannot be used in an artifact path")]
    InvalidFunctionName(String),

    #[error("encoding trace of {function}: {reason:#}")]
    Encode {
        function: String,
        reason: anyhow::Error,
    },

    #[error("invalid trace artifact: {0:#}")]
    InvalidArtifact(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
