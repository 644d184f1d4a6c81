//! idcm analytics: turns the caller and responder event logs into performance traces.
//!
//! The responder log is indexed once ([`server_log_index`]), the caller log is then folded
//! into [`sample::Sample`]s by the [`correlate`] module. Results are written as a
//! human-readable report and as one binary artifact per function ([`encoder`]).

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc)]

/// Paths of the read side
pub mod config;
/// Log Correlator
pub mod correlate;
/// Parses binary trace artifacts
pub mod decoder;
/// Writes binary trace artifacts
pub mod encoder;
pub mod errors;
/// Diagnostic merge of the two logs
pub mod merge;
/// Correlation, report and artifacts in one call
pub mod perf_trace;
pub mod report;
pub mod sample;
/// Responder log indexed by remote call id
pub mod server_log_index;

pub mod prelude {
    pub use crate::config::TraceMergeConfig;
    pub use crate::correlate::{Correlation, CorrelationReport, Correlator, correlate};
    pub use crate::decoder::{DecodedTrace, read_trace, read_trace_file};
    pub use crate::encoder::{TracePlan, encode_function_record, write_artifacts};
    pub use crate::merge::{simple_merge, simple_merge_files};
    pub use crate::perf_trace::generate_perf_trace;
    pub use crate::sample::{FunctionRecord, Sample};
    pub use crate::server_log_index::ServerLog;
}
