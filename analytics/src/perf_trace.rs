use crate::config::TraceMergeConfig;
use crate::correlate::{Correlation, correlate};
use crate::encoder::write_artifacts;
use crate::errors::Result;
use crate::report::write_trace_log;
use std::path::PathBuf;

#[derive(Debug)]
pub struct PerfTrace {
    pub correlation: Correlation,
    pub artifacts: Vec<PathBuf>,
}

/// Correlates the two logs, writes the trace log, then one binary artifact per function
/// unless `write_binary` is false. Nothing is written when correlation fails.
pub fn generate_perf_trace(config: &TraceMergeConfig, write_binary: bool) -> Result<PerfTrace> {
    let correlation = correlate(&config.client_log, &config.server_log)?;
    let artifacts = if write_binary {
        write_artifacts(
            &config.output_dir,
            correlation.functions.values(),
            chrono::Utc::now().timestamp(),
        )?
    } else {
        vec![]
    };
    write_trace_log(&config.trace_log, &correlation.functions)?;
    Ok(PerfTrace {
        correlation,
        artifacts,
    })
}
