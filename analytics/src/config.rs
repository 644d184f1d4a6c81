use std::path::PathBuf;

pub const CLIENT_LOG_FILE: &str = idcm_tracing::logger::CLIENT_LOGFILE;
pub const SERVER_LOG_FILE: &str = idcm_tracing::logger::SERVER_LOGFILE;
pub const TRACE_LOG_FILE: &str = "trace_log.txt";
pub const MERGED_LOG_FILE: &str = "merged_log.txt";

/// Where the read side finds its inputs and puts its outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMergeConfig {
    pub client_log: PathBuf,
    pub server_log: PathBuf,
    /// human-readable report
    pub trace_log: PathBuf,
    /// output of the diagnostic merge
    pub merged_log: PathBuf,
    /// root of the `symbols/` tree
    pub output_dir: PathBuf,
}

impl Default for TraceMergeConfig {
    fn default() -> Self {
        Self {
            client_log: CLIENT_LOG_FILE.into(),
            server_log: SERVER_LOG_FILE.into(),
            trace_log: TRACE_LOG_FILE.into(),
            merged_log: MERGED_LOG_FILE.into(),
            output_dir: ".".into(),
        }
    }
}

impl TraceMergeConfig {
    /// All files under `dir`, with their default names
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            client_log: dir.join(CLIENT_LOG_FILE),
            server_log: dir.join(SERVER_LOG_FILE),
            trace_log: dir.join(TRACE_LOG_FILE),
            merged_log: dir.join(MERGED_LOG_FILE),
            output_dir: dir,
        }
    }
}
