//! Where events are recorded and eventually flushed to the side's log file
use crate::errors::{Error, Result};
use crate::event::{EventKind, Feature, Subject, format_log_line};
use crate::process_info::PageFaults;
use crate::sample_id::{IdScope, SampleIdAllocator};
use crate::time::RelativeClock;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

pub const CLIENT_LOGFILE: &str = "client_log.txt";
pub const SERVER_LOGFILE: &str = "server_log.txt";

/// Environment variable overriding the directory where logs are written
pub const LOG_DIR_ENV_VAR: &str = "IDCM_LOG_DIR";

/// Which end of a remote call the process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn log_file_name(&self) -> &'static str {
        match self {
            Side::Client => CLIENT_LOGFILE,
            Side::Server => SERVER_LOGFILE,
        }
    }

    /// Responder sample ids double as remote call ids and must be unique across its functions
    pub fn id_scope(&self) -> IdScope {
        match self {
            Side::Client => IdScope::PerFunction,
            Side::Server => IdScope::Shared,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Client => f.write_str("client"),
            Side::Server => f.write_str("server"),
        }
    }
}

pub struct LoggerBuilder {
    side: Side,
    log_dir: Option<PathBuf>,
    truncate: Option<bool>,
}

impl LoggerBuilder {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            log_dir: None,
            truncate: None,
        }
    }

    /// Directory of the log file.
    ///
    /// If not explicitly set, the directory is read from the `IDCM_LOG_DIR` environment
    /// variable, falling back to the current directory.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Start from an empty log file, the default. Appending keeps what previous runs
    /// left, the correlator then refuses remote call ids logged twice.
    #[must_use]
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = Some(truncate);
        self
    }

    pub fn build(self) -> Result<Logger> {
        let log_dir = self
            .log_dir
            .or_else(|| std::env::var(LOG_DIR_ENV_VAR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&log_dir).map_err(|source| Error::OpenLog {
            path: log_dir.clone(),
            source,
        })?;
        let path = log_dir.join(self.side.log_file_name());
        let truncate = self.truncate.unwrap_or(true);
        OpenOptions::new()
            .create(true)
            .append(!truncate)
            .write(true)
            .truncate(truncate)
            .open(&path)
            .map_err(|source| Error::OpenLog {
                path: path.clone(),
                source,
            })?;
        let clock = RelativeClock::new();
        log::debug!(
            "{} log opened at {} ({})",
            self.side,
            clock.start_time.to_rfc3339(),
            path.display()
        );
        Ok(Logger {
            side: self.side,
            path,
            clock,
            log_state: Mutex::new(LogState::default()),
            dump_mutex: Mutex::new(()),
            sample_ids: SampleIdAllocator::with_scope(self.side.id_scope()),
        })
    }
}

struct InvocationStart {
    at: Instant,
    page_faults: PageFaults,
}

#[derive(Default)]
struct LogState {
    buffer: Vec<String>,
    invocation_starts: HashMap<Subject, InvocationStart>,
}

/// Thread-safe event recorder for one side of a remote call.
///
/// Events are formatted and appended to an in-memory buffer under the logging lock.
/// [`Logger::flush`] moves the buffer to the log file under a separate lock so that
/// concurrent flushes never interleave their lines. Whatever is still buffered when the
/// logger is dropped gets flushed.
pub struct Logger {
    side: Side,
    path: PathBuf,
    clock: RelativeClock,
    log_state: Mutex<LogState>,
    dump_mutex: Mutex<()>,
    sample_ids: SampleIdAllocator,
}

impl Logger {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_sample_id(&self, function_name: &str) -> u32 {
        self.sample_ids.next_sample_id(function_name)
    }

    /// Allocates a sample id and builds the subject of a new invocation.
    /// Fails if the name cannot be written to a log line.
    pub fn try_next_subject(&self, function_name: &str) -> Result<Subject> {
        Subject::check_function_name(function_name)?;
        Ok(Subject::new(function_name, self.next_sample_id(function_name)))
    }

    /// Same as [`Logger::try_next_subject`], an invalid name is fatal to the process
    pub fn next_subject(&self, function_name: &str) -> Subject {
        match self.try_next_subject(function_name) {
            Ok(subject) => subject,
            Err(e) => self.fatal(&e.to_string()),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LogState> {
        self.log_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `<relative-ms> <subject> <kind> [payload]` to the buffer, never blocks on io
    pub fn record_event(&self, subject: &Subject, kind: EventKind, payload: &str) {
        let mut state = self.lock_state();
        let line = format_log_line(self.clock.now_ms(), subject, kind, payload);
        state.buffer.push(line);
    }

    /// Records the start of an invocation, an invalid name is fatal to the process
    pub fn begin_invocation(&self, subject: &Subject, features: &[Feature]) {
        if let Err(e) = self.try_begin_invocation(subject, features) {
            self.fatal(&e.to_string());
        }
    }

    /// Records the start of an invocation, nothing is recorded if a name is invalid
    pub fn try_begin_invocation(&self, subject: &Subject, features: &[Feature]) -> Result<()> {
        Subject::check_function_name(&subject.function_name)?;
        for feature in features {
            feature.check_name()?;
        }
        let payload = features
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let page_faults = PageFaults::snapshot();
        let mut state = self.lock_state();
        state.invocation_starts.insert(
            subject.clone(),
            InvocationStart {
                at: Instant::now(),
                page_faults,
            },
        );
        let line = format_log_line(self.clock.now_ms(), subject, EventKind::FuncStart, &payload);
        state.buffer.push(line);
        Ok(())
    }

    /// Records the page faults of the invocation followed by its end, then flushes
    pub fn end_invocation(&self, subject: &Subject) {
        let now_faults = PageFaults::snapshot();
        {
            let mut state = self.lock_state();
            let faults = match state.invocation_starts.remove(subject) {
                Some(start) => {
                    log::trace!(
                        "{subject} ran for {}ms",
                        crate::time::elapsed_ms(start.at)
                    );
                    now_faults.since(&start.page_faults)
                }
                None => {
                    log::warn!("end of invocation {subject} that was never started");
                    PageFaults::default()
                }
            };
            let now = self.clock.now_ms();
            let payload = format!("{} {}", faults.minor, faults.major);
            let line = format_log_line(now, subject, EventKind::PageFault, &payload);
            state.buffer.push(line);
            let line = format_log_line(now, subject, EventKind::FuncEnd, "");
            state.buffer.push(line);
        }
        self.flush();
    }

    pub fn remote_call_start(&self, subject: &Subject) {
        self.record_event(subject, EventKind::RpcStart, "");
    }

    /// `remote_call_id` is the sample id the responder logged the call under
    pub fn remote_call_end(&self, subject: &Subject, remote_call_id: u32) {
        self.record_event(subject, EventKind::RpcEnd, &remote_call_id.to_string());
    }

    /// Number of lines waiting to be flushed
    pub fn buffered_len(&self) -> usize {
        self.lock_state().buffer.len()
    }

    /// Writes the buffered lines to the log file. A failure is fatal to the process.
    pub fn flush(&self) {
        if let Err(e) = self.try_flush() {
            log::error!("cannot write {} log {}: {e}", self.side, self.path.display());
            std::process::exit(1);
        }
    }

    pub fn try_flush(&self) -> std::io::Result<()> {
        let _dump_guard = self.dump_mutex.lock().unwrap_or_else(PoisonError::into_inner);
        let lines = std::mem::take(&mut self.lock_state().buffer);
        if lines.is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for line in &lines {
            writeln!(writer, "{line}")?;
        }
        writer.flush()
    }

    /// Unrecoverable condition: report it, save what was recorded and terminate
    pub fn fatal(&self, msg: &str) -> ! {
        log::error!("{msg}");
        if let Err(e) = self.try_flush() {
            log::error!("cannot write {} log {}: {e}", self.side, self.path.display());
        }
        std::process::exit(1);
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(e) = self.try_flush() {
            log::error!("cannot write {} log {}: {e}", self.side, self.path.display());
        }
    }
}
