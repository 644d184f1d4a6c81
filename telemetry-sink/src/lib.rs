//! Console logging for idcm tools
//!
//! Installs a [`log`] backend printing records to the terminal.

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc, clippy::new_without_default)]

use log::LevelFilter;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

pub mod local_log_sink;

use local_log_sink::LocalLogSink;

/// Overrides the max level of the local sink, e.g. `IDCM_LOG_LEVEL=debug`
pub const LOG_LEVEL_ENV_VAR: &str = "IDCM_LOG_LEVEL";

pub struct TelemetryGuardBuilder {
    local_sink_enabled: bool,
    local_sink_max_level: LevelFilter,
    max_level_override: Option<LevelFilter>,
}

impl Default for TelemetryGuardBuilder {
    fn default() -> Self {
        Self {
            local_sink_enabled: true,
            local_sink_max_level: LevelFilter::Info,
            max_level_override: None,
        }
    }
}

// the log crate accepts a single logger per process
static LOCAL_SINK: OnceLock<LocalLogSink> = OnceLock::new();

struct LoggingSystemGuard;

impl Drop for LoggingSystemGuard {
    fn drop(&mut self) {
        log::logger().flush();
    }
}

impl TelemetryGuardBuilder {
    /// Programmatic override, takes precedence over the environment
    #[must_use]
    pub fn with_max_level_override(mut self, level_filter: LevelFilter) -> Self {
        self.max_level_override = Some(level_filter);
        self
    }

    #[must_use]
    pub fn with_local_sink_enabled(mut self, enabled: bool) -> Self {
        self.local_sink_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_local_sink_max_level(mut self, level_filter: LevelFilter) -> Self {
        self.local_sink_max_level = level_filter;
        self
    }

    /// Level the installed sink will accept
    pub fn max_level(&self) -> anyhow::Result<LevelFilter> {
        if let Some(level) = self.max_level_override {
            return Ok(level);
        }
        match std::env::var(LOG_LEVEL_ENV_VAR) {
            Ok(value) => LevelFilter::from_str(&value).map_err(|_| {
                anyhow::anyhow!("invalid {LOG_LEVEL_ENV_VAR} value {value:?}")
            }),
            Err(_) => Ok(self.local_sink_max_level),
        }
    }

    /// Installs the sink, or shares the guard of an installation still alive.
    pub fn build(self) -> anyhow::Result<TelemetryGuard> {
        static GLOBAL_WEAK_GUARD: Mutex<Weak<LoggingSystemGuard>> = Mutex::new(Weak::new());
        let mut weak_guard = GLOBAL_WEAK_GUARD
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(arc) = weak_guard.upgrade() {
            return Ok(TelemetryGuard { _guard: arc });
        }

        let max_level = if self.local_sink_enabled {
            self.max_level()?
        } else {
            LevelFilter::Off
        };
        let sink = LOCAL_SINK.get_or_init(|| LocalLogSink::new(max_level));
        // a logger installed by an earlier guard stays in place
        let installed = log::set_logger(sink).is_ok();
        log::set_max_level(max_level.min(sink.max_level()));
        if installed {
            log::debug!("local log sink installed, max level {max_level}");
        }

        let arc = Arc::new(LoggingSystemGuard);
        *weak_guard = Arc::downgrade(&arc);
        Ok(TelemetryGuard { _guard: arc })
    }
}

/// Keeps logging configured; the last guard dropped flushes the sink
pub struct TelemetryGuard {
    _guard: Arc<LoggingSystemGuard>,
}

impl TelemetryGuard {
    pub fn new() -> anyhow::Result<Self> {
        TelemetryGuardBuilder::default().build()
    }
}
