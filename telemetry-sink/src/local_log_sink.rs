use log::{Level, LevelFilter, Metadata, Record};
use std::io::Write;

// Based on simple logger
#[cfg(feature = "colored")]
use colored::Colorize;

pub struct LocalLogSink {
    max_level: LevelFilter,

    /// Control how timestamps are displayed.
    ///
    /// This field is only available if the `timestamps` feature is enabled.
    #[cfg(feature = "timestamps")]
    timestamps: bool,

    /// Whether to use color output or not.
    ///
    /// This field is only available if the `color` feature is enabled.
    #[cfg(feature = "colored")]
    colors: bool,
}

impl LocalLogSink {
    /// Creates a new `LocalLogSink` accepting records up to `max_level`.
    ///
    /// Timestamps and colors are on when their features are enabled.
    pub fn new(max_level: LevelFilter) -> Self {
        Self {
            max_level,
            #[cfg(feature = "timestamps")]
            timestamps: true,
            #[cfg(feature = "colored")]
            colors: true,
        }
    }

    #[must_use]
    #[cfg(feature = "timestamps")]
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    #[must_use]
    #[cfg(feature = "colored")]
    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    fn level_string(&self, level: Level) -> String {
        #[cfg(feature = "colored")]
        {
            if self.colors {
                match level {
                    Level::Error => level.to_string().red().to_string(),
                    Level::Warn => level.to_string().yellow().to_string(),
                    Level::Info => level.to_string().cyan().to_string(),
                    Level::Debug => level.to_string().purple().to_string(),
                    Level::Trace => level.to_string().normal().to_string(),
                }
            } else {
                level.to_string()
            }
        }
        #[cfg(not(feature = "colored"))]
        {
            level.to_string()
        }
    }

    /// The line printed for `record`, without its newline
    pub fn format(&self, record: &Record<'_>) -> String {
        let level_string = self.level_string(record.level());

        let target = if !record.target().is_empty() {
            record.target()
        } else {
            record.module_path().unwrap_or_default()
        };

        let timestamp = {
            #[cfg(feature = "timestamps")]
            if self.timestamps {
                format!("{} ", chrono::Utc::now().to_rfc3339())
            } else {
                "".to_string()
            }

            #[cfg(not(feature = "timestamps"))]
            ""
        };

        format!("{timestamp}{level_string:<5} [{target}] {}", record.args())
    }
}

impl log::Log for LocalLogSink {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = self.format(record);

        #[cfg(not(feature = "stderr"))]
        println!("{message}");

        #[cfg(feature = "stderr")]
        eprintln!("{message}");
    }

    fn flush(&self) {
        #[cfg(not(feature = "stderr"))]
        let _ = std::io::stdout().flush();

        #[cfg(feature = "stderr")]
        let _ = std::io::stderr().flush();
    }
}
