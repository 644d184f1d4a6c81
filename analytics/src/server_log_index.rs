//! Responder log loaded in memory, with the line of each remote call's FUNC_START
use crate::errors::{Error, Result};
use idcm_tracing::errors::{Error as LineError, Result as LineResult};
use idcm_tracing::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// What the responder did while serving one remote call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoteCallStats {
    pub server_time: i64,
    pub memory_usage: u64,
    pub mem_leaks: i64,
    pub min_page_faults: u64,
    pub maj_page_faults: u64,
    pub waiting_time: u64,
    pub lock_holding_time: u64,
    pub realloc_seen: bool,
}

impl RemoteCallStats {
    fn apply_event(&mut self, line: &LogLine<'_>, remote_call_id: u32) -> LineResult<()> {
        match line.kind {
            EventKind::Malloc => {
                let memory = self.memory_usage.checked_add(count_arg(line, 0)?);
                self.memory_usage = overflow_checked(memory, "memory usage")?;
                self.mem_leaks = overflow_checked(self.mem_leaks.checked_add(1), "malloc count")?;
            }
            EventKind::Realloc => {
                log::warn!(
                    "found realloc call (remote call #{remote_call_id}), memory stats might be inaccurate"
                );
                let memory = self.memory_usage.checked_add(count_arg(line, 0)?);
                self.memory_usage = overflow_checked(memory, "memory usage")?;
                self.realloc_seen = true;
            }
            EventKind::Free => {
                self.mem_leaks = overflow_checked(self.mem_leaks.checked_sub(1), "malloc count")?;
            }
            EventKind::PageFault => {
                let minor = self.min_page_faults.checked_add(count_arg(line, 0)?);
                let major = self.maj_page_faults.checked_add(count_arg(line, 1)?);
                self.min_page_faults = overflow_checked(minor, "minor page faults")?;
                self.maj_page_faults = overflow_checked(major, "major page faults")?;
            }
            EventKind::MutexLock
            | EventKind::CondWaitReturned
            | EventKind::CondTimedwaitReturned => {
                let waiting = self.waiting_time.checked_add(count_arg(line, 0)?);
                self.waiting_time = overflow_checked(waiting, "waiting time")?;
            }
            EventKind::MutexUnlock => {
                let holding = self.lock_holding_time.checked_add(count_arg(line, 0)?);
                self.lock_holding_time = overflow_checked(holding, "lock holding time")?;
            }
            EventKind::FuncStart | EventKind::FuncEnd | EventKind::RpcStart | EventKind::RpcEnd => {
                log::debug!("ignoring {} inside remote call {remote_call_id}", line.kind);
            }
        }
        Ok(())
    }
}

pub struct ServerLog {
    file: String,
    lines: Vec<String>,
    // remote call id -> index of its FUNC_START line
    index: HashMap<u32, usize>,
    // remote call id -> index of a later FUNC_START reusing it
    reused: HashMap<u32, usize>,
}

impl ServerLog {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_lines(
            path.display().to_string(),
            text.lines().map(String::from).collect(),
        )
    }

    /// Validates every line and indexes the FUNC_START lines by their remote call id,
    /// which is the sample id of the responder's subject
    pub fn from_lines(file: String, lines: Vec<String>) -> Result<Self> {
        let mut index = HashMap::new();
        let mut reused = HashMap::new();
        for (line_index, text) in lines.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            let line = LogLine::parse(text).map_err(|source| Error::Format {
                file: file.clone(),
                line: line_index + 1,
                source,
            })?;
            if line.kind != EventKind::FuncStart {
                continue;
            }
            let remote_call_id = line.subject.sample_id;
            if let Some(previous) = index.get(&remote_call_id) {
                log::warn!(
                    "{file}:{}: remote call id {remote_call_id} already started at line {}, calls to it cannot be resolved",
                    line_index + 1,
                    previous + 1
                );
                reused.entry(remote_call_id).or_insert(line_index);
                continue;
            }
            index.insert(remote_call_id, line_index);
        }
        log::debug!("indexed {} remote calls in {file}", index.len());
        Ok(Self {
            file,
            lines,
            index,
            reused,
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn nb_remote_calls(&self) -> usize {
        self.index.len()
    }

    /// Index of the first FUNC_START line of the remote call
    pub fn start_line(&self, remote_call_id: u32) -> Option<usize> {
        self.index.get(&remote_call_id).copied()
    }

    /// Whether more than one FUNC_START carries this remote call id
    pub fn is_ambiguous(&self, remote_call_id: u32) -> bool {
        self.reused.contains_key(&remote_call_id)
    }

    fn parse_line(&self, line_index: usize) -> Result<LogLine<'_>> {
        LogLine::parse(&self.lines[line_index]).map_err(|source| Error::Format {
            file: self.file.clone(),
            line: line_index + 1,
            source,
        })
    }

    /// Scans from the FUNC_START of the remote call to its FUNC_END, accumulating what
    /// the responder logged under the same subject
    pub fn remote_call_stats(&self, remote_call_id: u32) -> Result<RemoteCallStats> {
        let start_index = self
            .start_line(remote_call_id)
            .ok_or_else(|| Error::UnknownRemoteCall {
                file: self.file.clone(),
                remote_call_id,
            })?;
        if let Some(second_index) = self.reused.get(&remote_call_id) {
            return Err(Error::AmbiguousRemoteCall {
                file: self.file.clone(),
                remote_call_id,
                first_line: start_index + 1,
                second_line: second_index + 1,
            });
        }
        let start = self.parse_line(start_index)?;
        let mut stats = RemoteCallStats::default();
        for line_index in start_index + 1..self.lines.len() {
            if self.lines[line_index].trim().is_empty() {
                continue;
            }
            let line = self.parse_line(line_index)?;
            if line.subject != start.subject {
                continue;
            }
            let format_error = |source| Error::Format {
                file: self.file.clone(),
                line: line_index + 1,
                source,
            };
            if line.kind == EventKind::FuncEnd {
                let server_time = line.time.checked_sub(start.time);
                stats.server_time =
                    overflow_checked(server_time, "server time").map_err(format_error)?;
                return Ok(stats);
            }
            stats
                .apply_event(&line, remote_call_id)
                .map_err(format_error)?;
        }
        Err(Error::UnterminatedRemoteCall {
            file: self.file.clone(),
            line: start_index + 1,
            remote_call_id,
        })
    }
}

/// Non-negative integer argument of a line: sizes, durations and counts
pub fn count_arg(line: &LogLine<'_>, arg: usize) -> LineResult<u64> {
    let value = line.int_arg(arg)?;
    u64::try_from(value).map_err(|_| {
        LineError::MalformedLine(format!("{} argument {value} is negative", line.kind))
    })
}

/// Result of a checked operation on a counter accumulated from log lines
pub(crate) fn overflow_checked<T>(value: Option<T>, counter: &str) -> LineResult<T> {
    value.ok_or_else(|| LineError::MalformedLine(format!("{counter} overflows")))
}
