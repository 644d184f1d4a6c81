//! Aggregated performance records
use crate::server_log_index::{RemoteCallStats, count_arg, overflow_checked};
use idcm_tracing::errors::{Error as LineError, Result as LineResult};
use idcm_tracing::prelude::*;
use std::collections::BTreeMap;

/// Aggregate of one execution of one function, caller and responder sides combined.
///
/// Times are in milliseconds. Network time is derived from two independent clocks and
/// can be negative, see [`Sample::has_clock_skew`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub sample_id: u32,
    pub features: Vec<Feature>,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub exec_time: i64,
    pub network_time: i64,
    pub server_time: i64,
    pub remote_calls: u32,
    pub memory_usage: u64,
    pub server_memory_usage: u64,
    /// malloc count minus free count
    pub mem_leaks: i64,
    pub server_mem_leaks: i64,
    pub min_page_faults: u64,
    pub maj_page_faults: u64,
    pub server_min_page_faults: u64,
    pub server_maj_page_faults: u64,
    pub waiting_time: u64,
    pub lock_holding_time: u64,
    pub server_waiting_time: u64,
    pub server_lock_holding_time: u64,
    /// a responder reallocated memory, server memory usage is approximate
    pub approximate_server_memory: bool,
    pub(crate) pending_remote_call: Option<i64>,
}

impl Sample {
    pub fn new(sample_id: u32, start_time: i64, features: Vec<Feature>) -> Self {
        Self {
            sample_id,
            features,
            start_time,
            ..Self::default()
        }
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn has_leaks(&self) -> bool {
        self.mem_leaks > 0 || self.server_mem_leaks > 0
    }

    /// Network time below zero can only come from the drift between the two clocks
    pub fn has_clock_skew(&self) -> bool {
        self.network_time < 0
    }

    /// Totals are `None` when local and remote values do not fit together in a u64
    pub fn total_memory(&self) -> Option<u64> {
        self.memory_usage.checked_add(self.server_memory_usage)
    }

    pub fn total_lock_holding_time(&self) -> Option<u64> {
        self.lock_holding_time
            .checked_add(self.server_lock_holding_time)
    }

    pub fn total_waiting_time(&self) -> Option<u64> {
        self.waiting_time.checked_add(self.server_waiting_time)
    }

    pub fn total_min_page_faults(&self) -> Option<u64> {
        self.min_page_faults
            .checked_add(self.server_min_page_faults)
    }

    pub fn total_maj_page_faults(&self) -> Option<u64> {
        self.maj_page_faults
            .checked_add(self.server_maj_page_faults)
    }

    /// Applies a caller event other than `FUNC_START` and `RPC_end`
    pub(crate) fn apply_event(&mut self, line: &LogLine<'_>) -> LineResult<()> {
        match line.kind {
            EventKind::FuncEnd => {
                let exec_time = line.time.checked_sub(self.start_time);
                self.exec_time = overflow_checked(exec_time, "exec time")?;
                self.end_time = Some(line.time);
            }
            EventKind::Malloc => {
                let memory = self.memory_usage.checked_add(count_arg(line, 0)?);
                self.memory_usage = overflow_checked(memory, "memory usage")?;
                self.mem_leaks = overflow_checked(self.mem_leaks.checked_add(1), "malloc count")?;
            }
            EventKind::Realloc => {
                log::debug!("caller-side realloc of {} is not accounted", line.subject);
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
            EventKind::RpcStart => {
                self.pending_remote_call = Some(line.time);
            }
            EventKind::FuncStart | EventKind::RpcEnd => {
                return Err(LineError::MalformedLine(format!(
                    "{} cannot be applied to a started sample",
                    line.kind
                )));
            }
        }
        Ok(())
    }

    /// Adds what the responder did for a call issued at `call_start` and answered at `call_end`
    pub(crate) fn add_remote_call(
        &mut self,
        call_start: i64,
        call_end: i64,
        stats: &RemoteCallStats,
    ) -> LineResult<()> {
        let network_time = call_end
            .checked_sub(call_start)
            .and_then(|round_trip| round_trip.checked_sub(stats.server_time))
            .and_then(|network_time| self.network_time.checked_add(network_time));
        let network_time = overflow_checked(network_time, "network time")?;
        let server_time = overflow_checked(
            self.server_time.checked_add(stats.server_time),
            "server time",
        )?;
        let memory = overflow_checked(
            self.server_memory_usage.checked_add(stats.memory_usage),
            "server memory usage",
        )?;
        let leaks = overflow_checked(
            self.server_mem_leaks.checked_add(stats.mem_leaks),
            "server malloc count",
        )?;
        let minor = overflow_checked(
            self.server_min_page_faults.checked_add(stats.min_page_faults),
            "server minor page faults",
        )?;
        let major = overflow_checked(
            self.server_maj_page_faults.checked_add(stats.maj_page_faults),
            "server major page faults",
        )?;
        let waiting = overflow_checked(
            self.server_waiting_time.checked_add(stats.waiting_time),
            "server waiting time",
        )?;
        let holding = overflow_checked(
            self.server_lock_holding_time
                .checked_add(stats.lock_holding_time),
            "server lock holding time",
        )?;
        let remote_calls = overflow_checked(self.remote_calls.checked_add(1), "remote call count")?;

        self.network_time = network_time;
        self.server_time = server_time;
        self.server_memory_usage = memory;
        self.server_mem_leaks = leaks;
        self.server_min_page_faults = minor;
        self.server_maj_page_faults = major;
        self.server_waiting_time = waiting;
        self.server_lock_holding_time = holding;
        self.remote_calls = remote_calls;
        self.approximate_server_memory |= stats.realloc_seen;
        Ok(())
    }
}

/// All the samples of one function, the unit of binary output
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRecord {
    pub name: String,
    pub samples: BTreeMap<u32, Sample>,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: BTreeMap::new(),
        }
    }
}
