use crate::errors::{Error, Result};
use crate::sample::{FunctionRecord, Sample};
use crate::server_log_index::{ServerLog, count_arg};
use idcm_tracing::prelude::*;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

/// Counters of a correlation run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorrelationReport {
    pub caller_lines: usize,
    pub functions: usize,
    pub samples: usize,
    pub remote_calls: usize,
    pub samples_with_leaks: usize,
    pub samples_with_clock_skew: usize,
    pub approximate_samples: usize,
}

/// Outcome of a successful run: every sample of every function, ended
#[derive(Debug)]
pub struct Correlation {
    pub functions: BTreeMap<String, FunctionRecord>,
    pub report: CorrelationReport,
}

/// Folds the caller log, one line at a time, into per-sample aggregates.
///
/// Remote calls are resolved against the responder log when their `RPC_end` is seen.
pub struct Correlator<'a> {
    server_log: &'a ServerLog,
    file: String,
    functions: BTreeMap<String, FunctionRecord>,
    caller_lines: usize,
    remote_calls: usize,
}

fn sample_mut<'f>(
    functions: &'f mut BTreeMap<String, FunctionRecord>,
    file: &str,
    line_number: usize,
    subject: &Subject,
) -> Result<&'f mut Sample> {
    functions
        .get_mut(&subject.function_name)
        .and_then(|record| record.samples.get_mut(&subject.sample_id))
        .ok_or_else(|| Error::UnknownSubject {
            file: file.to_owned(),
            line: line_number,
            subject: subject.to_string(),
        })
}

impl<'a> Correlator<'a> {
    pub fn new(server_log: &'a ServerLog, file: impl Into<String>) -> Self {
        Self {
            server_log,
            file: file.into(),
            functions: BTreeMap::new(),
            caller_lines: 0,
            remote_calls: 0,
        }
    }

    fn format_error(&self, line_number: usize, source: idcm_tracing::errors::Error) -> Error {
        Error::Format {
            file: self.file.clone(),
            line: line_number,
            source,
        }
    }

    fn on_start(&mut self, line_number: usize, line: &LogLine<'_>) -> Result<()> {
        let features = line
            .args
            .iter()
            .map(|token| token.parse::<Feature>())
            .collect::<idcm_tracing::errors::Result<Vec<_>>>()
            .map_err(|source| self.format_error(line_number, source))?;
        let subject = &line.subject;
        if subject.sample_id == 1 && !self.functions.contains_key(&subject.function_name) {
            self.functions.insert(
                subject.function_name.clone(),
                FunctionRecord::new(subject.function_name.clone()),
            );
        }
        let Some(record) = self.functions.get_mut(&subject.function_name) else {
            return Err(Error::UnknownFunction {
                file: self.file.clone(),
                line: line_number,
                function: subject.function_name.clone(),
                subject: subject.to_string(),
            });
        };
        if record.samples.contains_key(&subject.sample_id) {
            return Err(Error::DuplicateSample {
                file: self.file.clone(),
                line: line_number,
                subject: subject.to_string(),
            });
        }
        record.samples.insert(
            subject.sample_id,
            Sample::new(subject.sample_id, line.time, features),
        );
        Ok(())
    }

    fn on_remote_call_end(
        &mut self,
        line_number: usize,
        line: &LogLine<'_>,
        remote_call_id: u32,
    ) -> Result<()> {
        let stats = self.server_log.remote_call_stats(remote_call_id)?;
        let sample = sample_mut(&mut self.functions, &self.file, line_number, &line.subject)?;
        let Some(call_start) = sample.pending_remote_call.take() else {
            return Err(Error::RemoteCallWithoutStart {
                file: self.file.clone(),
                line: line_number,
                subject: line.subject.to_string(),
            });
        };
        let added = sample.add_remote_call(call_start, line.time, &stats);
        added.map_err(|source| self.format_error(line_number, source))?;
        self.remote_calls += 1;
        Ok(())
    }

    fn check_not_ended(&mut self, line_number: usize, line: &LogLine<'_>) -> Result<()> {
        let sample = sample_mut(&mut self.functions, &self.file, line_number, &line.subject)?;
        if sample.is_finished() {
            return Err(Error::EventAfterEnd {
                file: self.file.clone(),
                line: line_number,
                subject: line.subject.to_string(),
                kind: line.kind.to_string(),
            });
        }
        Ok(())
    }

    /// Applies one caller log line; `line_number` is 1-based and only used in errors
    pub fn process_line(&mut self, line_number: usize, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let line = LogLine::parse(text).map_err(|source| self.format_error(line_number, source))?;
        self.caller_lines += 1;
        if line.kind == EventKind::FuncStart {
            return self.on_start(line_number, &line);
        }
        self.check_not_ended(line_number, &line)?;
        if line.kind == EventKind::RpcEnd {
            let remote_call_id = count_arg(&line, 0)
                .and_then(|id| {
                    u32::try_from(id).map_err(|_| {
                        idcm_tracing::errors::Error::MalformedLine(format!(
                            "remote call id {id} out of range"
                        ))
                    })
                })
                .map_err(|source| self.format_error(line_number, source))?;
            return self.on_remote_call_end(line_number, &line, remote_call_id);
        }
        let sample = sample_mut(&mut self.functions, &self.file, line_number, &line.subject)?;
        let applied = sample.apply_event(&line);
        applied.map_err(|source| self.format_error(line_number, source))
    }

    /// Checks that every sample ended and computes the run's counters
    pub fn finish(self) -> Result<Correlation> {
        if self.caller_lines == 0 {
            return Err(Error::EmptyLog(self.file.into()));
        }
        let mut report = CorrelationReport {
            caller_lines: self.caller_lines,
            functions: self.functions.len(),
            remote_calls: self.remote_calls,
            ..CorrelationReport::default()
        };
        for record in self.functions.values() {
            for sample in record.samples.values() {
                if !sample.is_finished() {
                    return Err(Error::MissingEnd {
                        subject: Subject::new(record.name.clone(), sample.sample_id).to_string(),
                    });
                }
                report.samples += 1;
                if sample.has_leaks() {
                    report.samples_with_leaks += 1;
                }
                if sample.has_clock_skew() {
                    report.samples_with_clock_skew += 1;
                }
                if sample.approximate_server_memory {
                    report.approximate_samples += 1;
                }
            }
        }
        log::info!(
            "correlated {} samples of {} functions, {} remote calls",
            report.samples,
            report.functions,
            report.remote_calls
        );
        if report.samples_with_clock_skew > 0 {
            log::warn!(
                "{} samples have a negative network time, client and server clocks are skewed",
                report.samples_with_clock_skew
            );
        }
        Ok(Correlation {
            functions: self.functions,
            report,
        })
    }
}

/// Correlates a caller log read from `reader` with an already indexed responder log
pub fn correlate_reader<R: BufRead>(
    reader: R,
    file: &Path,
    server_log: &ServerLog,
) -> Result<Correlation> {
    let mut correlator = Correlator::new(server_log, file.display().to_string());
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| Error::Read {
            path: file.to_path_buf(),
            source,
        })?;
        correlator.process_line(index + 1, &line)?;
    }
    correlator.finish()
}

/// Correlates the caller log at `client_log` with the responder log at `server_log`
pub fn correlate(client_log: &Path, server_log: &Path) -> Result<Correlation> {
    let server_log = ServerLog::read(server_log)?;
    let file = std::fs::File::open(client_log).map_err(|source| Error::Read {
        path: client_log.to_path_buf(),
        source,
    })?;
    correlate_reader(std::io::BufReader::new(file), client_log, &server_log)
}
