//! Diagnostic interleaving of the two logs.
//!
//! The responder segment of each remote call is inserted before the caller's `RPC_end`.
//! The responder cursor never rewinds: remote calls must resolve in the order they were issued.
use crate::config::TraceMergeConfig;
use crate::errors::{Error, Result};
use idcm_tracing::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub const SERVER_TAG: &str = "[server]";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub client_lines: usize,
    pub server_lines: usize,
    pub remote_calls: usize,
}

fn remote_call_id(line: &str) -> Option<u32> {
    let mut tokens = line.split_whitespace().skip(2);
    match (tokens.next(), tokens.next()) {
        (Some(kind), Some(id)) if kind == EventKind::RpcEnd.as_str() => id.parse().ok(),
        _ => None,
    }
}

/// Responder lines of one remote call: from the FUNC_START carrying its id to the
/// FUNC_END of that same subject
struct Segment {
    remote_call_id: u32,
    start: Option<(Subject, usize)>,
}

impl Segment {
    fn new(remote_call_id: u32) -> Self {
        Self {
            remote_call_id,
            start: None,
        }
    }

    /// Whether `line` closes the segment; a second start of the id inside it is ambiguous
    fn ends_with(&mut self, line: &str, line_number: usize, file: &Path) -> Result<bool> {
        let Ok(line) = LogLine::parse(line) else {
            return Ok(false);
        };
        if line.subject.sample_id != self.remote_call_id {
            return Ok(false);
        }
        match line.kind {
            EventKind::FuncStart => {
                if let Some((_, first_line)) = &self.start {
                    return Err(Error::AmbiguousRemoteCall {
                        file: file.display().to_string(),
                        remote_call_id: self.remote_call_id,
                        first_line: *first_line,
                        second_line: line_number,
                    });
                }
                self.start = Some((line.subject, line_number));
                Ok(false)
            }
            EventKind::FuncEnd => Ok(self
                .start
                .as_ref()
                .is_none_or(|(subject, _)| *subject == line.subject)),
            _ => Ok(false),
        }
    }
}

/// Copies the caller log to `output`, splicing in the tagged responder lines of each
/// remote call. Paths of `config` only name the streams in errors.
pub fn simple_merge<C: BufRead, S: BufRead, W: Write>(
    client: C,
    server: S,
    mut output: W,
    config: &TraceMergeConfig,
) -> Result<MergeStats> {
    let write_error = |source| Error::Write {
        path: config.merged_log.clone(),
        source,
    };
    let mut server_lines = server.lines();
    let mut server_line_number = 0;
    let mut stats = MergeStats::default();
    for line in client.lines() {
        let line = line.map_err(|source| Error::Read {
            path: config.client_log.clone(),
            source,
        })?;
        stats.client_lines += 1;
        if let Some(call_id) = remote_call_id(&line) {
            let start_line = server_line_number + 1;
            let mut segment = Segment::new(call_id);
            loop {
                let Some(server_line) = server_lines.next() else {
                    return Err(Error::UnterminatedRemoteCall {
                        file: config.server_log.display().to_string(),
                        line: start_line,
                        remote_call_id: call_id,
                    });
                };
                let server_line = server_line.map_err(|source| Error::Read {
                    path: config.server_log.clone(),
                    source,
                })?;
                server_line_number += 1;
                stats.server_lines += 1;
                writeln!(output, "{server_line} {SERVER_TAG}").map_err(write_error)?;
                if segment.ends_with(&server_line, server_line_number, &config.server_log)? {
                    break;
                }
            }
            stats.remote_calls += 1;
        }
        writeln!(output, "{line}").map_err(write_error)?;
    }
    output.flush().map_err(write_error)?;
    Ok(stats)
}

/// Merges the logs named by `config` into its `merged_log`
pub fn simple_merge_files(config: &TraceMergeConfig) -> Result<MergeStats> {
    let open = |path: &Path| {
        File::open(path)
            .map(BufReader::new)
            .map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })
    };
    let client = open(&config.client_log)?;
    let server = open(&config.server_log)?;
    let output = File::create(&config.merged_log).map_err(|source| Error::Write {
        path: config.merged_log.clone(),
        source,
    })?;
    let stats = simple_merge(client, server, BufWriter::new(output), config)?;
    log::info!(
        "merged {} client lines and {} server lines into {}",
        stats.client_lines,
        stats.server_lines,
        config.merged_log.display()
    );
    Ok(stats)
}
