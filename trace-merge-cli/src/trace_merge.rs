//! Trace merge CLI

use anyhow::{Context, Result};
use clap::Parser;
use idcm_analytics::config::{
    CLIENT_LOG_FILE, MERGED_LOG_FILE, SERVER_LOG_FILE, TRACE_LOG_FILE, TraceMergeConfig,
};
use idcm_analytics::decoder::{DecodedTrace, read_trace_file};
use idcm_analytics::merge::simple_merge_files;
use idcm_analytics::perf_trace::generate_perf_trace;
use idcm_telemetry_sink::TelemetryGuardBuilder;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "trace-merge")]
#[clap(
    about = "Correlates client and server event logs into performance traces",
    version,
    author
)]
struct Cli {
    /// Interleave the two logs into the merged log instead of correlating them
    #[clap(long)]
    simple: bool,

    #[clap(long, env = "IDCM_CLIENT_LOG", default_value = CLIENT_LOG_FILE)]
    client_log: PathBuf,

    #[clap(long, env = "IDCM_SERVER_LOG", default_value = SERVER_LOG_FILE)]
    server_log: PathBuf,

    /// Human-readable report
    #[clap(long, default_value = TRACE_LOG_FILE)]
    trace_log: PathBuf,

    #[clap(long, default_value = MERGED_LOG_FILE)]
    merged_log: PathBuf,

    /// Binary traces are written under <OUTPUT_DIR>/symbols/
    #[clap(long, env = "IDCM_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Only write the human-readable report
    #[clap(long)]
    no_binary: bool,

    /// Print the content of a binary trace and exit
    #[clap(long, value_name = "ARTIFACT")]
    dump: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> TraceMergeConfig {
        TraceMergeConfig {
            client_log: self.client_log.clone(),
            server_log: self.server_log.clone(),
            trace_log: self.trace_log.clone(),
            merged_log: self.merged_log.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

fn print_trace(trace: &DecodedTrace) {
    println!("{}", trace.name);
    println!("feature names: {}", trace.feature_names.join(", "));
    println!("feature types: {}", trace.feature_types.join(", "));
    for sample in &trace.samples {
        let features: Vec<String> = sample
            .features
            .iter()
            .map(|f| format!("{}={}&{}", f.name, f.type_name, f.value))
            .collect();
        println!(
            "#{} exec={} memory={} lock_hold={} wait={} faults={}/{} {}",
            sample.sample_id,
            sample.exec_time,
            sample.total_memory,
            sample.total_lock_hold,
            sample.total_wait,
            sample.total_min_faults,
            sample.total_maj_faults,
            features.join(" ")
        );
    }
}

fn main() -> Result<()> {
    let _telemetry_guard = TelemetryGuardBuilder::default().build()?;
    let args = Cli::parse();

    if let Some(path) = &args.dump {
        let trace =
            read_trace_file(path).with_context(|| format!("reading {}", path.display()))?;
        print_trace(&trace);
        return Ok(());
    }

    let config = args.config();
    if args.simple {
        simple_merge_files(&config).with_context(|| "merging logs")?;
        return Ok(());
    }

    let trace = generate_perf_trace(&config, !args.no_binary)
        .with_context(|| "generating performance trace")?;
    let report = &trace.correlation.report;
    log::info!(
        "{} samples ({} with leaks, {} with clock skew), {} artifacts",
        report.samples,
        report.samples_with_leaks,
        report.samples_with_clock_skew,
        trace.artifacts.len()
    );
    for path in &trace.artifacts {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Cli::parse_from(["trace-merge", "--no-binary"]);
        assert!(args.no_binary);
        assert!(!args.simple);
        assert_eq!(args.trace_log, PathBuf::from("trace_log.txt"));
        assert_eq!(args.merged_log, PathBuf::from("merged_log.txt"));
    }
}
