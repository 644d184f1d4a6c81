//! Human-readable account of a correlation, written to the trace log
use crate::errors::{Error, Result};
use crate::sample::{FunctionRecord, Sample};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

pub fn describe_sample(function_name: &str, sample: &Sample) -> String {
    let mut text = String::new();
    // writing to a String cannot fail
    let _ = writeln!(
        text,
        "{function_name} took {} ms, of which approx. {} ms in network and approx. {} ms in server.",
        sample.exec_time, sample.network_time, sample.server_time
    );
    let _ = writeln!(
        text,
        "Used {} bytes of memory client-side and {} bytes of memory server-side.",
        sample.memory_usage, sample.server_memory_usage
    );
    if sample.mem_leaks > 0 {
        let _ = writeln!(
            text,
            "Possible client memory leak detected! {} malloc call(s) not freed.",
            sample.mem_leaks
        );
    }
    if sample.server_mem_leaks > 0 {
        let _ = writeln!(
            text,
            "Possible server memory leak detected! {} malloc call(s) not freed.",
            sample.server_mem_leaks
        );
    }
    let _ = writeln!(
        text,
        "Page faults: {} minor and {} major client-side, {} minor and {} major server-side.",
        sample.min_page_faults,
        sample.maj_page_faults,
        sample.server_min_page_faults,
        sample.server_maj_page_faults
    );
    let _ = writeln!(
        text,
        "Waited {} ms for locks and held them {} ms client-side, waited {} ms and held them {} ms server-side.",
        sample.waiting_time,
        sample.lock_holding_time,
        sample.server_waiting_time,
        sample.server_lock_holding_time
    );
    if sample.has_clock_skew() {
        let _ = writeln!(
            text,
            "Note: negative network time, client and server clocks are skewed."
        );
    }
    if sample.approximate_server_memory {
        let _ = writeln!(
            text,
            "Note: server memory usage is approximate, realloc calls were made."
        );
    }
    if !sample.features.is_empty() {
        let _ = write!(text, "Found {} feature(s):", sample.features.len());
        for feature in &sample.features {
            let _ = write!(text, " {feature}");
        }
        text.push('\n');
    }
    text
}

pub fn describe_function(record: &FunctionRecord) -> String {
    let mut text = format!("=== {} ({} runs) ===\n", record.name, record.samples.len());
    for (sample_id, sample) in &record.samples {
        let _ = writeln!(text, "Run #{sample_id}");
        text.push_str(&describe_sample(&record.name, sample));
        text.push('\n');
    }
    text
}

pub fn describe(functions: &BTreeMap<String, FunctionRecord>) -> String {
    functions.values().map(describe_function).collect()
}

pub fn write_trace_log(path: &Path, functions: &BTreeMap<String, FunctionRecord>) -> Result<()> {
    for record in functions.values() {
        log::info!("{}", describe_function(record).trim_end());
    }
    std::fs::write(path, describe(functions)).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("wrote {}", path.display());
    Ok(())
}
