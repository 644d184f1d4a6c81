use crate::errors::{Error, Result};
use crate::sample::{FunctionRecord, Sample};
use idcm_transit::{InternTable, write_any, write_long_string};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Artifacts live under `<output_dir>/symbols/<function>/`
pub const SYMBOLS_DIR: &str = "symbols";

// sample_id + 6 u64 metrics + feature_count
const SAMPLE_HEADER_SIZE: usize = 4 + 6 * 8 + 4;
// name offset, type offset, value
const FEATURE_SIZE: usize = 3 * 8;
// branch_count + child_count
const SAMPLE_TRAILER_SIZE: usize = 4 + 4;

/// Offsets and sizes of an artifact, computed before any byte is written
pub struct TracePlan<'a> {
    record: &'a FunctionRecord,
    feature_names: InternTable,
    feature_types: InternTable,
    name_offsets: HashMap<String, u64>,
    type_offsets: HashMap<String, u64>,
    size: usize,
}

impl<'a> TracePlan<'a> {
    pub fn new(record: &'a FunctionRecord) -> Self {
        let mut feature_names = InternTable::new();
        let mut feature_types = InternTable::new();
        for sample in record.samples.values() {
            for feature in &sample.features {
                feature_names.intern(&feature.name);
                feature_types.intern(feature.value.type_name());
            }
        }
        let header_size = 4 + record.name.len();
        let names_offset = header_size;
        let types_offset = names_offset + feature_names.size_bytes();
        let samples_offset = types_offset + feature_types.size_bytes();
        let name_offsets = owned_layout(&feature_names, names_offset as u64);
        let type_offsets = owned_layout(&feature_types, types_offset as u64);
        let samples_size: usize = record
            .samples
            .values()
            .map(|sample| {
                SAMPLE_HEADER_SIZE + sample.features.len() * FEATURE_SIZE + SAMPLE_TRAILER_SIZE
            })
            .sum();
        Self {
            record,
            feature_names,
            feature_types,
            name_offsets,
            type_offsets,
            size: samples_offset + 4 + samples_size,
        }
    }

    /// Total size of the artifact in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn feature_names(&self) -> &InternTable {
        &self.feature_names
    }

    pub fn feature_types(&self) -> &InternTable {
        &self.feature_types
    }

    /// Offset of the length prefix of an interned feature name
    pub fn feature_name_offset(&self, name: &str) -> Option<u64> {
        self.name_offsets.get(name).copied()
    }

    pub fn feature_type_offset(&self, type_name: &str) -> Option<u64> {
        self.type_offsets.get(type_name).copied()
    }

    fn write_sample(&self, buffer: &mut Vec<u8>, sample: &Sample) -> anyhow::Result<()> {
        let exec_time = u64::try_from(sample.exec_time).map_err(|_| {
            anyhow::anyhow!(
                "sample {} has a negative exec time {}",
                sample.sample_id,
                sample.exec_time
            )
        })?;
        write_any(buffer, &sample.sample_id);
        write_any(buffer, &exec_time);
        write_any(buffer, &total(sample, "memory", sample.total_memory())?);
        write_any(
            buffer,
            &total(sample, "lock holding time", sample.total_lock_holding_time())?,
        );
        write_any(
            buffer,
            &total(sample, "waiting time", sample.total_waiting_time())?,
        );
        write_any(
            buffer,
            &total(sample, "minor page faults", sample.total_min_page_faults())?,
        );
        write_any(
            buffer,
            &total(sample, "major page faults", sample.total_maj_page_faults())?,
        );
        write_any(buffer, &u32::try_from(sample.features.len())?);
        for feature in &sample.features {
            let name_offset = self
                .feature_name_offset(&feature.name)
                .ok_or_else(|| anyhow::anyhow!("feature {} was not interned", feature.name))?;
            let type_offset = self
                .feature_type_offset(feature.value.type_name())
                .ok_or_else(|| {
                    anyhow::anyhow!("feature type {} was not interned", feature.value.type_name())
                })?;
            write_any(buffer, &name_offset);
            write_any(buffer, &type_offset);
            write_any(buffer, &feature.value.to_i64());
        }
        write_any(buffer, &0u32);
        write_any(buffer, &0u32);
        Ok(())
    }

    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.size);
        write_long_string(&mut buffer, &self.record.name)?;
        self.feature_names.write(&mut buffer)?;
        self.feature_types.write(&mut buffer)?;
        write_any(&mut buffer, &u32::try_from(self.record.samples.len())?);
        for sample in self.record.samples.values() {
            self.write_sample(&mut buffer, sample)?;
        }
        anyhow::ensure!(
            buffer.len() == self.size,
            "planned {} bytes, wrote {}",
            self.size,
            buffer.len()
        );
        Ok(buffer)
    }
}

fn total(sample: &Sample, metric: &str, value: Option<u64>) -> anyhow::Result<u64> {
    value.ok_or_else(|| {
        anyhow::anyhow!(
            "total {metric} of sample {} does not fit in 64 bits",
            sample.sample_id
        )
    })
}

fn owned_layout(table: &InternTable, table_offset: u64) -> HashMap<String, u64> {
    table
        .layout(table_offset)
        .into_iter()
        .map(|(value, offset)| (value.to_owned(), offset))
        .collect()
}

/// Encodes the binary trace artifact of one function
pub fn encode_function_record(record: &FunctionRecord) -> Result<Vec<u8>> {
    TracePlan::new(record)
        .encode()
        .map_err(|reason| Error::Encode {
            function: record.name.clone(),
            reason,
        })
}

fn check_function_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidFunctionName(name.to_owned()));
    }
    Ok(())
}

/// `<output_dir>/symbols/<name>/idcm_<name>_<unix_timestamp>.bin`
pub fn artifact_path(output_dir: &Path, function_name: &str, unix_timestamp: i64) -> PathBuf {
    output_dir
        .join(SYMBOLS_DIR)
        .join(function_name)
        .join(format!("idcm_{function_name}_{unix_timestamp}.bin"))
}

// never overwrites: a second artifact in the same second gets a numeric suffix
fn create_artifact(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let write_error = |path: &Path, source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut candidate = path.to_path_buf();
    let mut suffix = 1;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                if let Err(source) = file.write_all(bytes) {
                    drop(file);
                    remove_artifacts(std::slice::from_ref(&candidate));
                    return Err(write_error(&candidate, source));
                }
                return Ok(candidate);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let stem = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                candidate = path.with_file_name(format!("{stem}_{suffix}.bin"));
                suffix += 1;
            }
            Err(source) => return Err(write_error(&candidate, source)),
        }
    }
}

fn remove_artifacts(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("cannot remove partial artifact {}: {e}", path.display());
        }
    }
}

fn write_artifact(
    output_dir: &Path,
    record: &FunctionRecord,
    bytes: &[u8],
    unix_timestamp: i64,
) -> Result<PathBuf> {
    let path = artifact_path(output_dir, &record.name, unix_timestamp);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| Error::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let path = create_artifact(&path, bytes)?;
    log::info!(
        "wrote {} ({} samples, {} bytes)",
        path.display(),
        record.samples.len(),
        bytes.len()
    );
    Ok(path)
}

/// Encodes every record, then writes one artifact per record.
///
/// Nothing is written if any record fails to encode, and the artifacts already
/// written are removed if a later one cannot be written.
pub fn write_artifacts<'r>(
    output_dir: &Path,
    records: impl IntoIterator<Item = &'r FunctionRecord>,
    unix_timestamp: i64,
) -> Result<Vec<PathBuf>> {
    let mut encoded = vec![];
    for record in records {
        check_function_name(&record.name)?;
        encoded.push((record, encode_function_record(record)?));
    }
    let mut paths = Vec::with_capacity(encoded.len());
    for (record, bytes) in encoded {
        match write_artifact(output_dir, record, &bytes, unix_timestamp) {
            Ok(path) => paths.push(path),
            Err(e) => {
                remove_artifacts(&paths);
                return Err(e);
            }
        }
    }
    Ok(paths)
}
