//! Reads trace artifacts back, resolving feature offsets to strings
use crate::errors::{Error, Result};
use anyhow::Context;
use idcm_transit::{read_advance_long_string, read_advance_short_string, read_consume_pod};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFeature {
    pub name: String,
    pub type_name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSample {
    pub sample_id: u32,
    pub exec_time: u64,
    pub total_memory: u64,
    pub total_lock_hold: u64,
    pub total_wait: u64,
    pub total_min_faults: u64,
    pub total_maj_faults: u64,
    pub features: Vec<DecodedFeature>,
    /// feature name and type offsets as stored in the file
    pub feature_offsets: Vec<(u64, u64)>,
    pub branch_count: u32,
    pub child_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTrace {
    pub name: String,
    pub feature_names: Vec<String>,
    pub feature_types: Vec<String>,
    pub samples: Vec<DecodedSample>,
}

// entries by the offset of their length prefix
fn read_table(
    buffer: &[u8],
    window: &mut &[u8],
) -> anyhow::Result<(Vec<String>, HashMap<u64, usize>)> {
    let count: u32 = read_consume_pod(window)?;
    let mut entries = vec![];
    let mut offsets = HashMap::new();
    for _ in 0..count {
        let offset = (buffer.len() - window.len()) as u64;
        offsets.insert(offset, entries.len());
        entries.push(read_advance_short_string(window)?);
    }
    Ok((entries, offsets))
}

fn resolve<'e>(
    entries: &'e [String],
    offsets: &HashMap<u64, usize>,
    offset: u64,
) -> anyhow::Result<&'e str> {
    let index = offsets
        .get(&offset)
        .with_context(|| format!("offset {offset} does not point at a table entry"))?;
    Ok(&entries[*index])
}

fn parse_trace(buffer: &[u8]) -> anyhow::Result<DecodedTrace> {
    let mut window = buffer;
    let name = read_advance_long_string(&mut window).with_context(|| "reading function name")?;
    let (feature_names, name_offsets) =
        read_table(buffer, &mut window).with_context(|| "reading feature names")?;
    let (feature_types, type_offsets) =
        read_table(buffer, &mut window).with_context(|| "reading feature types")?;
    let sample_count: u32 = read_consume_pod(&mut window)?;
    let mut samples = vec![];
    for index in 0..sample_count {
        let sample_id: u32 =
            read_consume_pod(&mut window).with_context(|| format!("reading sample #{index}"))?;
        let exec_time = read_consume_pod(&mut window)?;
        let total_memory = read_consume_pod(&mut window)?;
        let total_lock_hold = read_consume_pod(&mut window)?;
        let total_wait = read_consume_pod(&mut window)?;
        let total_min_faults = read_consume_pod(&mut window)?;
        let total_maj_faults = read_consume_pod(&mut window)?;
        let feature_count: u32 = read_consume_pod(&mut window)?;
        let mut features = vec![];
        let mut feature_offsets = vec![];
        for _ in 0..feature_count {
            let name_offset: u64 = read_consume_pod(&mut window)?;
            let type_offset: u64 = read_consume_pod(&mut window)?;
            let value: i64 = read_consume_pod(&mut window)?;
            features.push(DecodedFeature {
                name: resolve(&feature_names, &name_offsets, name_offset)
                    .with_context(|| format!("feature name of sample {sample_id}"))?
                    .to_owned(),
                type_name: resolve(&feature_types, &type_offsets, type_offset)
                    .with_context(|| format!("feature type of sample {sample_id}"))?
                    .to_owned(),
                value,
            });
            feature_offsets.push((name_offset, type_offset));
        }
        let branch_count = read_consume_pod(&mut window)?;
        let child_count = read_consume_pod(&mut window)?;
        samples.push(DecodedSample {
            sample_id,
            exec_time,
            total_memory,
            total_lock_hold,
            total_wait,
            total_min_faults,
            total_maj_faults,
            features,
            feature_offsets,
            branch_count,
            child_count,
        });
    }
    anyhow::ensure!(
        window.is_empty(),
        "{} trailing bytes after the last sample",
        window.len()
    );
    Ok(DecodedTrace {
        name,
        feature_names,
        feature_types,
        samples,
    })
}

pub fn read_trace(buffer: &[u8]) -> Result<DecodedTrace> {
    parse_trace(buffer).map_err(Error::InvalidArtifact)
}

pub fn read_trace_file(path: &Path) -> Result<DecodedTrace> {
    let buffer = std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    read_trace(&buffer)
}
