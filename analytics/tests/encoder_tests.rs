use idcm_analytics::correlate::correlate_reader;
use idcm_analytics::decoder::{DecodedFeature, read_trace, read_trace_file};
use idcm_analytics::encoder::{TracePlan, artifact_path, encode_function_record, write_artifacts};
use idcm_analytics::errors::Error;
use idcm_analytics::sample::{FunctionRecord, Sample};
use idcm_analytics::server_log_index::ServerLog;
use idcm_tracing::prelude::*;
use std::path::Path;

fn greet_record() -> FunctionRecord {
    let mut record = FunctionRecord::new("Greet");
    let mut first = Sample::new(
        1,
        0,
        vec![Feature::new("msg_len", 5), Feature::new("ratio", 2.75_f32)],
    );
    first.end_time = Some(12);
    first.exec_time = 12;
    first.memory_usage = 64;
    first.server_memory_usage = 32;
    first.lock_holding_time = 3;
    first.server_lock_holding_time = 4;
    first.waiting_time = 1;
    first.server_waiting_time = 2;
    first.min_page_faults = 5;
    first.server_min_page_faults = 1;
    first.server_maj_page_faults = 2;
    let mut second = Sample::new(
        2,
        20,
        vec![Feature::new("msg_len", 7), Feature::new("weight", -3.9_f64)],
    );
    second.end_time = Some(24);
    second.exec_time = 4;
    record.samples.insert(1, first);
    record.samples.insert(2, second);
    record
}

fn feature(name: &str, type_name: &str, value: i64) -> DecodedFeature {
    DecodedFeature {
        name: name.into(),
        type_name: type_name.into(),
        value,
    }
}

#[test]
fn test_layout() {
    let record = greet_record();
    let plan = TracePlan::new(&record);
    // name: 4 + 5, names: 4 + (2+7) + (2+5) + (2+6), types: 4 + (2+3) + (2+5) + (2+6)
    assert_eq!(plan.feature_name_offset("msg_len"), Some(13));
    assert_eq!(plan.feature_name_offset("ratio"), Some(22));
    assert_eq!(plan.feature_name_offset("weight"), Some(29));
    assert_eq!(plan.feature_type_offset("int"), Some(41));
    assert_eq!(plan.feature_type_offset("float"), Some(46));
    assert_eq!(plan.feature_type_offset("double"), Some(53));
    assert_eq!(plan.size(), 61 + 4 + 2 * 112);

    let bytes = encode_function_record(&record).unwrap();
    assert_eq!(bytes.len(), plan.size());
    assert_eq!(&bytes[0..4], &5u32.to_le_bytes());
    assert_eq!(&bytes[4..9], b"Greet");
    assert_eq!(&bytes[9..13], &3u32.to_le_bytes());
    assert_eq!(&bytes[13..15], &7u16.to_le_bytes());
    assert_eq!(&bytes[15..22], b"msg_len");
    assert_eq!(&bytes[41..43], &3u16.to_le_bytes());
    assert_eq!(&bytes[43..46], b"int");
}

#[test]
fn test_round_trip() {
    let record = greet_record();
    let decoded = read_trace(&encode_function_record(&record).unwrap()).unwrap();
    assert_eq!(decoded.name, "Greet");
    assert_eq!(decoded.feature_names, vec!["msg_len", "ratio", "weight"]);
    assert_eq!(decoded.feature_types, vec!["int", "float", "double"]);
    assert_eq!(decoded.samples.len(), 2);

    let first = &decoded.samples[0];
    assert_eq!(first.sample_id, 1);
    assert_eq!(first.exec_time, 12);
    assert_eq!(first.total_memory, 96);
    assert_eq!(first.total_lock_hold, 7);
    assert_eq!(first.total_wait, 3);
    assert_eq!(first.total_min_faults, 6);
    assert_eq!(first.total_maj_faults, 2);
    assert_eq!(
        first.features,
        vec![feature("msg_len", "int", 5), feature("ratio", "float", 2)]
    );
    assert_eq!(first.branch_count, 0);
    assert_eq!(first.child_count, 0);

    let second = &decoded.samples[1];
    assert_eq!(second.sample_id, 2);
    assert_eq!(second.exec_time, 4);
    assert_eq!(
        second.features,
        vec![feature("msg_len", "int", 7), feature("weight", "double", -3)]
    );
}

#[test]
fn test_interned_offsets_are_shared() {
    let record = greet_record();
    let decoded = read_trace(&encode_function_record(&record).unwrap()).unwrap();
    let first = &decoded.samples[0].feature_offsets;
    let second = &decoded.samples[1].feature_offsets;
    assert_eq!(first[0], second[0]);
    assert_eq!(first[0], (13, 41));
    assert_ne!(first[1].0, second[1].0);
    assert_eq!(
        decoded
            .feature_names
            .iter()
            .filter(|name| *name == "msg_len")
            .count(),
        1
    );
}

#[test]
fn test_correlated_round_trip() {
    let client = "\
0 f1 FUNC_START x=int&5 r=float&2.9 big=long&-9000000000
10 f1 RPC_start
12 f1 RPC_end 1
15 f1 FUNC_END
";
    let server = ServerLog::from_lines(
        "server_log.txt".into(),
        vec![
            "5 g1 FUNC_START".into(),
            "6 g1 malloc 40".into(),
            "8 g1 FUNC_END".into(),
        ],
    )
    .unwrap();
    let correlation =
        correlate_reader(client.as_bytes(), Path::new("client_log.txt"), &server).unwrap();
    let decoded = read_trace(&encode_function_record(&correlation.functions["f"]).unwrap()).unwrap();
    assert_eq!(decoded.feature_types, vec!["int", "float", "long"]);
    let sample = &decoded.samples[0];
    assert_eq!(sample.exec_time, 15);
    assert_eq!(sample.total_memory, 40);
    assert_eq!(
        sample.features,
        vec![
            feature("x", "int", 5),
            feature("r", "float", 2),
            feature("big", "long", -9_000_000_000),
        ]
    );
}

#[test]
fn test_invalid_artifacts() {
    let bytes = encode_function_record(&greet_record()).unwrap();
    assert!(matches!(
        read_trace(&bytes[..bytes.len() - 1]),
        Err(Error::InvalidArtifact(_))
    ));
    let mut trailing = bytes.clone();
    trailing.push(0);
    assert!(matches!(read_trace(&trailing), Err(Error::InvalidArtifact(_))));
    let mut bad_offset = bytes;
    // name offset of the first feature of the first sample
    let feature_start = 61 + 4 + 56;
    bad_offset[feature_start..feature_start + 8].copy_from_slice(&14u64.to_le_bytes());
    assert!(matches!(
        read_trace(&bad_offset),
        Err(Error::InvalidArtifact(_))
    ));
}

#[test]
fn test_write_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let record = greet_record();
    let first = write_artifacts(dir.path(), [&record], 1_700_000_000).unwrap();
    assert_eq!(
        first,
        vec![dir.path().join("symbols/Greet/idcm_Greet_1700000000.bin")]
    );
    assert_eq!(first[0], artifact_path(dir.path(), "Greet", 1_700_000_000));
    let second = write_artifacts(dir.path(), [&record], 1_700_000_000).unwrap();
    assert_eq!(
        second,
        vec![dir.path().join("symbols/Greet/idcm_Greet_1700000000_1.bin")]
    );
    let decoded = read_trace_file(&first[0]).unwrap();
    assert_eq!(decoded, read_trace_file(&second[0]).unwrap());
    assert_eq!(decoded.samples.len(), 2);
}

#[test]
fn test_no_artifact_on_invalid_name() {
    let dir = tempfile::tempdir().unwrap();
    let good = greet_record();
    let bad = FunctionRecord::new("../escape");
    let err = write_artifacts(dir.path(), [&good, &bad], 1).unwrap_err();
    assert!(matches!(err, Error::InvalidFunctionName(_)));
    assert!(!dir.path().join("symbols").exists());
}

#[test]
fn test_totals_must_fit_the_artifact() {
    let mut record = greet_record();
    let sample = record.samples.get_mut(&1).unwrap();
    sample.memory_usage = u64::MAX;
    sample.server_memory_usage = 1;
    let err = encode_function_record(&record).unwrap_err();
    match err {
        Error::Encode { function, reason } => {
            assert_eq!(function, "Greet");
            assert!(reason.to_string().contains("total memory"), "{reason}");
        }
        other => panic!("unexpected error {other}"),
    }

    let mut record = greet_record();
    record.samples.get_mut(&2).unwrap().exec_time = -1;
    assert!(matches!(
        encode_function_record(&record),
        Err(Error::Encode { .. })
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(write_artifacts(dir.path(), [&record], 1).is_err());
    assert!(!dir.path().join("symbols").exists());
}

#[test]
fn test_failed_write_removes_written_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("symbols")).unwrap();
    // a regular file where the directory of Blocked should go
    std::fs::write(dir.path().join("symbols/Blocked"), b"").unwrap();
    let good = greet_record();
    let blocked = FunctionRecord::new("Blocked");
    let err = write_artifacts(dir.path(), [&good, &blocked], 1).unwrap_err();
    assert!(matches!(err, Error::Write { .. }), "unexpected error {err}");
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("symbols/Greet"))
        .unwrap()
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
