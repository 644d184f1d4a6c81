use idcm_tracing::logger::LOG_DIR_ENV_VAR;
use idcm_tracing::prelude::*;
use serial_test::serial;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

fn read_lines(logger: &Logger) -> Vec<String> {
    std::fs::read_to_string(logger.path())
        .expect("reading log")
        .lines()
        .map(String::from)
        .collect()
}

fn kinds(lines: &[String]) -> Vec<EventKind> {
    lines
        .iter()
        .map(|l| LogLine::parse(l).expect("parsing line").kind)
        .collect()
}

#[test]
fn test_invocation_lines() {
    let dir = tempfile::tempdir().unwrap();
    let logger = LoggerBuilder::new(Side::Server)
        .with_log_dir(dir.path())
        .build()
        .unwrap();
    let subject = logger.next_subject("Greet");
    assert_eq!(subject.to_string(), "Greet1");
    logger.begin_invocation(
        &subject,
        &[Feature::new("msg_len", 5), Feature::new("ratio", 0.5_f64)],
    );
    let mut buffer = logger.tracked_alloc(&subject, 10);
    buffer.as_mut_slice()[9] = 1;
    logger.tracked_realloc(&subject, &mut buffer, 20);
    assert_eq!(buffer.size(), 20);
    assert_eq!(buffer.as_slice()[9], 1);
    logger.tracked_free(&subject, buffer);
    logger.end_invocation(&subject);
    assert_eq!(logger.buffered_len(), 0);

    let lines = read_lines(&logger);
    assert_eq!(
        kinds(&lines),
        vec![
            EventKind::FuncStart,
            EventKind::Malloc,
            EventKind::Realloc,
            EventKind::Free,
            EventKind::PageFault,
            EventKind::FuncEnd
        ]
    );
    let start = LogLine::parse(&lines[0]).unwrap();
    assert_eq!(start.subject, subject);
    assert_eq!(start.args, vec!["msg_len=int&5", "ratio=double&0.5"]);
    assert_eq!(LogLine::parse(&lines[1]).unwrap().args, vec!["10"]);
    assert_eq!(LogLine::parse(&lines[2]).unwrap().args, vec!["20"]);
    assert_eq!(LogLine::parse(&lines[4]).unwrap().args.len(), 2);

    let times: Vec<i64> = lines
        .iter()
        .map(|l| LogLine::parse(l).unwrap().time)
        .collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_nothing_written_before_flush() {
    let dir = tempfile::tempdir().unwrap();
    let logger = LoggerBuilder::new(Side::Client)
        .with_log_dir(dir.path())
        .build()
        .unwrap();
    let subject = logger.next_subject("Respond");
    logger.begin_invocation(&subject, &[]);
    logger.remote_call_start(&subject);
    logger.remote_call_end(&subject, 1);
    assert_eq!(logger.buffered_len(), 3);
    assert!(read_lines(&logger).is_empty());
    logger.flush();
    assert_eq!(logger.buffered_len(), 0);
    let lines = read_lines(&logger);
    assert_eq!(
        kinds(&lines),
        vec![EventKind::FuncStart, EventKind::RpcStart, EventKind::RpcEnd]
    );
    assert_eq!(LogLine::parse(&lines[2]).unwrap().args, vec!["1"]);
}

#[test]
fn test_drop_flushes_remaining_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = {
        let logger = LoggerBuilder::new(Side::Client)
            .with_log_dir(dir.path())
            .build()
            .unwrap();
        let subject = logger.next_subject("f");
        logger.begin_invocation(&subject, &[]);
        logger.path().to_path_buf()
    };
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.ends_with("f1 FUNC_START\n"), "{text:?}");
}

#[test]
fn test_truncate_modes() {
    let dir = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        for (side, truncate) in [(Side::Client, None), (Side::Server, Some(false))] {
            let mut builder = LoggerBuilder::new(side).with_log_dir(dir.path());
            if let Some(truncate) = truncate {
                builder = builder.with_truncate(truncate);
            }
            let logger = builder.build().unwrap();
            let _scope = logger.invocation_scope("run", &[]);
        }
    }
    let client = std::fs::read_to_string(dir.path().join("client_log.txt")).unwrap();
    let server = std::fs::read_to_string(dir.path().join("server_log.txt")).unwrap();
    assert_eq!(client.lines().count(), 3);
    assert_eq!(server.lines().count(), 6);

    let server = LoggerBuilder::new(Side::Server)
        .with_log_dir(dir.path())
        .build()
        .unwrap();
    assert_eq!(std::fs::read_to_string(server.path()).unwrap(), "");
}

#[test]
fn test_server_ids_are_shared() {
    let dir = tempfile::tempdir().unwrap();
    let server = LoggerBuilder::new(Side::Server)
        .with_log_dir(dir.path())
        .build()
        .unwrap();
    let subjects: Vec<String> = ["Greet", "Double", "Greet"]
        .iter()
        .map(|name| server.next_subject(name).to_string())
        .collect();
    assert_eq!(subjects, vec!["Greet1", "Double2", "Greet3"]);

    let client = LoggerBuilder::new(Side::Client)
        .with_log_dir(dir.path())
        .build()
        .unwrap();
    assert_eq!(client.next_subject("Greet").to_string(), "Greet1");
    assert_eq!(client.next_subject("Double").to_string(), "Double1");
}

#[test]
fn test_invalid_names_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let logger = LoggerBuilder::new(Side::Client)
        .with_log_dir(dir.path())
        .build()
        .unwrap();
    assert!(logger.try_next_subject("sha256").is_err());
    assert!(logger.try_next_subject("say hello").is_err());
    // a refused name does not consume an id
    let subject = logger.try_next_subject("sha256_round").unwrap();
    assert_eq!(subject.to_string(), "sha256_round1");

    assert!(
        logger
            .try_begin_invocation(&Subject::new("sha256", 1), &[])
            .is_err()
    );
    assert!(
        logger
            .try_begin_invocation(&subject, &[Feature::new("msg len", 3)])
            .is_err()
    );
    assert!(
        logger
            .try_begin_invocation(&subject, &[Feature::new("a=b", 3)])
            .is_err()
    );
    assert_eq!(logger.buffered_len(), 0);

    logger
        .try_begin_invocation(&subject, &[Feature::new("msg_len", 3)])
        .unwrap();
    logger.end_invocation(&subject);
    let lines = read_lines(&logger);
    let start = LogLine::parse(&lines[0]).unwrap();
    assert_eq!(start.subject, subject);
    assert_eq!(start.args, vec!["msg_len=int&3"]);
}

#[test]
#[serial]
fn test_log_dir_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("logs");
    unsafe {
        std::env::set_var(LOG_DIR_ENV_VAR, &nested);
    }
    let logger = LoggerBuilder::new(Side::Server).build();
    unsafe {
        std::env::remove_var(LOG_DIR_ENV_VAR);
    }
    let logger = logger.unwrap();
    assert_eq!(logger.path(), nested.join("server_log.txt"));
    assert!(logger.path().exists());
}

#[test]
fn test_concurrent_invocations() {
    const NB_THREADS: usize = 8;
    const NB_RUNS: usize = 50;
    let dir = tempfile::tempdir().unwrap();
    let logger = Arc::new(
        LoggerBuilder::new(Side::Client)
            .with_log_dir(dir.path())
            .build()
            .unwrap(),
    );
    let mut threads = Vec::new();
    for thread_index in 0..NB_THREADS {
        let logger = logger.clone();
        threads.push(thread::spawn(move || {
            let name = if thread_index % 2 == 0 { "even" } else { "odd" };
            for run in 0..NB_RUNS {
                let scope = logger.invocation_scope(name, &[Feature::new("run", run as i32)]);
                let alloc = logger.tracked_alloc(scope.subject(), 16);
                logger.tracked_free(scope.subject(), alloc);
            }
        }));
    }
    for t in threads {
        t.join().unwrap();
    }

    let lines = read_lines(&logger);
    assert_eq!(lines.len(), NB_THREADS * NB_RUNS * 5);
    let mut starts: HashMap<Subject, usize> = HashMap::new();
    let mut ends: HashMap<Subject, usize> = HashMap::new();
    for line in &lines {
        let parsed = LogLine::parse(line).expect("every line is whole");
        match parsed.kind {
            EventKind::FuncStart => *starts.entry(parsed.subject).or_default() += 1,
            EventKind::FuncEnd => *ends.entry(parsed.subject).or_default() += 1,
            _ => {}
        }
    }
    assert_eq!(starts.len(), NB_THREADS * NB_RUNS);
    assert!(starts.values().all(|n| *n == 1));
    assert_eq!(starts.len(), ends.len());
    assert!(ends.values().all(|n| *n == 1));
    for name in ["even", "odd"] {
        let mut ids: Vec<u32> = starts
            .keys()
            .filter(|s| s.function_name == name)
            .map(|s| s.sample_id)
            .collect();
        ids.sort_unstable();
        let expected: Vec<u32> = (1..=(NB_THREADS / 2 * NB_RUNS) as u32).collect();
        assert_eq!(ids, expected);
    }
}
