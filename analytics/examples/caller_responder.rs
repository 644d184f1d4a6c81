//! Plays both sides of a remote call workload, then correlates the two logs.
//!
//! `cargo run -p idcm-analytics --example caller_responder -- <dir>`
use anyhow::{Context, Result};
use idcm_analytics::prelude::*;
use idcm_telemetry_sink::TelemetryGuardBuilder;
use idcm_tracing::panic_hook::init_panic_hook;
use idcm_tracing::prelude::*;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

struct Request {
    message: String,
    reply: mpsc::Sender<(String, u32)>,
}

fn serve(
    logger: Arc<Logger>,
    requests: mpsc::Receiver<Request>,
    greeted: Arc<(Mutex<u32>, Condvar)>,
) {
    for request in requests {
        let guard = logger.invocation_scope(
            "Greet",
            &[Feature::new("msg_len", request.message.len() as i32)],
        );
        let subject = guard.subject().clone();
        let mut reply = logger.tracked_alloc(&subject, request.message.len() + 6);
        reply.as_mut_slice()[..6].copy_from_slice(b"Hello ");
        reply.as_mut_slice()[6..].copy_from_slice(request.message.as_bytes());
        {
            let (count, cond) = &*greeted;
            let mut count = logger.timed_lock(&subject, count);
            *count += 1;
            cond.notify_all();
        }
        let text = String::from_utf8_lossy(reply.as_slice()).into_owned();
        logger.tracked_free(&subject, reply);
        drop(guard);
        if request.reply.send((text, subject.sample_id)).is_err() {
            log::warn!("caller went away");
        }
    }
}

fn main() -> Result<()> {
    let _telemetry_guard = TelemetryGuardBuilder::default().build()?;
    let dir = std::env::args().nth(1).unwrap_or_else(|| ".".into());
    let client = Arc::new(
        LoggerBuilder::new(Side::Client)
            .with_log_dir(&dir)
            .build()
            .with_context(|| "opening client log")?,
    );
    let server = Arc::new(
        LoggerBuilder::new(Side::Server)
            .with_log_dir(&dir)
            .build()
            .with_context(|| "opening server log")?,
    );

    init_panic_hook(&client);
    init_panic_hook(&server);

    let greeted = Arc::new((Mutex::new(0u32), Condvar::new()));
    let (sender, receiver) = mpsc::channel();
    let responder = {
        let server = server.clone();
        let greeted = greeted.clone();
        thread::spawn(move || serve(server, receiver, greeted))
    };

    for (index, message) in ["world", "there", "again"].iter().enumerate() {
        let scope = client.invocation_scope(
            "SayHello",
            &[
                Feature::new("msg_len", message.len() as i32),
                Feature::new("delay", 0.5_f64 * index as f64),
            ],
        );
        let subject = scope.subject().clone();
        let (reply_sender, reply_receiver) = mpsc::channel();
        client.remote_call_start(&subject);
        sender
            .send(Request {
                message: (*message).to_owned(),
                reply: reply_sender,
            })
            .with_context(|| "sending request")?;
        let (reply, remote_call_id) = reply_receiver.recv().with_context(|| "waiting for reply")?;
        client.remote_call_end(&subject, remote_call_id);
        println!("{reply}");

        let (count, cond) = &*greeted;
        let guard = client.timed_lock(&subject, count);
        let (guard, _timed_out) =
            client.timed_condition_timed_wait(guard, cond, Duration::from_millis(10 * index as u64));
        drop(guard);
    }
    drop(sender);
    responder
        .join()
        .map_err(|_| anyhow::anyhow!("responder panicked"))?;
    client.flush();
    server.flush();

    let config = TraceMergeConfig::in_dir(&dir);
    let trace = generate_perf_trace(&config, true)?;
    let merge = simple_merge_files(&config)?;
    println!(
        "{} samples, {} artifacts, {} merged lines",
        trace.correlation.report.samples,
        trace.artifacts.len(),
        merge.client_lines + merge.server_lines
    );
    Ok(())
}
