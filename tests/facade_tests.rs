//! End-to-end behavior of the logger over real and in-memory destinations.

use std::io::{self, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use logfan_core::{
    FormatMode, HttpError, LogInput, Logger, LoggingConfig, MemorySink, SerializedRecord,
    Severity, Sink, SinkError, SpanContext,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

/// Counts write calls and keeps nothing.
#[derive(Clone, Default)]
struct SpySink {
    writes: Arc<AtomicUsize>,
}

impl Sink for SpySink {
    fn name(&self) -> &str {
        "spy"
    }

    fn write(&self, _record: &SerializedRecord) -> Result<(), SinkError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RejectingSink;

impl Sink for RejectingSink {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn write(&self, _record: &SerializedRecord) -> Result<(), SinkError> {
        Err(SinkError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
    }
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }
}

fn config(min_level: Severity) -> LoggingConfig {
    LoggingConfig::new(min_level, FormatMode::Structured)
}

#[test]
fn test_debug_below_info_reaches_no_destination() {
    let spy = SpySink::default();
    let memory = MemorySink::default();
    let logger = Logger::builder(config(Severity::Info))
        .destination(spy.clone())
        .destination(memory.clone())
        .build();

    logger.debug("x");
    assert_eq!(spy.writes.load(Ordering::SeqCst), 0);
    assert!(memory.is_empty());

    logger.info("x");
    assert_eq!(spy.writes.load(Ordering::SeqCst), 1);
    let value = &memory.values()[0];
    assert_eq!(value["message"], json!("x"));
    assert!(value.get("traceId").is_none());
    assert!(value.get("spanId").is_none());
    assert!(value.get("logging.googleapis.com/trace").is_none());
}

#[test]
fn test_every_destination_gets_identical_bytes() {
    let sinks: Vec<MemorySink> = (0..4).map(|i| MemorySink::new(format!("m{}", i))).collect();
    let logger = Logger::builder(config(Severity::Debug))
        .destinations(
            sinks
                .iter()
                .cloned()
                .map(|s| Box::new(s) as Box<dyn Sink>)
                .collect(),
        )
        .build();

    logger.warn(json!({"event": "CACHE_MISS", "key": "user:7"}));

    let first = sinks[0].records();
    assert_eq!(first.len(), 1);
    for sink in &sinks[1..] {
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_bytes(), first[0].as_bytes());
    }
}

#[test]
fn test_failing_destination_does_not_stop_others() {
    let before = MemorySink::new("before");
    let after = MemorySink::new("after");
    let logger = Logger::builder(config(Severity::Info))
        .destination(before.clone())
        .destination(RejectingSink)
        .destination(after.clone())
        .build();

    logger.error("boom");

    assert_eq!(before.len(), 1);
    assert_eq!(after.len(), 1);
    assert_eq!(logger.dropped_writes(), 1);
}

#[test]
fn test_http_error_scenario_has_no_original_stack() {
    let memory = MemorySink::default();
    let logger = Logger::builder(config(Severity::Info))
        .destination(memory.clone())
        .base_fields(Map::new())
        .build();

    let untyped = json!({
        "statusCode": 404,
        "message": "not found",
        "stack": "NotFoundError: not found\n    at handler",
        "data": {"id": 1}
    });
    logger.error(LogInput::classify(untyped));

    let value = &memory.values()[0];
    assert_eq!(value["statusCode"], json!(404));
    assert_eq!(value["message"], json!("not found"));
    assert_eq!(value["stack"], json!("NotFoundError: not found\n    at handler"));
    assert_eq!(value["data"], json!({"id": 1}));
    assert!(value.get("originalErrorStack").is_none());
    assert_eq!(value["severity"], json!("ERROR"));
}

#[test]
fn test_http_error_keeps_original_stack_separately() {
    let memory = MemorySink::default();
    let logger = Logger::builder(config(Severity::Info))
        .destination(memory.clone())
        .build();

    let cause = anyhow::anyhow!("connection refused").context("loading user");
    logger.error(
        HttpError::new(502, "upstream failed")
            .with_stack("BadGatewayError: upstream failed")
            .with_original_error(cause),
    );

    let value = &memory.values()[0];
    assert_eq!(value["stack"], json!("BadGatewayError: upstream failed"));
    let original = value["originalErrorStack"].as_str().unwrap();
    assert!(original.contains("loading user"));
    assert!(original.contains("connection refused"));
}

#[test]
fn test_anyhow_error_logs_its_chain() {
    let memory = MemorySink::default();
    let logger = Logger::builder(config(Severity::Info))
        .destination(memory.clone())
        .build();

    let err = anyhow::anyhow!("socket closed").context("sending batch");
    logger.error(err);

    let message = memory.values()[0]["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("sending batch"));
    assert!(message.contains("socket closed"));
}

#[test]
fn test_concurrent_spans_do_not_cross() {
    let memory = MemorySink::default();
    let logger = Logger::builder(config(Severity::Info))
        .destination(memory.clone())
        .build();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|id| {
            let logger = logger.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let _scope =
                    SpanContext::new(format!("trace-{}", id), format!("span-{}", id), true).enter();
                barrier.wait();
                for _ in 0..50 {
                    logger.info(json!({ "worker": id }));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let values = memory.values();
    assert_eq!(values.len(), 100);
    for value in values {
        let worker = value["worker"].as_str().unwrap();
        assert_eq!(value["traceId"], json!(format!("trace-{}", worker)));
        assert_eq!(value["spanId"], json!(format!("span-{}", worker)));
    }
}

#[test]
fn test_pretty_console_from_config() {
    let buf = SharedBuf::default();
    let mut base = Map::new();
    base.insert("pid".to_string(), json!(42));
    base.insert("hostname".to_string(), json!("box"));
    let logger = Logger::builder(LoggingConfig::new(Severity::Info, FormatMode::Pretty))
        .console_writer(Box::new(buf.clone()))
        .base_fields(base)
        .build();

    logger.with_fields([("requestId", json!("r-1"))]).info("ready");

    let out = buf.contents();
    let mut lines = out.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with('['));
    assert!(header.ends_with("] INFO (42 on box): ready"));
    assert_eq!(lines.next(), Some("    requestId: r-1"));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_structured_console_from_env_vars() {
    let buf = SharedBuf::default();
    let config = LoggingConfig::from_vars([
        ("LOG_LEVEL", "warn"),
        ("STD_OUT_LOG_FORMAT", "json"),
        ("FLUENTD_HOST", "fluentd.local"),
        ("FLUENTD_TAG", "api"),
    ])
    .unwrap();
    let logger = Logger::builder(config)
        .console_writer(Box::new(buf.clone()))
        .build();
    assert_eq!(logger.destinations(), vec!["structured-console"]);

    logger.info("dropped");
    logger.warn("kept");

    let out = buf.contents();
    assert_eq!(out.lines().count(), 1);
    let value: Value = serde_json::from_str(out.trim_end()).unwrap();
    assert_eq!(value["severity"], json!("WARNING"));
    assert_eq!(value["message"], json!("kept"));
}

#[test]
fn test_forwarder_receives_records_and_close_drains() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = LoggingConfig::new(Severity::Info, FormatMode::Structured)
        .with_forwarder("127.0.0.1", port, "api");
    let logger = Logger::builder(config)
        .console_writer(Box::new(io::sink()))
        .build();
    assert_eq!(
        logger.destinations(),
        vec!["structured-console", "fluentd-forwarder"]
    );

    logger.info("one");
    logger.with_fields([("requestId", json!("r-9"))]).error("two");
    logger.close();

    let (mut stream, _) = listener.accept().unwrap();
    let mut received = String::new();
    stream.read_to_string(&mut received).unwrap();
    let entries: Vec<Value> = received
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0][0], json!("api"));
    assert_eq!(entries[0][2]["message"], json!("one"));
    assert_eq!(entries[1][2]["requestId"], json!("r-9"));
    assert_eq!(logger.dropped_writes(), 0);
}

#[test]
fn test_emit_after_close_is_total() {
    let memory = MemorySink::default();
    let logger = Logger::builder(config(Severity::Info))
        .destination(memory.clone())
        .build();

    logger.close();
    logger.info("after close");
    logger.flush();
}
