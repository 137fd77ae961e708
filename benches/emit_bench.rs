//! Emit-path throughput.
//!
//! - `suppressed`: call below the minimum level
//! - `single_sink`: one in-memory destination
//! - `fanout_3`: three destinations sharing one serialized record

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use logfan_core::{
    FormatMode, HttpError, Logger, LoggingConfig, SerializedRecord, Severity, Sink, SinkError,
};
use serde_json::json;

/// Accepts and discards every record.
struct NullSink;

impl Sink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError> {
        black_box(record.as_bytes());
        Ok(())
    }
}

fn logger(destinations: usize, format: FormatMode) -> Logger {
    let sinks: Vec<Box<dyn Sink>> = (0..destinations)
        .map(|_| Box::new(NullSink) as Box<dyn Sink>)
        .collect();
    Logger::builder(LoggingConfig::new(Severity::Info, format))
        .destinations(sinks)
        .build()
}

fn bench_suppressed(c: &mut Criterion) {
    let logger = logger(1, FormatMode::Structured);
    c.bench_function("suppressed", |b| {
        b.iter(|| logger.debug(black_box("not emitted")))
    });
}

fn bench_single_sink(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_sink");
    for format in [FormatMode::Pretty, FormatMode::Structured] {
        let logger = logger(1, format).with_fields([("requestId", json!("r-1"))]);
        group.bench_with_input(
            BenchmarkId::new("message", format!("{:?}", format)),
            &logger,
            |b, logger| b.iter(|| logger.info(black_box("request finished"))),
        );
        group.bench_with_input(
            BenchmarkId::new("http_error", format!("{:?}", format)),
            &logger,
            |b, logger| {
                b.iter(|| {
                    logger.error(
                        HttpError::new(404, "not found").with_data(json!({"path": "/users/7"})),
                    )
                })
            },
        );
    }
    group.finish();
}

fn bench_fanout(c: &mut Criterion) {
    let logger = logger(3, FormatMode::Structured);
    c.bench_function("fanout_3", |b| {
        b.iter(|| logger.info(black_box(json!({"event": "TICK", "n": 1}))))
    });
}

criterion_group!(benches, bench_suppressed, bench_single_sink, bench_fanout);
criterion_main!(benches);
