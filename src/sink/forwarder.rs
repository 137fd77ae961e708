//! Fluentd forwarder destination.
//!
//! Records are queued to a background worker that owns the TCP connection
//! and sends each one in forward-protocol JSON mode:
//! `["<tag>", <epoch seconds>, {record}]`.
//!
//! Delivery is best effort. A full queue drops the record, a failed send
//! drops the record and the connection; the next record reconnects. After a
//! failed connect, records are dropped without reconnecting until the
//! backoff expires. `flush` and `close` give up after the drain timeout.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::config::ForwarderConfig;
use crate::record::{SerializedRecord, Severity};

use super::{Sink, SinkError};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
const SEND_RETRY_INTERVAL: Duration = Duration::from_millis(5);

enum Command {
    Record(SerializedRecord),
    Flush(SyncSender<()>),
}

struct WorkerHandle {
    thread: JoinHandle<()>,
    /// Signalled once the worker has left its loop.
    done: Receiver<()>,
}

/// Sends records to a Fluentd `in_forward` endpoint.
pub struct ForwarderSink {
    config: ForwarderConfig,
    min_level: Severity,
    drain_timeout: Duration,
    sender: Mutex<Option<SyncSender<Command>>>,
    worker: Mutex<Option<WorkerHandle>>,
    /// Tells a worker that outlived `close` to stop without draining.
    abort: Arc<AtomicBool>,
}

impl ForwarderSink {
    /// Start the worker. It connects right away, off the caller's thread.
    pub fn spawn(config: ForwarderConfig, min_level: Severity) -> Result<Self, SinkError> {
        Self::with_capacity(config, min_level, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        config: ForwarderConfig,
        min_level: Severity,
        capacity: usize,
    ) -> Result<Self, SinkError> {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let abort = Arc::new(AtomicBool::new(false));
        let worker = ForwarderWorker::new(config.clone(), Arc::clone(&abort));
        let thread = thread::Builder::new()
            .name(format!("fluentd-forwarder-{}", config.tag))
            .spawn(move || {
                worker.run(receiver);
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            config,
            min_level,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(WorkerHandle {
                thread,
                done: done_rx,
            })),
            abort,
        })
    }

    /// Upper bound on how long `flush` and `close` wait for the worker.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    pub fn min_level(&self) -> Severity {
        self.min_level
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}

impl Sink for ForwarderSink {
    fn name(&self) -> &str {
        "fluentd-forwarder"
    }

    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError> {
        if record.severity() < self.min_level {
            return Ok(());
        }
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(SinkError::Closed)?;
        sender
            .try_send(Command::Record(record.clone()))
            .map_err(|e| match e {
                TrySendError::Full(_) => SinkError::Full,
                TrySendError::Disconnected(_) => SinkError::Closed,
            })
    }

    /// Wait until every queued record has been handed to the socket, or
    /// until the drain timeout.
    fn flush(&self) -> Result<(), SinkError> {
        let sender = match self.sender.lock().as_ref() {
            Some(sender) => sender.clone(),
            None => return Ok(()),
        };
        let deadline = Instant::now() + self.drain_timeout;

        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        let mut command = Command::Flush(ack_tx);
        loop {
            match sender.try_send(command) {
                Ok(()) => break,
                Err(TrySendError::Full(returned)) => {
                    if Instant::now() >= deadline {
                        return Err(SinkError::TimedOut(self.drain_timeout));
                    }
                    command = returned;
                    thread::sleep(SEND_RETRY_INTERVAL);
                }
                Err(TrySendError::Disconnected(_)) => return Err(SinkError::Closed),
            }
        }
        drop(sender);

        ack_rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => SinkError::TimedOut(self.drain_timeout),
                RecvTimeoutError::Disconnected => SinkError::Closed,
            })
    }

    /// Drain the queue, then stop the worker and drop the connection.
    ///
    /// A worker still busy after the drain timeout is told to stop and left
    /// to exit on its own.
    fn close(&self) -> Result<(), SinkError> {
        // Without senders the worker ends once the queue is empty.
        drop(self.sender.lock().take());

        let Some(worker) = self.worker.lock().take() else {
            return Ok(());
        };
        match worker.done.recv_timeout(self.drain_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => worker
                .thread
                .join()
                .map_err(|_| SinkError::Panicked("forwarder worker".to_string())),
            Err(RecvTimeoutError::Timeout) => {
                self.abort.store(true, Ordering::Relaxed);
                log::debug!(
                    "FORWARDER_CLOSE_TIMED_OUT tag={} timeout_ms={} action=detach_worker",
                    self.config.tag,
                    self.drain_timeout.as_millis()
                );
                Err(SinkError::TimedOut(self.drain_timeout))
            }
        }
    }
}

struct ForwarderWorker {
    config: ForwarderConfig,
    stream: Option<TcpStream>,
    abort: Arc<AtomicBool>,
    /// No connect attempts before this instant.
    retry_at: Option<Instant>,
    connect_attempts: u64,
    dropped: u64,
}

impl ForwarderWorker {
    fn new(config: ForwarderConfig, abort: Arc<AtomicBool>) -> Self {
        Self {
            config,
            stream: None,
            abort,
            retry_at: None,
            connect_attempts: 0,
            dropped: 0,
        }
    }

    fn run(mut self, receiver: Receiver<Command>) {
        self.connect();

        // Ends once every sender is gone and the queue is empty.
        for command in receiver {
            if self.abort.load(Ordering::Relaxed) {
                break;
            }
            match command {
                Command::Record(record) => self.send(&record),
                Command::Flush(ack) => {
                    if let Some(stream) = self.stream.as_mut() {
                        let _ = stream.flush();
                    }
                    let _ = ack.send(());
                }
            }
        }

        log::debug!(
            "FORWARDER_STOPPED host={} port={} tag={} dropped={}",
            self.config.host,
            self.config.port,
            self.config.tag,
            self.dropped
        );
    }

    fn connect(&mut self) {
        self.connect_attempts += 1;
        match self.open_stream() {
            Some(stream) => {
                self.stream = Some(stream);
                self.retry_at = None;
            }
            None => {
                self.retry_at = Some(Instant::now() + RECONNECT_BACKOFF);
                log::debug!(
                    "FORWARDER_RECONNECT_DEFERRED tag={} backoff_ms={}",
                    self.config.tag,
                    RECONNECT_BACKOFF.as_millis()
                );
            }
        }
    }

    fn open_stream(&self) -> Option<TcpStream> {
        let addrs = match (self.config.host.as_str(), self.config.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::debug!(
                    "FORWARDER_RESOLVE_FAILED host={} port={} error={}",
                    self.config.host,
                    self.config.port,
                    e
                );
                return None;
            }
        };

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    let _ = stream.set_write_timeout(Some(WRITE_TIMEOUT));
                    let _ = stream.set_nodelay(true);
                    log::debug!("FORWARDER_CONNECTED addr={} tag={}", addr, self.config.tag);
                    return Some(stream);
                }
                Err(e) => {
                    log::debug!("FORWARDER_CONNECT_FAILED addr={} error={}", addr, e);
                }
            }
        }
        None
    }

    fn send(&mut self, record: &SerializedRecord) {
        if self.stream.is_none() {
            if self.retry_at.is_some_and(|at| Instant::now() < at) {
                self.dropped += 1;
                return;
            }
            self.connect();
        }
        let Some(stream) = self.stream.as_mut() else {
            self.dropped += 1;
            return;
        };

        let entry = forward_entry(&self.config.tag, record);
        if let Err(e) = stream.write_all(&entry) {
            log::debug!(
                "FORWARDER_SEND_FAILED tag={} error={} action=reconnect_on_next_record",
                self.config.tag,
                e
            );
            self.stream = None;
            self.dropped += 1;
        }
    }
}

/// Build one forward-protocol entry, newline terminated.
///
/// Lines that are not JSON objects are wrapped as `{"message": line}`.
pub fn forward_entry(tag: &str, record: &SerializedRecord) -> Vec<u8> {
    let body = match record.to_value() {
        Some(value @ Value::Object(_)) => value,
        _ => json!({ "message": String::from_utf8_lossy(record.line()) }),
    };
    let entry = json!([tag, Utc::now().timestamp(), body]);
    let mut bytes = entry.to_string().into_bytes();
    bytes.push(b'\n');
    bytes
}
