//! Console destinations.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use colored::Colorize;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::record::{SerializedRecord, Severity};

use super::{Sink, SinkError};

type Writer = Box<dyn Write + Send>;

/// Keys shown in the pretty header rather than as detail lines.
const HEADER_KEYS: [&str; 5] = ["level", "time", "pid", "hostname", "msg"];

/// Human-readable console output.
///
/// Parses each pretty-mode JSON line back and renders
/// `[HH:MM:SS.mmm] LEVEL (pid on host): msg` followed by one indented line per
/// remaining field. Lines that are not JSON objects are written unchanged.
pub struct PrettyConsoleSink {
    writer: Mutex<Writer>,
    colorize: bool,
}

impl PrettyConsoleSink {
    pub fn stdout() -> Self {
        let colorize = io::stdout().is_terminal();
        Self::new(Box::new(io::stdout()), colorize)
    }

    pub fn new(writer: Writer, colorize: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            colorize,
        }
    }
}

impl Sink for PrettyConsoleSink {
    fn name(&self) -> &str {
        "pretty-console"
    }

    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError> {
        let mut writer = self.writer.lock();
        match record.to_value() {
            Some(Value::Object(fields)) => {
                writer.write_all(render_pretty(&fields, self.colorize).as_bytes())?
            }
            _ => writer.write_all(record.as_bytes())?,
        }
        // Console output is unbuffered from the caller's point of view.
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

/// Render one pretty-mode record.
pub fn render_pretty(fields: &Map<String, Value>, colorize: bool) -> String {
    let mut out = String::new();

    if let Some(time) = fields
        .get("time")
        .and_then(Value::as_i64)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
    {
        out.push_str(&format!("[{}] ", time.format("%H:%M:%S%.3f")));
    }

    let severity = fields
        .get("level")
        .and_then(Value::as_u64)
        .and_then(Severity::from_numeric);
    let label = severity
        .map(|s| s.as_str().to_ascii_uppercase())
        .unwrap_or_else(|| "USERLVL".to_string());
    if colorize {
        let colored = match severity {
            Some(Severity::Debug) => label.blue(),
            Some(Severity::Info) => label.green(),
            Some(Severity::Warn) => label.yellow(),
            Some(Severity::Error) => label.red(),
            None => label.normal(),
        };
        out.push_str(&colored.to_string());
    } else {
        out.push_str(&label);
    }

    let pid = fields.get("pid").map(display_scalar);
    let hostname = fields.get("hostname").map(display_scalar);
    match (pid, hostname) {
        (Some(pid), Some(host)) => out.push_str(&format!(" ({} on {})", pid, host)),
        (Some(pid), None) => out.push_str(&format!(" ({})", pid)),
        (None, Some(host)) => out.push_str(&format!(" (on {})", host)),
        (None, None) => {}
    }
    out.push(':');

    if let Some(msg) = fields.get("msg") {
        let msg = display_scalar(msg);
        out.push(' ');
        if colorize {
            out.push_str(&msg.cyan().to_string());
        } else {
            out.push_str(&msg);
        }
    }
    out.push('\n');

    for (key, value) in fields {
        if HEADER_KEYS.contains(&key.as_str()) {
            continue;
        }
        out.push_str(&format!("    {}: {}\n", key, indent(&display_detail(value))));
    }

    out
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_detail(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

/// Continuation lines line up under the detail key.
fn indent(text: &str) -> String {
    text.replace('\n', "\n        ")
}

/// Writes records verbatim, one JSON object per line.
pub struct StructuredConsoleSink {
    writer: Mutex<Writer>,
}

impl StructuredConsoleSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(writer: Writer) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl Sink for StructuredConsoleSink {
    fn name(&self) -> &str {
        "structured-console"
    }

    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError> {
        let mut writer = self.writer.lock();
        writer.write_all(record.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    /// Shared buffer usable as a boxed writer.
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

    fn line(value: Value) -> SerializedRecord {
        let mut bytes = serde_json::to_vec(&value).unwrap();
        bytes.push(b'\n');
        SerializedRecord::new(Severity::Info, bytes)
    }

    #[test]
    fn test_render_pretty_header_and_details() {
        let fields = json!({
            "level": 50,
            "time": 1769688000000i64,
            "pid": 42,
            "hostname": "box",
            "msg": "Error: boom\n    at main",
            "data": {"id": 1}
        });
        let rendered = render_pretty(fields.as_object().unwrap(), false);

        let expected = concat!(
            "[12:00:00.000] ERROR (42 on box): Error: boom\n    at main\n",
            "    data: {\n          \"id\": 1\n        }\n",
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_render_pretty_without_msg() {
        let fields = json!({"level": 30, "statusCode": 404});
        let rendered = render_pretty(fields.as_object().unwrap(), false);
        assert_eq!(rendered, "INFO:\n    statusCode: 404\n");
    }

    #[test]
    fn test_pretty_sink_writes_rendered_line() {
        let buf = SharedBuf::default();
        let sink = PrettyConsoleSink::new(Box::new(buf.clone()), false);

        sink.write(&line(json!({"level": 30, "msg": "ready"}))).unwrap();
        assert_eq!(buf.contents(), "INFO: ready\n");
    }

    #[test]
    fn test_pretty_sink_passes_through_non_json() {
        let buf = SharedBuf::default();
        let sink = PrettyConsoleSink::new(Box::new(buf.clone()), false);

        sink.write(&SerializedRecord::new(Severity::Warn, b"plain text\n".to_vec()))
            .unwrap();
        assert_eq!(buf.contents(), "plain text\n");
    }

    #[test]
    fn test_structured_sink_is_verbatim() {
        let buf = SharedBuf::default();
        let sink = StructuredConsoleSink::new(Box::new(buf.clone()));
        let record = line(json!({"severity": "INFO", "message": "x"}));

        sink.write(&record).unwrap();
        assert_eq!(buf.contents().as_bytes(), record.as_bytes());
    }
}
