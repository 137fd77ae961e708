//! Correlation fields attached to every record.

use std::collections::BTreeMap;

use super::span::SpanContext;

pub const TRACE_ID_FIELD: &str = "traceId";
pub const SPAN_ID_FIELD: &str = "spanId";
pub const SAMPLED_FIELD: &str = "sampled";

/// Correlation fields of one record. Empty when no trace is active.
pub type CorrelationFields = BTreeMap<String, String>;

/// Something that knows the caller's active trace.
///
/// Called once per emitted record, on the emitting thread.
pub trait CorrelationSource: Send + Sync {
    fn current_fields(&self) -> CorrelationFields;
}

impl<F> CorrelationSource for F
where
    F: Fn() -> CorrelationFields + Send + Sync,
{
    fn current_fields(&self) -> CorrelationFields {
        self()
    }
}

/// Reads the span entered on the current thread via [`SpanContext::enter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AmbientTraceContext;

impl CorrelationSource for AmbientTraceContext {
    fn current_fields(&self) -> CorrelationFields {
        SpanContext::current()
            .map(|span| span_fields(&span))
            .unwrap_or_default()
    }
}

/// Never reports a trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTraceContext;

impl CorrelationSource for NoTraceContext {
    fn current_fields(&self) -> CorrelationFields {
        CorrelationFields::new()
    }
}

/// Correlation fields for a span. Invalid spans yield nothing.
pub fn span_fields(span: &SpanContext) -> CorrelationFields {
    let mut fields = CorrelationFields::new();
    if !span.is_valid() {
        return fields;
    }
    fields.insert(TRACE_ID_FIELD.to_string(), span.trace_id.clone());
    fields.insert(SPAN_ID_FIELD.to_string(), span.span_id.clone());
    fields.insert(SAMPLED_FIELD.to_string(), span.sampled.to_string());
    fields
}
