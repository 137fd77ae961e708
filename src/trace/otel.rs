//! Correlation from the OpenTelemetry active context.
//!
//! For services whose spans are created by an OpenTelemetry tracer rather
//! than through [`SpanContext::enter`](super::SpanContext::enter).

use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;

use super::mixin::{CorrelationFields, CorrelationSource, SAMPLED_FIELD, SPAN_ID_FIELD, TRACE_ID_FIELD};

/// Reads the span of `opentelemetry::Context::current()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtelTraceContext;

impl CorrelationSource for OtelTraceContext {
    fn current_fields(&self) -> CorrelationFields {
        let cx = Context::current();
        let span = cx.span();
        let span_context = span.span_context();

        let mut fields = CorrelationFields::new();
        if !span_context.is_valid() {
            return fields;
        }
        fields.insert(TRACE_ID_FIELD.to_string(), span_context.trace_id().to_string());
        fields.insert(SPAN_ID_FIELD.to_string(), span_context.span_id().to_string());
        fields.insert(SAMPLED_FIELD.to_string(), span_context.is_sampled().to_string());
        fields
    }
}
