//! Ambient span context.
//!
//! A tracing layer marks a span as active for the current thread with
//! [`SpanContext::enter`]; the returned scope restores the previous span when
//! dropped. The logger only ever reads this stack.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

struct ActiveSpan {
    scope_id: u64,
    span: SpanContext,
}

thread_local! {
    static ACTIVE_SPANS: RefCell<Vec<ActiveSpan>> = const { RefCell::new(Vec::new()) };
}

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifiers of a span as seen by the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
    pub sampled: bool,
}

impl SpanContext {
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>, sampled: bool) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            sampled,
        }
    }

    /// Empty or all-zero ids mark an invalid context.
    pub fn is_valid(&self) -> bool {
        fn valid_id(id: &str) -> bool {
            !id.is_empty() && id.chars().any(|c| c != '0')
        }
        valid_id(&self.trace_id) && valid_id(&self.span_id)
    }

    /// Make this span the active one on the current thread.
    pub fn enter(self) -> SpanScope {
        let scope_id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        ACTIVE_SPANS.with(|spans| {
            spans.borrow_mut().push(ActiveSpan {
                scope_id,
                span: self,
            })
        });
        SpanScope {
            id: scope_id,
            _not_send: PhantomData,
        }
    }

    /// Span active on the current thread, if any.
    pub fn current() -> Option<SpanContext> {
        ACTIVE_SPANS.with(|spans| spans.borrow().last().map(|active| active.span.clone()))
    }
}

/// Guard returned by [`SpanContext::enter`].
///
/// Bound to the thread that entered the span. Dropping it deactivates its
/// own span even when scopes entered later are still alive.
#[must_use = "the span is only active while the scope is alive"]
#[derive(Debug)]
pub struct SpanScope {
    id: u64,
    _not_send: PhantomData<*const ()>,
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        // `try_with` so a scope dropped during thread teardown is harmless.
        let _ = ACTIVE_SPANS.try_with(|spans| {
            let mut spans = spans.borrow_mut();
            if let Some(pos) = spans.iter().rposition(|active| active.scope_id == self.id) {
                spans.remove(pos);
            }
        });
    }
}
