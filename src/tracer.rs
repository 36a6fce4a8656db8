//! A zero-cost tracing abstraction for the evaluator.
//!
//! Callers that don't care about observability pay nothing beyond a vtable
//! call to [`NoopTracer`]; callers that want step-by-step insight into
//! evaluation order (tests, a future debugger) implement [`Tracer`] or use
//! the provided [`RecordingTracer`].
//!
//! | Tracer | Purpose |
//! |---|---|
//! | `NoopTracer` | default; discards every event |
//! | `RecordingTracer` | buffers events for test assertions |
//! | `StderrTracer` | prints each event to stderr as it happens |

use std::cell::RefCell;

use crate::source::SourcePos;

#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    StmtStart { pos: SourcePos },
    StmtEnd { pos: SourcePos },
    Poisoned { message: String },
}

pub trait Tracer {
    fn on_event(&self, event: TraceEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn on_event(&self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn on_event(&self, event: TraceEvent) {
        eprintln!("{event:?}");
    }
}

/// Buffers every event it receives, in order, for test assertions.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: RefCell<Vec<TraceEvent>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }
}

impl Tracer for RecordingTracer {
    fn on_event(&self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }
}
