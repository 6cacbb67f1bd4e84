//! Metrics sink boundary.
//!
//! Index logic MUST NOT depend on any concrete metrics backend.
//! All instrumentation flows through MetricsEvent and MetricsSink;
//! a thread-local override lets tests capture events in isolation.

use crate::scan::ShardId;
use std::cell::RefCell;

thread_local! {
    static SINK: RefCell<Option<Box<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    /// One row was turned into `produced` binary index entries.
    KeysDerived { produced: usize },

    /// One shard batch arrived.
    BatchFetched {
        shard: ShardId,
        entries: usize,
        has_more: bool,
    },

    /// The per-shard dedup set dropped a replayed entry.
    DuplicateDropped { shard: ShardId },

    /// A range descriptor was provably empty; no shard was contacted.
    EmptyRange,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// Record an event on the thread's sink, if one is installed.
pub fn emit(event: MetricsEvent) {
    SINK.with_borrow(|sink| {
        if let Some(sink) = sink.as_ref() {
            sink.record(event);
        }
    });
}

/// Run `f` with `sink` installed for the current thread, restoring the
/// previous sink afterwards. Intended for tests.
pub fn with_sink<R>(sink: Box<dyn MetricsSink>, f: impl FnOnce() -> R) -> R {
    let previous = SINK.with_borrow_mut(|slot| slot.replace(sink));
    let result = f();
    SINK.with_borrow_mut(|slot| {
        *slot = previous;
    });
    result
}
