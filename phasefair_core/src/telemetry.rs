//! Minimal run-time metrics sink.
//!
//! The lock reports through the `metrics` facade. Hosts that already run a
//! recorder get the values there; otherwise [`install`] sets up a recorder
//! that forwards raw name/value pairs to a callback registered with
//! [`register_stats_callback`].

use dashmap::DashMap;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Signature for external collectors.
pub type StatsCallback = fn(name: &str, value: u64);

static CALLBACK: OnceCell<StatsCallback> = OnceCell::new();

/// Register the collector. Only the first registration wins.
pub fn register_stats_callback(cb: StatsCallback) -> bool {
    CALLBACK.set(cb).is_ok()
}

#[inline]
fn forward(key: &Key, value: u64) {
    if let Some(cb) = CALLBACK.get() {
        cb(key.name(), value);
    }
}

/// Forwarding recorder. Uses the callback **if** it was registered.
///
/// The facade registers a handle on every `counter!` call, so handles are
/// cached per key and the hot path only bumps a refcount.
#[derive(Default)]
struct ForwardingRecorder {
    handles: DashMap<Key, Arc<ForwardingHandle>>,
}

#[derive(Clone)]
struct ForwardingHandle {
    key: Key,
}

impl ForwardingRecorder {
    fn handle(&self, key: &Key) -> Arc<ForwardingHandle> {
        if let Some(hit) = self.handles.get(key) {
            return Arc::clone(hit.value());
        }
        let entry = self
            .handles
            .entry(key.clone())
            .or_insert_with(|| Arc::new(ForwardingHandle { key: key.clone() }));
        Arc::clone(entry.value())
    }
}

impl Recorder for ForwardingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }
    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.handle(key))
    }
    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.handle(key))
    }
}

impl metrics::CounterFn for ForwardingHandle {
    fn increment(&self, value: u64) {
        forward(&self.key, value);
    }
    fn absolute(&self, value: u64) {
        forward(&self.key, value);
    }
}

// Gauges are forwarded as their absolute value; deltas are not tracked.
impl metrics::GaugeFn for ForwardingHandle {
    fn set(&self, value: f64) {
        forward(&self.key, value as u64);
    }
    fn increment(&self, _value: f64) {}
    fn decrement(&self, _value: f64) {}
}

impl metrics::HistogramFn for ForwardingHandle {
    fn record(&self, value: f64) {
        forward(&self.key, value as u64);
    }
}

/// Install the forwarding recorder exactly **once** per process.
///
/// Returns `false` if some other recorder was installed first.
pub fn install() -> bool {
    static INSTALLED: OnceCell<bool> = OnceCell::new();
    *INSTALLED.get_or_init(|| metrics::set_global_recorder(ForwardingRecorder::default()).is_ok())
}
