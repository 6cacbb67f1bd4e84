pub mod sink;

pub use sink::{MetricsEvent, MetricsSink, emit, with_sink};
