//! Metrics definitions for mapping synchronization.

use shared::metrics_defs::{MetricDef, MetricType};

pub const SYNC_REFRESHES: MetricDef = MetricDef {
    name: "sync.refreshes",
    metric_type: MetricType::Counter,
    description: "Number of full snapshot refreshes applied to the mapping store",
};

pub const SYNC_DECODE_ERRORS: MetricDef = MetricDef {
    name: "sync.decode_errors",
    metric_type: MetricType::Counter,
    description: "Number of stored mapping entries skipped because they did not decode",
};

pub const SYNC_REFRESH_DURATION: MetricDef = MetricDef {
    name: "sync.refresh.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch and apply a snapshot in seconds",
};

pub const SYNC_PATHS: MetricDef = MetricDef {
    name: "sync.paths",
    metric_type: MetricType::Gauge,
    description: "Number of paths in the most recently applied snapshot",
};

pub const ALL_METRICS: &[MetricDef] = &[
    SYNC_REFRESHES,
    SYNC_DECODE_ERRORS,
    SYNC_REFRESH_DURATION,
    SYNC_PATHS,
];
