use shared::metrics_defs::{MetricDef, MetricType};

pub const FANOUT_REQUESTS: MetricDef = MetricDef {
    name: "fanout.requests",
    metric_type: MetricType::Counter,
    description: "Number of inbound requests forwarded to a mapped path",
};

pub const FANOUT_UNMAPPED: MetricDef = MetricDef {
    name: "fanout.unmapped",
    metric_type: MetricType::Counter,
    description: "Number of inbound requests to a path without a mapping",
};

pub const FANOUT_SINKS: MetricDef = MetricDef {
    name: "fanout.sinks",
    metric_type: MetricType::Histogram,
    description: "Number of outbound connections opened per forwarded request",
};

pub const SINK_ERRORS: MetricDef = MetricDef {
    name: "sink.errors",
    metric_type: MetricType::Counter,
    description: "Number of failed outbound sink connections, including write timeouts",
};

pub const SINK_DURATION: MetricDef = MetricDef {
    name: "sink.duration",
    metric_type: MetricType::Histogram,
    description: "Time from opening a sink connection until its response or error, in seconds",
};

pub const REGISTRATIONS: MetricDef = MetricDef {
    name: "registration.requests",
    metric_type: MetricType::Counter,
    description: "Number of registration requests. Tagged with outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    FANOUT_REQUESTS,
    FANOUT_UNMAPPED,
    FANOUT_SINKS,
    SINK_ERRORS,
    SINK_DURATION,
    REGISTRATIONS,
];
