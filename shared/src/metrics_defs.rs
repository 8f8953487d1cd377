//! Common types for metrics definitions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "Counter",
            MetricType::Gauge => "Gauge",
            MetricType::Histogram => "Histogram",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

/// Registers the description of every metric with the installed recorder.
/// Must run after the recorder is set, otherwise the descriptions are lost.
pub fn describe(defs: &[MetricDef]) {
    for def in defs {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Gauge => metrics::describe_gauge!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
        tracing::debug!(name = def.name, r#type = def.metric_type.as_str(), "metric described");
    }
}

/// `counter!(DEF)` or `counter!(DEF, "label" => value, ...)`.
#[macro_export]
macro_rules! counter {
    ($def:expr $(, $($labels:tt)+)?) => {
        metrics::counter!($def.name $(, $($labels)+)?)
    };
}

#[macro_export]
macro_rules! gauge {
    ($def:expr $(, $($labels:tt)+)?) => {
        metrics::gauge!($def.name $(, $($labels)+)?)
    };
}

#[macro_export]
macro_rules! histogram {
    ($def:expr $(, $($labels:tt)+)?) => {
        metrics::histogram!($def.name $(, $($labels)+)?)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, SharedString, Unit};
    use std::sync::Mutex;

    const REQUESTS: MetricDef = MetricDef {
        name: "test.requests",
        metric_type: MetricType::Counter,
        description: "Requests seen",
    };
    const DEPTH: MetricDef = MetricDef {
        name: "test.depth",
        metric_type: MetricType::Gauge,
        description: "Queue depth",
    };

    #[derive(Default)]
    struct Capture {
        described: Mutex<Vec<(&'static str, String, String)>>,
        registered: Mutex<Vec<String>>,
    }

    impl Capture {
        fn describe(&self, kind: &'static str, key: KeyName, description: SharedString) {
            self.described
                .lock()
                .unwrap()
                .push((kind, key.as_str().to_string(), description.to_string()));
        }

        fn register(&self, key: &Key) {
            let labels: Vec<String> = key
                .labels()
                .map(|l| format!("{}={}", l.key(), l.value()))
                .collect();
            self.registered
                .lock()
                .unwrap()
                .push(format!("{}{:?}", key.name(), labels));
        }
    }

    impl metrics::Recorder for Capture {
        fn describe_counter(&self, key: KeyName, _: Option<Unit>, description: SharedString) {
            self.describe("counter", key, description);
        }

        fn describe_gauge(&self, key: KeyName, _: Option<Unit>, description: SharedString) {
            self.describe("gauge", key, description);
        }

        fn describe_histogram(&self, key: KeyName, _: Option<Unit>, description: SharedString) {
            self.describe("histogram", key, description);
        }

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.register(key);
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            self.register(key);
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            self.register(key);
            Histogram::noop()
        }
    }

    #[test]
    fn test_describe_reaches_recorder() {
        let capture = Capture::default();
        metrics::with_local_recorder(&capture, || describe(&[REQUESTS, DEPTH]));

        let described = capture.described.lock().unwrap();
        assert_eq!(
            *described,
            vec![
                ("counter", "test.requests".to_string(), "Requests seen".to_string()),
                ("gauge", "test.depth".to_string(), "Queue depth".to_string()),
            ]
        );
    }

    #[test]
    fn test_macros_use_definition_name() {
        let capture = Capture::default();
        metrics::with_local_recorder(&capture, || {
            crate::counter!(REQUESTS).increment(1);
            crate::counter!(REQUESTS, "outcome" => "ok").increment(1);
            crate::gauge!(DEPTH).set(3.0);
        });

        let registered = capture.registered.lock().unwrap();
        assert_eq!(
            *registered,
            vec![
                r#"test.requests[]"#.to_string(),
                r#"test.requests["outcome=ok"]"#.to_string(),
                r#"test.depth[]"#.to_string(),
            ]
        );
    }
}
