use serde::Serialize;

/// Kind of a metric, as understood by the exposition format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricKind {
    /// Cumulative value read from the kernel; rates are the consumer's job
    Counter,
    /// Point-in-time value
    Gauge,
}

/// Static metadata for one metric.
///
/// Descriptors are `static` items owned by the source that emits them, so every
/// sample refers to the same instance for the lifetime of the process.
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub label_names: &'static [&'static str],
    pub kind: MetricKind,
}

impl MetricDescriptor {
    pub const fn counter(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            label_names,
            kind: MetricKind::Counter,
        }
    }

    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            label_names,
            kind: MetricKind::Gauge,
        }
    }
}

/// One value for one descriptor, produced fresh on every collection
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    pub desc: &'static MetricDescriptor,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(desc: &'static MetricDescriptor, label_values: Vec<String>, value: f64) -> Self {
        debug_assert_eq!(
            desc.label_names.len(),
            label_values.len(),
            "label arity mismatch for {}",
            desc.name
        );
        Self {
            desc,
            label_values,
            value,
        }
    }

    /// Sample for a descriptor without labels
    pub fn unlabeled(desc: &'static MetricDescriptor, value: f64) -> Self {
        Self::new(desc, Vec::new(), value)
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names
            .iter()
            .position(|n| *n == name)
            .and_then(|idx| self.label_values.get(idx))
            .map(String::as_str)
    }
}
