//! Bridge between [`MetricsCollector`] and the `prometheus` crate.
//!
//! The registry calls [`PrometheusCollector`] on every gather; samples are
//! grouped into one family per descriptor and handed to the text encoder.

use crate::{
    error::Result,
    metrics::MetricsCollector,
    model::{MetricDescriptor, MetricKind, MetricSample},
};
use prometheus::{
    core::{Collector, Desc},
    proto, Encoder, TextEncoder,
};
use std::{collections::HashMap, sync::Arc};

pub use prometheus::{Registry, TEXT_FORMAT};

/// Registry-facing wrapper around a shared [`MetricsCollector`]
pub struct PrometheusCollector {
    inner: Arc<MetricsCollector>,
    descs: Vec<Desc>,
}

impl PrometheusCollector {
    pub fn new(inner: Arc<MetricsCollector>) -> Result<Self> {
        let descs = inner
            .describe()
            .into_iter()
            .map(to_desc)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { inner, descs })
    }
}

impl Collector for PrometheusCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        to_families(self.inner.collect())
    }
}

fn to_desc(desc: &MetricDescriptor) -> prometheus::Result<Desc> {
    Desc::new(
        desc.name.to_string(),
        desc.help.to_string(),
        desc.label_names.iter().map(|l| l.to_string()).collect(),
        HashMap::new(),
    )
}

/// Group samples into metric families, one per descriptor, in order of first appearance
pub fn to_families(samples: Vec<MetricSample>) -> Vec<proto::MetricFamily> {
    let mut families: Vec<proto::MetricFamily> = Vec::new();
    let mut index: HashMap<&'static str, usize> = HashMap::new();

    for sample in samples {
        let desc = sample.desc;
        let slot = *index.entry(desc.name).or_insert_with(|| {
            families.push(new_family(desc));
            families.len() - 1
        });
        families[slot].mut_metric().push(to_metric(sample));
    }

    families
}

fn new_family(desc: &MetricDescriptor) -> proto::MetricFamily {
    let mut family = proto::MetricFamily::default();
    family.set_name(desc.name.to_string());
    family.set_help(desc.help.to_string());
    family.set_field_type(match desc.kind {
        MetricKind::Counter => proto::MetricType::COUNTER,
        MetricKind::Gauge => proto::MetricType::GAUGE,
    });
    family
}

fn to_metric(sample: MetricSample) -> proto::Metric {
    let mut labels: Vec<proto::LabelPair> = sample
        .desc
        .label_names
        .iter()
        .zip(sample.label_values)
        .map(|(name, value)| {
            let mut pair = proto::LabelPair::default();
            pair.set_name(name.to_string());
            pair.set_value(value);
            pair
        })
        .collect();
    labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut metric = proto::Metric::default();
    metric.set_label(labels.into());
    match sample.desc.kind {
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(sample.value);
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(sample.value);
            metric.set_gauge(gauge);
        }
    }
    metric
}

/// Build a registry holding only the exporter's collector
pub fn new_registry(collector: Arc<MetricsCollector>) -> Result<Registry> {
    let registry = Registry::new();
    registry.register(Box::new(PrometheusCollector::new(collector)?))?;
    Ok(registry)
}

/// Gather the registry and render it in the text exposition format
pub fn encode_text(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
