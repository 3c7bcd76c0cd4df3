//! Prometheus text exposition of collected samples

use std::collections::HashMap;

use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

use te_core::Sample;

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Group samples into gauge metric families
///
/// Families appear in the order their first sample was seen; samples keep
/// their relative order within a family.
pub fn gather(samples: &[Sample]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sample in samples {
        let pos = *index.entry(sample.name()).or_insert_with(|| {
            let mut family = MetricFamily::default();
            family.set_name(sample.desc.fq_name.clone());
            family.set_help(sample.desc.help.clone());
            family.set_field_type(MetricType::GAUGE);
            families.push(family);
            families.len() - 1
        });

        families[pos].mut_metric().push(to_metric(sample));
    }

    families
}

fn to_metric(sample: &Sample) -> Metric {
    let mut pairs: Vec<LabelPair> = sample.desc.const_label_pairs.clone();
    for (name, value) in sample.desc.variable_labels.iter().zip(&sample.label_values) {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        pairs.push(pair);
    }
    pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut gauge = Gauge::default();
    gauge.set_value(sample.value);

    let mut metric = Metric::default();
    for pair in pairs {
        metric.mut_label().push(pair);
    }
    metric.set_gauge(gauge);
    metric
}

/// Encode samples in the Prometheus text format
pub fn encode(samples: &[Sample]) -> Result<String, prometheus::Error> {
    let families = gather(samples);

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
