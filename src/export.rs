//! A structured snapshot of a registry for pull based exposition. The
//! exporter sweeps meters exactly like the publisher does, so counters and
//! timers report the delta since the previous sweep of either kind.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{codec::STATISTIC_TAG, metrics::Kind, Registry};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    pub v: f64,
    /// Milliseconds since the unix epoch.
    pub t: u64,
}

/// All values reported under one tag set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedValues {
    pub tags: Vec<Tag>,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub kind: Kind,
    pub values: Vec<TaggedValues>,
}

/// Metric name to everything reported under that name. If meters of
/// different kinds share a name the kind of the first one visited is shown.
pub type Snapshot = BTreeMap<String, MetricSnapshot>;

pub(crate) fn snapshot(registry: &Registry) -> Snapshot {
    let common_tags = &registry.config().common_tags;
    let mut snapshot = Snapshot::new();
    for meter in registry.meters() {
        let measurements = meter.measure();
        if measurements.is_empty() {
            continue;
        }
        let t = registry.clock().millis();
        let entry = snapshot
            .entry(meter.id().name().to_string())
            .or_insert_with(|| MetricSnapshot {
                kind: meter.kind(),
                values: Vec::new(),
            });
        for m in measurements {
            let mut tags: BTreeMap<&str, &str> = common_tags
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            tags.extend(m.id.tags().iter().map(|(k, v)| (k.as_str(), v.as_str())));
            tags.insert(STATISTIC_TAG, m.statistic.label());
            entry.values.push(TaggedValues {
                tags: tags
                    .into_iter()
                    .map(|(key, value)| Tag {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
                values: vec![Value { v: m.value, t }],
            });
        }
    }
    snapshot
}
