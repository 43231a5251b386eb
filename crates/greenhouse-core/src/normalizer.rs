use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::{Catalog, NodeKeyPolicy};
use crate::history::{Sample, SeriesKey};
use crate::reading::{parse_sample_value, Reading};

pub type ReadingSet = BTreeMap<String, Reading>;

/// Result of one normalization pass. Samples are listed in append order and
/// share the pass timestamp.
#[derive(Debug, Clone)]
pub struct NormalizedSnapshot {
    pub ts: DateTime<Utc>,
    pub readings: BTreeMap<String, ReadingSet>,
    pub samples: Vec<(SeriesKey, Sample)>,
    pub node_seen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub nodes: Vec<String>,
    pub primary_node: Option<String>,
    pub primary_node_present: bool,
    pub filter_data_present: bool,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    catalog: Arc<Catalog>,
    policy: NodeKeyPolicy,
}

impl Normalizer {
    pub fn new(catalog: Arc<Catalog>, policy: NodeKeyPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn normalize(&self, raw: &Value, now: DateTime<Utc>) -> NormalizedSnapshot {
        let mut out = NormalizedSnapshot {
            ts: now,
            readings: BTreeMap::new(),
            samples: Vec::new(),
            node_seen: false,
        };

        let Some(top) = raw.as_object() else {
            debug!("snapshot payload is not an object, ignoring");
            return out;
        };

        for (node, fields) in self.node_entries(top) {
            out.node_seen = true;
            let mut readings = self.build_readings(fields);

            match fields.get(&self.catalog.filter_field) {
                Some(Value::Object(filters)) => {
                    self.collect_filtered(node, filters, &mut readings, &mut out.samples, now)
                }
                _ => self.collect_unfiltered(node, &readings, &mut out.samples, now),
            }

            out.readings.insert(node.to_string(), readings);
        }

        out
    }

    pub fn probe(&self, raw: &Value) -> ProbeReport {
        let primary_node = self.catalog.nodes.keys().next().cloned();
        let mut report = ProbeReport {
            nodes: Vec::new(),
            primary_node: primary_node.clone(),
            primary_node_present: false,
            filter_data_present: false,
        };

        let Some(top) = raw.as_object() else {
            return report;
        };

        for (node, fields) in self.node_entries(top) {
            report.nodes.push(node.to_string());
            if primary_node.as_deref() == Some(node) {
                report.primary_node_present = true;
                report.filter_data_present = fields.contains_key(&self.catalog.filter_field);
            }
        }

        report
    }

    fn node_entries<'a>(
        &'a self,
        top: &'a Map<String, Value>,
    ) -> impl Iterator<Item = (&'a str, &'a Map<String, Value>)> + 'a {
        top.iter().filter_map(move |(key, value)| {
            if !self.catalog.accepts_node_key(key, &self.policy) {
                return None;
            }
            match value.as_object() {
                Some(fields) => Some((key.as_str(), fields)),
                None => {
                    debug!(node = %key, "node payload is not an object, skipping");
                    None
                }
            }
        })
    }

    /// Canonical spellings are taken first; an alias only fills a key that
    /// the canonical field left unset.
    fn build_readings(&self, fields: &Map<String, Value>) -> ReadingSet {
        let mut readings = ReadingSet::new();

        for (key, raw) in fields {
            if key == &self.catalog.filter_field || self.catalog.is_alias(key) {
                continue;
            }
            if let Some(reading) = Reading::coerce(raw) {
                readings.insert(key.clone(), reading);
            }
        }

        for (key, raw) in fields.iter().filter(|(key, _)| self.catalog.is_alias(key)) {
            let canonical = self.catalog.canonical_signal(key);
            if readings.contains_key(canonical) {
                continue;
            }
            if let Some(reading) = Reading::coerce(raw) {
                readings.insert(canonical.to_string(), reading);
            }
        }

        readings
    }

    fn collect_filtered(
        &self,
        node: &str,
        filters: &Map<String, Value>,
        readings: &mut ReadingSet,
        samples: &mut Vec<(SeriesKey, Sample)>,
        now: DateTime<Utc>,
    ) {
        let primary = self.catalog.primary_filter();
        let canonical_first = filters
            .iter()
            .filter(|(key, _)| !self.catalog.is_alias(key))
            .chain(filters.iter().filter(|(key, _)| self.catalog.is_alias(key)));

        let mut seen_signals: Vec<&str> = Vec::new();
        for (signal_key, variants) in canonical_first {
            let signal = self.catalog.canonical_signal(signal_key);
            if seen_signals.contains(&signal) {
                continue;
            }
            let Some(variants) = variants.as_object() else {
                continue;
            };
            seen_signals.push(signal);

            for (filter, raw) in variants {
                if !self.catalog.filters.contains_key(filter) {
                    continue;
                }
                let Some(value) = parse_sample_value(raw) else {
                    debug!(node, signal, filter = %filter, "unparseable filter value");
                    continue;
                };

                if self.catalog.is_tracked(node, signal, filter) {
                    samples.push((SeriesKey::new(node, signal, filter), Sample { ts: now, value }));
                }

                if primary == Some(filter.as_str()) && self.catalog.overrides_reading(signal) {
                    readings.insert(signal.to_string(), Reading::Number(value));
                }
            }
        }
    }

    /// Without filter telemetry every variant gets the raw value, so all
    /// charts keep a continuous history.
    fn collect_unfiltered(
        &self,
        node: &str,
        readings: &ReadingSet,
        samples: &mut Vec<(SeriesKey, Sample)>,
        now: DateTime<Utc>,
    ) {
        for (signal, reading) in readings {
            let Some(value) = reading.as_number() else {
                continue;
            };
            for filter in self.catalog.filters.keys() {
                if self.catalog.is_tracked(node, signal, filter) {
                    samples.push((SeriesKey::new(node, signal, filter), Sample { ts: now, value }));
                }
            }
        }
    }
}
