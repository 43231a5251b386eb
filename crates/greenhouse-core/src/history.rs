use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub ts: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub node: String,
    pub signal: String,
    pub filter: String,
}

impl SeriesKey {
    pub fn new(node: &str, signal: &str, filter: &str) -> Self {
        Self {
            node: node.to_string(),
            signal: signal.to_string(),
            filter: filter.to_string(),
        }
    }
}

/// Bounded history per (node, signal, filter variant). Once a series holds
/// `capacity` samples, each append evicts the oldest one.
#[derive(Debug, Clone)]
pub struct RollingWindowStore {
    catalog: Arc<Catalog>,
    capacity: usize,
    series: BTreeMap<SeriesKey, VecDeque<Sample>>,
}

impl RollingWindowStore {
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        Self {
            catalog,
            capacity: capacity.max(1),
            series: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns false when the key is not in the catalog and the sample was dropped.
    pub fn append(&mut self, key: &SeriesKey, sample: Sample) -> bool {
        if !self.catalog.is_tracked(&key.node, &key.signal, &key.filter) {
            return false;
        }

        let capacity = self.capacity;
        let points = self
            .series
            .entry(key.clone())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if points.len() >= capacity {
            points.pop_front();
        }
        points.push_back(sample);
        true
    }

    pub fn series(&self, key: &SeriesKey) -> Vec<Sample> {
        self.series
            .get(key)
            .map(|points| points.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, key: &SeriesKey) -> usize {
        self.series.get(key).map(VecDeque::len).unwrap_or(0)
    }

    pub fn latest(&self, key: &SeriesKey) -> Option<Sample> {
        self.series.get(key).and_then(|points| points.back().copied())
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }
}
