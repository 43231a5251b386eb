use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::catalog::Catalog;
use crate::history::{RollingWindowStore, Sample, SeriesKey};
use crate::normalizer::{NormalizedSnapshot, ReadingSet};
use crate::snapshot::{DashboardSnapshot, NodeView, PollQuality};
use crate::status::{LinkState, RawStatus};

/// Everything the views read. Mutated only by completed poll rounds.
#[derive(Debug, Clone)]
pub struct DashboardState {
    catalog: Arc<Catalog>,
    store: RollingWindowStore,
    readings: BTreeMap<String, ReadingSet>,
    link: LinkState,
    quality: PollQuality,
}

impl DashboardState {
    pub fn new(catalog: Arc<Catalog>, history: usize) -> Self {
        Self {
            store: RollingWindowStore::new(catalog.clone(), history),
            readings: BTreeMap::new(),
            link: LinkState::new(catalog.nodes.len()),
            quality: PollQuality::default(),
            catalog,
        }
    }

    /// Nodes missing from the snapshot keep their previous readings.
    pub fn apply_snapshot(&mut self, snapshot: NormalizedSnapshot) {
        for (node, readings) in snapshot.readings {
            self.readings.insert(node, readings);
        }
        for (key, sample) in &snapshot.samples {
            self.store.append(key, *sample);
        }
        self.link.mark_data_ok(snapshot.node_seen, snapshot.ts);
        self.quality.data_ok += 1;
    }

    pub fn apply_data_failure(&mut self) {
        self.link.mark_disconnected();
        self.quality.data_err += 1;
    }

    pub fn apply_status(&mut self, status: &RawStatus) {
        self.link.apply_status(status);
        self.quality.status_ok += 1;
    }

    pub fn record_status_failure(&mut self) {
        self.quality.status_err += 1;
    }

    pub fn record_stale_drop(&mut self) {
        self.quality.stale_dropped += 1;
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn store(&self) -> &RollingWindowStore {
        &self.store
    }

    pub fn readings(&self, node: &str) -> Option<&ReadingSet> {
        self.readings.get(node)
    }

    pub fn series(&self, node: &str, signal: &str, filter: &str) -> Vec<Sample> {
        self.store.series(&SeriesKey::new(node, signal, filter))
    }

    fn reachable(&self, node: &str) -> bool {
        self.catalog
            .node_slot(node)
            .is_some_and(|slot| self.link.node_reachable(slot))
    }

    pub fn snapshot(&self, controller: &str) -> DashboardSnapshot {
        let mut nodes: Vec<NodeView> = self
            .catalog
            .nodes
            .iter()
            .map(|(id, info)| NodeView {
                id: id.clone(),
                name: info.name.clone(),
                category: info.category.clone(),
                reachable: self.reachable(id),
                readings: self.readings.get(id).cloned().unwrap_or_default(),
            })
            .collect();

        // Prefix-matched nodes outside the catalog still get a panel.
        for (id, readings) in &self.readings {
            if !self.catalog.nodes.contains_key(id) {
                nodes.push(NodeView {
                    id: id.clone(),
                    name: id.clone(),
                    category: None,
                    reachable: self.reachable(id),
                    readings: readings.clone(),
                });
            }
        }

        DashboardSnapshot {
            ts: Utc::now(),
            controller: controller.to_string(),
            connected: self.link.connected,
            alarm: self.link.alarm,
            last_update: self.link.last_update,
            nodes,
            quality: self.quality.clone(),
        }
    }
}
