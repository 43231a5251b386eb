use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reading::Reading;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub ts: DateTime<Utc>,
    pub controller: String,
    pub connected: bool,
    pub alarm: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub nodes: Vec<NodeView>,
    pub quality: PollQuality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub reachable: bool,
    pub readings: BTreeMap<String, Reading>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollQuality {
    pub data_ok: u64,
    pub data_err: u64,
    pub status_ok: u64,
    pub status_err: u64,
    pub stale_dropped: u64,
}
