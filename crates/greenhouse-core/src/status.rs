use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of the controller's status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatus {
    #[serde(default, alias = "esclavos")]
    pub nodes: Vec<bool>,
    #[serde(default, alias = "emergencia")]
    pub alarm: bool,
}

/// Reachability and alarm flags shown by the views.
///
/// `connected` follows the data endpoint only; `alarm` and `nodes` follow the
/// status endpoint only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    pub connected: bool,
    pub alarm: bool,
    pub nodes: Vec<bool>,
    pub last_update: Option<DateTime<Utc>>,
}

impl LinkState {
    pub fn new(node_slots: usize) -> Self {
        Self {
            connected: false,
            alarm: false,
            nodes: vec![false; node_slots],
            last_update: None,
        }
    }

    pub fn apply_status(&mut self, status: &RawStatus) {
        let slots = self.nodes.len();
        let mut nodes = status.nodes.clone();
        nodes.resize(slots, false);
        self.nodes = nodes;
        self.alarm = status.alarm;
    }

    pub fn mark_data_ok(&mut self, node_seen: bool, at: DateTime<Utc>) {
        self.connected = node_seen;
        self.last_update = Some(at);
    }

    pub fn mark_disconnected(&mut self) {
        self.connected = false;
    }

    pub fn node_reachable(&self, slot: usize) -> bool {
        self.nodes.get(slot).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_controller_field_names() {
        let status: RawStatus =
            serde_json::from_str(r#"{"esclavos":[true,false,true,false],"emergencia":true}"#)
                .expect("status");

        assert_eq!(status.nodes, vec![true, false, true, false]);
        assert!(status.alarm);
    }

    #[test]
    fn apply_status_keeps_fixed_arity_and_leaves_connected() {
        let mut link = LinkState::new(4);
        link.connected = true;

        link.apply_status(&RawStatus {
            nodes: vec![true, true],
            alarm: true,
        });
        assert_eq!(link.nodes, vec![true, true, false, false]);

        link.apply_status(&RawStatus {
            nodes: vec![false, true, true, true, true, true],
            alarm: false,
        });
        assert_eq!(link.nodes, vec![false, true, true, true]);
        assert!(!link.alarm);
        assert!(link.connected);
    }

    #[test]
    fn missing_status_fields_default() {
        let status: RawStatus = serde_json::from_str("{}").expect("status");

        assert_eq!(status, RawStatus::default());
    }
}
