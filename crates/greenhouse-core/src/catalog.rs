use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInfo {
    pub label: String,
    #[serde(default)]
    pub unit: String,
    pub chart_title: String,
    pub color: String,
    /// The primary filter variant replaces the raw reading for this signal.
    #[serde(default)]
    pub filtered_overrides_reading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub category: Option<String>,
    /// `None` means the node may report any known signal.
    #[serde(default)]
    pub signals: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterVariantInfo {
    pub label: String,
    pub color: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKeyPolicy {
    Strict,
    Prefix(String),
}

impl Default for NodeKeyPolicy {
    fn default() -> Self {
        Self::Prefix("node".to_string())
    }
}

/// Static description of a deployment: which nodes exist, what they report,
/// and which filter variants the controller computes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub signals: BTreeMap<String, SignalInfo>,
    pub nodes: BTreeMap<String, NodeInfo>,
    pub filters: BTreeMap<String, FilterVariantInfo>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default = "default_filter_field")]
    pub filter_field: String,
}

fn default_filter_field() -> String {
    "filtros".to_string()
}

fn signal(label: &str, unit: &str, chart_title: &str, color: &str, overrides: bool) -> SignalInfo {
    SignalInfo {
        label: label.to_string(),
        unit: unit.to_string(),
        chart_title: chart_title.to_string(),
        color: color.to_string(),
        filtered_overrides_reading: overrides,
    }
}

fn node(name: &str, color: &str, category: Option<&str>, signals: Option<&[&str]>) -> NodeInfo {
    NodeInfo {
        name: name.to_string(),
        color: color.to_string(),
        category: category.map(str::to_string),
        signals: signals.map(|list| list.iter().map(|s| s.to_string()).collect()),
    }
}

fn filter(label: &str, color: &str, primary: bool) -> FilterVariantInfo {
    FilterVariantInfo {
        label: label.to_string(),
        color: color.to_string(),
        primary,
    }
}

impl Catalog {
    /// The reference greenhouse deployment: one ambient node, one humidity
    /// control node and two generic nodes.
    pub fn greenhouse() -> Self {
        let signals = BTreeMap::from([
            ("temperature".to_string(), signal("Temperature", "°C", "Temperature (°C)", "red", true)),
            ("humidity".to_string(), signal("Humidity", "%", "Humidity (%)", "blue", true)),
            ("pressure".to_string(), signal("Pressure", "hPa", "Pressure (hPa)", "green", false)),
            ("light".to_string(), signal("Light", "", "Light level", "orange", false)),
            ("rain_value".to_string(), signal("Rain", "", "Rain sensor", "cyan", false)),
            ("humidity_inv1".to_string(), signal("Humidity G1", "%", "Greenhouse 1 humidity (%)", "purple", false)),
            ("humidity_inv2".to_string(), signal("Humidity G2", "%", "Greenhouse 2 humidity (%)", "teal", false)),
            ("water_level".to_string(), signal("Water level", "cm", "Water level (cm)", "darkblue", false)),
        ]);

        let nodes = BTreeMap::from([
            (
                "node1".to_string(),
                node(
                    "Greenhouse",
                    "#4CAF50",
                    Some("ambient"),
                    Some(&["temperature", "humidity", "pressure", "light", "rain_value"]),
                ),
            ),
            (
                "node2".to_string(),
                node(
                    "Humidity control",
                    "#2196F3",
                    Some("humidity-control"),
                    Some(&["humidity_inv1", "humidity_inv2", "water_level"]),
                ),
            ),
            ("node3".to_string(), node("Node 3", "#FFC107", None, None)),
            ("node4".to_string(), node("Node 4", "#9C27B0", None, None)),
        ]);

        let filters = BTreeMap::from([
            ("raw".to_string(), filter("Raw", "blue", false)),
            ("kalman".to_string(), filter("Kalman", "red", true)),
            ("median".to_string(), filter("Median", "green", false)),
            ("exp".to_string(), filter("Exponential", "purple", false)),
        ]);

        let aliases = [
            ("temperatura", "temperature"),
            ("humedad", "humidity"),
            ("presion", "pressure"),
            ("luz", "light"),
            ("nivel_agua", "water_level"),
            ("humedad_inv1", "humidity_inv1"),
            ("humedad_inv2", "humidity_inv2"),
        ]
        .into_iter()
        .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
        .collect();

        Self {
            signals,
            nodes,
            filters,
            aliases,
            filter_field: default_filter_field(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|err| ConfigError::InvalidCatalog(format!("{}: {err}", path.display())))
    }

    pub fn canonical_signal<'a>(&'a self, key: &'a str) -> &'a str {
        self.aliases.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn is_alias(&self, key: &str) -> bool {
        self.aliases.contains_key(key)
    }

    pub fn accepts_node_key(&self, key: &str, policy: &NodeKeyPolicy) -> bool {
        if self.nodes.contains_key(key) {
            return true;
        }
        match policy {
            NodeKeyPolicy::Strict => false,
            NodeKeyPolicy::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }

    pub fn node_reports(&self, node: &str, signal: &str) -> bool {
        if !self.signals.contains_key(signal) {
            return false;
        }
        match self.nodes.get(node) {
            Some(NodeInfo { signals: Some(list), .. }) => list.iter().any(|s| s == signal),
            Some(_) => true,
            None => false,
        }
    }

    pub fn is_tracked(&self, node: &str, signal: &str, filter: &str) -> bool {
        self.filters.contains_key(filter) && self.node_reports(node, signal)
    }

    pub fn primary_filter(&self) -> Option<&str> {
        self.filters
            .iter()
            .find(|(_, info)| info.primary)
            .map(|(key, _)| key.as_str())
    }

    pub fn overrides_reading(&self, signal: &str) -> bool {
        self.signals
            .get(signal)
            .map(|info| info.filtered_overrides_reading)
            .unwrap_or(false)
    }

    pub fn node_slot(&self, node: &str) -> Option<usize> {
        self.nodes.keys().position(|key| key == node)
    }

    /// Signals a node is expected to chart, in catalog order.
    pub fn signals_for(&self, node: &str) -> Vec<&str> {
        self.signals
            .keys()
            .map(String::as_str)
            .filter(|signal| self.node_reports(node, signal))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_signals() {
        let catalog = Catalog::greenhouse();

        assert_eq!(catalog.canonical_signal("temperatura"), "temperature");
        assert_eq!(catalog.canonical_signal("humedad"), "humidity");
        assert_eq!(catalog.canonical_signal("window_open"), "window_open");
    }

    #[test]
    fn node_signal_lists_restrict_tracking() {
        let catalog = Catalog::greenhouse();

        assert!(catalog.is_tracked("node1", "temperature", "kalman"));
        assert!(!catalog.is_tracked("node1", "water_level", "raw"));
        assert!(catalog.is_tracked("node3", "water_level", "raw"));
        assert!(!catalog.is_tracked("node1", "temperature", "savgol"));
        assert!(!catalog.is_tracked("node9", "temperature", "raw"));
    }

    #[test]
    fn node_key_policies() {
        let catalog = Catalog::greenhouse();
        let prefix = NodeKeyPolicy::default();

        assert!(catalog.accepts_node_key("node2", &NodeKeyPolicy::Strict));
        assert!(!catalog.accepts_node_key("node7", &NodeKeyPolicy::Strict));
        assert!(catalog.accepts_node_key("node7", &prefix));
        assert!(!catalog.accepts_node_key("uptime", &prefix));
    }

    #[test]
    fn primary_filter_and_slots() {
        let catalog = Catalog::greenhouse();

        assert_eq!(catalog.primary_filter(), Some("kalman"));
        assert_eq!(catalog.node_slot("node1"), Some(0));
        assert_eq!(catalog.node_slot("node4"), Some(3));
        assert_eq!(catalog.node_slot("node5"), None);
    }

    #[test]
    fn catalog_parses_from_json_with_defaults() {
        let text = r##"{
            "signals": { "co2": { "label": "CO2", "chart_title": "CO2 (ppm)", "color": "gray" } },
            "nodes": { "nodeA": { "name": "A", "color": "#000" } },
            "filters": { "raw": { "label": "Raw", "color": "blue" } }
        }"##;

        let catalog: Catalog = serde_json::from_str(text).expect("catalog");

        assert_eq!(catalog.filter_field, "filtros");
        assert!(catalog.is_tracked("nodeA", "co2", "raw"));
        assert_eq!(catalog.primary_filter(), None);
    }
}
