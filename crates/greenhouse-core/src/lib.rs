pub mod catalog;
pub mod config;
pub mod history;
pub mod monitor;
pub mod normalizer;
pub mod reading;
pub mod snapshot;
pub mod state;
pub mod status;
pub mod transport;


pub use catalog::{Catalog, FilterVariantInfo, NodeInfo, NodeKeyPolicy, SignalInfo};
pub use config::{ConfigError, MonitorConfig};
pub use history::{RollingWindowStore, Sample, SeriesKey};
pub use monitor::Poller;
pub use normalizer::{NormalizedSnapshot, Normalizer, ProbeReport, ReadingSet};
pub use reading::Reading;
pub use snapshot::{DashboardSnapshot, NodeView, PollQuality};
pub use state::DashboardState;
pub use status::{LinkState, RawStatus};
pub use transport::{ControllerTransport, HttpTransport, TransportError};
