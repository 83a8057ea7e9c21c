use dataset::search::DEFAULT_SEARCH_LIMIT;
use foundation::{Timestamp, Viewport, epoch};
use layers::ClusteringConfig;
use serde::Deserialize;

pub const DEFAULT_NODES_URL: &str = "https://map.meshcore.dev/api/v1/nodes";

/// Zoom used when flying to a single node.
pub const DEFAULT_FOCUS_ZOOM: f64 = 19.0;

/// Settings shared by every host. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub nodes_url: String,
    pub default_viewport: Viewport,
    pub cluster_zoom: u8,
    pub default_since: Timestamp,
    pub focus_zoom: f64,
    pub search_limit: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            nodes_url: DEFAULT_NODES_URL.to_string(),
            default_viewport: Viewport::default(),
            cluster_zoom: ClusteringConfig::DEFAULT_ZOOM,
            default_since: epoch(),
            focus_zoom: DEFAULT_FOCUS_ZOOM,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl MapConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_nodes_url(mut self, url: impl Into<String>) -> Self {
        self.nodes_url = url.into();
        self
    }
}
