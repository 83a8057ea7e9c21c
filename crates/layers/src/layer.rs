use std::fmt;

/// Backend-assigned identity of a map layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

pub trait Layer {
    fn id(&self) -> LayerId;
}

/// Marker clustering parameter.
///
/// Markers are grouped below `disable_clustering_at_zoom` and shown
/// individually at or above it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClusteringConfig {
    pub disable_clustering_at_zoom: u8,
}

impl ClusteringConfig {
    pub const DEFAULT_ZOOM: u8 = 12;

    pub const fn new(disable_clustering_at_zoom: u8) -> Self {
        Self {
            disable_clustering_at_zoom,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ZOOM)
    }
}

/// A clustering layer instance as created by the backend.
///
/// The threshold is fixed for the lifetime of the instance; a different
/// threshold needs a new layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClusterLayer {
    id: LayerId,
    config: ClusteringConfig,
}

impl ClusterLayer {
    pub fn new(id: LayerId, config: ClusteringConfig) -> Self {
        Self { id, config }
    }

    pub fn config(&self) -> ClusteringConfig {
        self.config
    }
}

impl Layer for ClusterLayer {
    fn id(&self) -> LayerId {
        self.id
    }
}
