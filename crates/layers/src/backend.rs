use std::collections::{BTreeMap, BTreeSet};

use foundation::{LatLon, MarkerHandle, Viewport};
use tracing::warn;

use crate::detail::DetailRow;
use crate::layer::{ClusteringConfig, LayerId};
use crate::symbology::MarkerStyle;

/// Everything the backend needs to draw one marker. Never changes after the
/// marker is created.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub public_key: String,
    pub position: LatLon,
    pub style: MarkerStyle,
    /// Popup rows.
    pub detail: Vec<DetailRow>,
}

/// The map renderer as seen by the synchronization layer.
///
/// Implementations draw; they never decide which markers exist. Cluster
/// layers cannot change their threshold after creation.
pub trait MapBackend {
    fn create_cluster_layer(&mut self, config: ClusteringConfig) -> LayerId;
    /// Called only on an empty layer.
    fn remove_cluster_layer(&mut self, layer: LayerId);

    fn create_marker(&mut self, marker: MarkerHandle, spec: &MarkerSpec);
    /// Called only for markers not attached to any layer.
    fn release_marker(&mut self, marker: MarkerHandle);

    fn attach_markers(&mut self, layer: LayerId, markers: &[MarkerHandle]);
    fn detach_markers(&mut self, layer: LayerId, markers: &[MarkerHandle]);

    fn set_view(&mut self, viewport: Viewport);
    /// Centers on `marker` at `zoom` and opens its detail popup.
    fn focus_marker(&mut self, marker: MarkerHandle, position: LatLon, zoom: f64);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLayer {
    pub config: ClusteringConfig,
    pub members: BTreeSet<MarkerHandle>,
}

/// Headless backend that keeps the rendered state in memory.
///
/// Used by the CLI and by tests to observe exactly what a real renderer
/// would show.
#[derive(Debug, Default)]
pub struct MemoryMapBackend {
    layers: BTreeMap<LayerId, MemoryLayer>,
    markers: BTreeMap<MarkerHandle, MarkerSpec>,
    /// Removed layers with the member count they still had at removal.
    removed_layers: Vec<(LayerId, usize)>,
    next_layer: u64,
    view: Option<Viewport>,
    focused: Option<(MarkerHandle, f64)>,
    released: usize,
}

impl MemoryMapBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, id: LayerId) -> Option<&MemoryLayer> {
        self.layers.get(&id)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.keys().copied().collect()
    }

    /// Union of all live layers' members.
    pub fn visible_markers(&self) -> BTreeSet<MarkerHandle> {
        self.layers
            .values()
            .flat_map(|l| l.members.iter().copied())
            .collect()
    }

    /// Public keys of the visible markers, sorted.
    pub fn visible_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .visible_markers()
            .into_iter()
            .filter_map(|h| self.markers.get(&h).map(|s| s.public_key.clone()))
            .collect();
        keys.sort();
        keys
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&MarkerSpec> {
        self.markers.get(&handle)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn removed_layers(&self) -> &[(LayerId, usize)] {
        &self.removed_layers
    }

    pub fn view(&self) -> Option<Viewport> {
        self.view
    }

    pub fn focused(&self) -> Option<(MarkerHandle, f64)> {
        self.focused
    }
}

impl MapBackend for MemoryMapBackend {
    fn create_cluster_layer(&mut self, config: ClusteringConfig) -> LayerId {
        self.next_layer += 1;
        let id = LayerId(self.next_layer);
        self.layers.insert(
            id,
            MemoryLayer {
                config,
                members: BTreeSet::new(),
            },
        );
        id
    }

    fn remove_cluster_layer(&mut self, layer: LayerId) {
        match self.layers.remove(&layer) {
            Some(l) => self.removed_layers.push((layer, l.members.len())),
            None => warn!(%layer, "remove of unknown layer"),
        }
    }

    fn create_marker(&mut self, marker: MarkerHandle, spec: &MarkerSpec) {
        self.markers.insert(marker, spec.clone());
    }

    fn release_marker(&mut self, marker: MarkerHandle) {
        if self.markers.remove(&marker).is_some() {
            self.released += 1;
        }
    }

    fn attach_markers(&mut self, layer: LayerId, markers: &[MarkerHandle]) {
        let Some(l) = self.layers.get_mut(&layer) else {
            warn!(%layer, "attach to unknown layer");
            return;
        };
        for m in markers {
            if self.markers.contains_key(m) {
                l.members.insert(*m);
            } else {
                warn!(marker = %m, "attach of unknown marker");
            }
        }
    }

    fn detach_markers(&mut self, layer: LayerId, markers: &[MarkerHandle]) {
        if let Some(l) = self.layers.get_mut(&layer) {
            for m in markers {
                l.members.remove(m);
            }
        }
    }

    fn set_view(&mut self, viewport: Viewport) {
        self.view = Some(viewport);
    }

    fn focus_marker(&mut self, marker: MarkerHandle, position: LatLon, zoom: f64) {
        self.focused = Some((marker, zoom));
        self.view = Some(Viewport {
            center: position,
            zoom,
        });
    }
}
