use std::collections::BTreeSet;

use dataset::{FilteredView, NodeCollection, NodeStore};
use foundation::MarkerHandle;
use tracing::{debug, info};

use crate::backend::MapBackend;
use crate::layer::{ClusterLayer, ClusteringConfig, Layer, LayerId};
use crate::markers::{BindReport, MarkerRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub layer: LayerId,
    /// A new clustering layer replaced the previous one this round.
    pub layer_replaced: bool,
    pub attached: usize,
    pub detached: usize,
    pub released: usize,
    pub visible: usize,
}

/// Keeps the backend's marker layer equal to a filtered view.
///
/// Holds the only clustering layer; after every [`MapSyncController::reconcile`]
/// its members are exactly the markers of the view's nodes.
#[derive(Debug, Default)]
pub struct MapSyncController {
    registry: MarkerRegistry,
    layer: Option<ClusterLayer>,
    attached: BTreeSet<MarkerHandle>,
}

impl MapSyncController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives every node of a freshly built collection its marker. Must run
    /// before the collection is handed to the store.
    pub fn bind_markers(
        &mut self,
        collection: &mut NodeCollection,
        backend: &mut dyn MapBackend,
    ) -> BindReport {
        self.registry.bind(collection, backend)
    }

    pub fn reconcile(
        &mut self,
        store: &NodeStore,
        view: &FilteredView,
        config: ClusteringConfig,
        backend: &mut dyn MapBackend,
    ) -> ReconcileReport {
        let mut desired: Vec<MarkerHandle> = Vec::with_capacity(view.len());
        let mut desired_set = BTreeSet::new();
        for handle in view.nodes(store).filter_map(|n| n.marker()) {
            if desired_set.insert(handle) {
                desired.push(handle);
            }
        }

        let mut detached = 0;
        let mut layer_replaced = false;
        let layer = match self.layer {
            Some(layer) if layer.config() == config => layer,
            previous => {
                if let Some(old) = previous {
                    let members: Vec<MarkerHandle> = self.attached.iter().copied().collect();
                    backend.detach_markers(old.id(), &members);
                    backend.remove_cluster_layer(old.id());
                    detached = members.len();
                    self.attached.clear();
                    layer_replaced = true;
                    info!(
                        old = %old.id(),
                        threshold = config.disable_clustering_at_zoom,
                        "replacing clustering layer"
                    );
                }
                let layer = ClusterLayer::new(backend.create_cluster_layer(config), config);
                self.layer = Some(layer);
                layer
            }
        };

        let stale: Vec<MarkerHandle> = self
            .attached
            .iter()
            .copied()
            .filter(|h| !desired_set.contains(h))
            .collect();
        if !stale.is_empty() {
            backend.detach_markers(layer.id(), &stale);
            detached += stale.len();
        }

        let fresh: Vec<MarkerHandle> = desired
            .iter()
            .copied()
            .filter(|h| !self.attached.contains(h))
            .collect();
        if !fresh.is_empty() {
            backend.attach_markers(layer.id(), &fresh);
        }

        self.attached = desired_set;
        let released = self.registry.release_orphans(&self.attached, backend);

        let report = ReconcileReport {
            layer: layer.id(),
            layer_replaced,
            attached: fresh.len(),
            detached,
            released,
            visible: self.attached.len(),
        };
        debug!(?report, "reconciled");
        report
    }

    pub fn active_layer(&self) -> Option<ClusterLayer> {
        self.layer
    }

    pub fn attached(&self) -> &BTreeSet<MarkerHandle> {
        &self.attached
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryMapBackend;
    use dataset::{Category, CategorySet, FilterCriteria, FilterEngine, records_from_values};
    use foundation::epoch;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn node(key: &str, category: u8) -> Value {
        json!({
            "adv_name": key,
            "type": category,
            "adv_lat": 48.0,
            "adv_lon": 17.0,
            "inserted_date": "2024-01-01",
            "public_key": key,
        })
    }

    struct Harness {
        store: NodeStore,
        engine: FilterEngine,
        sync: MapSyncController,
        backend: MemoryMapBackend,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: NodeStore::new(),
                engine: FilterEngine::new(),
                sync: MapSyncController::new(),
                backend: MemoryMapBackend::new(),
            }
        }

        fn load(&mut self, values: Vec<Value>) {
            let (mut collection, _) = NodeCollection::build(records_from_values(values));
            self.sync.bind_markers(&mut collection, &mut self.backend);
            self.store.replace(collection);
        }

        fn show(&mut self, categories: &[Category], zoom: u8) -> ReconcileReport {
            let criteria = FilterCriteria {
                categories: categories.iter().copied().collect::<CategorySet>(),
                since: epoch(),
            };
            let view = self.engine.compute(&self.store, &criteria).clone();
            self.sync.reconcile(
                &self.store,
                &view,
                ClusteringConfig::new(zoom),
                &mut self.backend,
            )
        }
    }

    fn five() -> Vec<Value> {
        vec![
            node("a", 1),
            node("b", 1),
            node("c", 2),
            node("d", 3),
            node("e", 4),
        ]
    }

    #[test]
    fn visible_set_matches_view() {
        let mut h = Harness::new();
        h.load(five());
        let report = h.show(&Category::ALL, 12);
        assert_eq!(report.visible, 5);
        assert_eq!(h.backend.visible_keys(), vec!["a", "b", "c", "d", "e"]);

        let report = h.show(&[Category::Client], 12);
        assert_eq!(report.detached, 3);
        assert_eq!(report.attached, 0);
        assert!(!report.layer_replaced);
        assert_eq!(h.backend.visible_keys(), vec!["a", "b"]);

        h.show(&[], 12);
        assert!(h.backend.visible_keys().is_empty());
    }

    #[test]
    fn unchanged_config_keeps_layer() {
        let mut h = Harness::new();
        h.load(five());
        let first = h.show(&Category::ALL, 12).layer;
        let second = h.show(&[Category::Repeater], 12).layer;
        assert_eq!(first, second);
        assert_eq!(h.backend.layer_ids(), vec![first]);
        assert!(h.backend.removed_layers().is_empty());
    }

    #[test]
    fn config_change_replaces_layer_and_vacates_old_one() {
        let mut h = Harness::new();
        h.load(five());
        let first = h.show(&Category::ALL, 12).layer;
        let report = h.show(&Category::ALL, 15);
        assert!(report.layer_replaced);
        assert_ne!(report.layer, first);
        assert_eq!(h.backend.removed_layers(), &[(first, 0)]);
        assert_eq!(h.backend.layer_ids(), vec![report.layer]);
        let layer = h.backend.layer(report.layer).unwrap();
        assert_eq!(layer.config.disable_clustering_at_zoom, 15);
        assert_eq!(layer.members.len(), 5);
    }

    #[test]
    fn reingest_reuses_markers_and_releases_orphans() {
        let mut h = Harness::new();
        h.load(five());
        h.show(&Category::ALL, 12);
        let before = h.store.find_by_key("a").and_then(|n| n.marker());

        h.load(vec![node("a", 1), node("z", 2)]);
        let report = h.show(&Category::ALL, 12);
        assert_eq!(h.store.find_by_key("a").and_then(|n| n.marker()), before);
        assert_eq!(report.attached, 1);
        assert_eq!(report.detached, 4);
        assert_eq!(report.released, 4);
        assert_eq!(h.backend.visible_keys(), vec!["a", "z"]);
        assert_eq!(h.backend.marker_count(), 2);
        assert_eq!(h.sync.registry().orphan_count(), 0);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut h = Harness::new();
        h.load(five());
        h.show(&[Category::Client, Category::Sensor], 12);
        let again = h.show(&[Category::Client, Category::Sensor], 12);
        assert_eq!(again.attached, 0);
        assert_eq!(again.detached, 0);
        assert_eq!(h.backend.visible_keys(), vec!["a", "b", "e"]);
    }
}
