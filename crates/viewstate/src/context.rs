use foundation::format_timestamp;
use layers::MapBackend;
use prefs::{BaseLayer, BaseLayerPreference, PreferenceStore, PrefsError};
use serde::Serialize;
use tracing::warn;

use crate::config::MapConfig;
use crate::controller::ViewStateController;
use crate::history::HistorySink;

/// Everything one map page owns, created once by the host.
pub struct AppContext<B, H> {
    controller: ViewStateController<B, H>,
    prefs: Box<dyn PreferenceStore>,
    base_layer: BaseLayer,
}

/// Read-only view of the context for debugging hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub generation: u64,
    pub nodes: usize,
    pub visible: usize,
    pub categories: Vec<u8>,
    pub since: String,
    pub cluster_zoom: u8,
    pub query: String,
    pub base_layer: &'static str,
    pub refreshing: bool,
    pub recent_events: Vec<String>,
}

impl<B: MapBackend, H: HistorySink> AppContext<B, H> {
    pub fn new(config: MapConfig, backend: B, history: H, prefs: Box<dyn PreferenceStore>) -> Self {
        let base_layer = BaseLayerPreference::load(prefs.as_ref());
        Self {
            controller: ViewStateController::new(config, backend, history),
            prefs,
            base_layer,
        }
    }

    pub fn controller(&self) -> &ViewStateController<B, H> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewStateController<B, H> {
        &mut self.controller
    }

    pub fn base_layer(&self) -> BaseLayer {
        self.base_layer
    }

    /// Switches the base layer; the choice sticks even if persisting fails.
    pub fn select_base_layer(&mut self, layer: BaseLayer) -> Result<(), PrefsError> {
        self.base_layer = layer;
        BaseLayerPreference::save(self.prefs.as_mut(), layer).inspect_err(|err| {
            warn!("could not persist base layer: {err}");
        })
    }

    pub fn debug_snapshot(&self, recent: usize) -> DebugSnapshot {
        let c = &self.controller;
        let state = c.state();
        let events: Vec<String> = c
            .events()
            .events()
            .map(|e| format!("{}:{}", e.seq, e.kind.name()))
            .collect();
        let skip = events.len().saturating_sub(recent);
        DebugSnapshot {
            generation: c.store().generation(),
            nodes: c.store().len(),
            visible: c.view().map(|v| v.len()).unwrap_or(0),
            categories: state.criteria.categories.codes(),
            since: format_timestamp(state.criteria.since),
            cluster_zoom: state.clustering.disable_clustering_at_zoom,
            query: c.current_query(),
            base_layer: self.base_layer.name(),
            refreshing: c.is_refreshing(),
            recent_events: events.into_iter().skip(skip).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use dataset::records_from_values;
    use layers::MemoryMapBackend;
    use pretty_assertions::assert_eq;
    use prefs::InMemoryPreferenceStore;
    use serde_json::json;

    fn context(prefs: InMemoryPreferenceStore) -> AppContext<MemoryMapBackend, MemoryHistory> {
        AppContext::new(
            MapConfig::default(),
            MemoryMapBackend::new(),
            MemoryHistory::new(),
            Box::new(prefs),
        )
    }

    #[test]
    fn base_layer_comes_from_preferences() {
        let mut stored = InMemoryPreferenceStore::new();
        stored.set(BaseLayerPreference::KEY, "Esri Satellite").unwrap();
        assert_eq!(context(stored).base_layer(), BaseLayer::EsriSatellite);
        assert_eq!(
            context(InMemoryPreferenceStore::new()).base_layer(),
            BaseLayer::OpenStreetMap
        );
    }

    #[test]
    fn selecting_a_layer_persists_it() {
        let mut ctx = context(InMemoryPreferenceStore::new());
        ctx.select_base_layer(BaseLayer::EsriSatellite).unwrap();
        assert_eq!(ctx.base_layer(), BaseLayer::EsriSatellite);
        assert_eq!(BaseLayerPreference::load(ctx.prefs.as_ref()), BaseLayer::EsriSatellite);
    }

    #[test]
    fn snapshot_reflects_controller() {
        let mut ctx = context(InMemoryPreferenceStore::new());
        let ticket = ctx.controller_mut().startup("nodes=2").unwrap();
        assert!(ctx.debug_snapshot(4).refreshing);

        let records = records_from_values(vec![
            json!({"adv_name": "A", "type": 1, "adv_lat": 1.0, "adv_lon": 2.0,
                   "inserted_date": "2024-01-01", "public_key": "a"}),
            json!({"adv_name": "B", "type": 2, "adv_lat": 1.0, "adv_lon": 2.0,
                   "inserted_date": "2024-01-01", "public_key": "b"}),
        ]);
        ctx.controller_mut().complete_refresh(ticket, Ok(records)).unwrap();

        let snap = ctx.debug_snapshot(2);
        assert_eq!(snap.generation, 1);
        assert_eq!(snap.nodes, 2);
        assert_eq!(snap.visible, 1);
        assert_eq!(snap.categories, vec![2]);
        assert_eq!(snap.since, "1970-01-01");
        assert_eq!(snap.cluster_zoom, 12);
        assert_eq!(snap.query, "nodes=2");
        assert_eq!(snap.base_layer, "OpenStreetMap");
        assert!(!snap.refreshing);
        assert_eq!(snap.recent_events, vec!["2:reconciled", "3:url_written"]);
    }
}
