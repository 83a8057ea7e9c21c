use dataset::search::search;
use dataset::stats::NodeStats;
use dataset::{
    Category, CategorySet, FilterCriteria, FilterEngine, FilteredView, IngestReport, Node,
    NodeCollection, NodeStore, log_rejected,
};
use foundation::{LatLon, Timestamp, Viewport};
use layers::{ClusteringConfig, MapBackend, MapSyncController};
use runtime::EventBus;
use tracing::{debug, info, warn};

use crate::codec::{self, PartialViewState, ViewState};
use crate::config::MapConfig;
use crate::events::SyncEvent;
use crate::history::HistorySink;
use crate::refresh::{FetchFailure, FetchedRecords, RefreshError, RefreshTicket};

/// Drives the whole map from input events.
///
/// Every input (dataset arrival, filter change, clustering change, viewport
/// settle) runs to completion synchronously: update state, recompute the
/// filtered view, reconcile the backend, write the URL. Fetching happens
/// outside; see [`ViewStateController::begin_refresh`].
pub struct ViewStateController<B, H> {
    config: MapConfig,
    backend: B,
    history: H,
    store: NodeStore,
    filter: FilterEngine,
    sync: MapSyncController,
    state: ViewState,
    /// Fields that go into the URL.
    explicit: PartialViewState,
    /// URL overrides waiting for the first dataset.
    pending: PartialViewState,
    in_flight: Option<u64>,
    next_ticket: u64,
    events: EventBus<SyncEvent>,
    last_query: Option<String>,
    /// Failure of the latest completed refresh, until one succeeds.
    last_failure: Option<FetchFailure>,
}

impl<B: MapBackend, H: HistorySink> ViewStateController<B, H> {
    pub fn new(config: MapConfig, backend: B, history: H) -> Self {
        let state = ViewState {
            viewport: config.default_viewport,
            criteria: FilterCriteria {
                categories: CategorySet::all(),
                since: config.default_since,
            },
            clustering: ClusteringConfig::new(config.cluster_zoom),
        };
        Self {
            config,
            backend,
            history,
            store: NodeStore::new(),
            filter: FilterEngine::new(),
            sync: MapSyncController::new(),
            state,
            explicit: PartialViewState::default(),
            pending: PartialViewState::default(),
            in_flight: None,
            next_ticket: 0,
            events: EventBus::new(),
            last_query: None,
            last_failure: None,
        }
    }

    /// Applies the URL viewport right away and starts the first fetch. The
    /// URL's filter and clustering fields are applied once that fetch lands.
    pub fn startup(&mut self, query: &str) -> Result<RefreshTicket, RefreshError> {
        let decoded = codec::decode(query);
        debug!(?decoded, "decoded startup url");
        if let Some(viewport) = decoded.viewport {
            self.state.viewport = viewport;
            self.explicit.viewport = Some(viewport);
        }
        self.pending = PartialViewState {
            viewport: None,
            ..decoded
        };
        self.backend.set_view(self.state.viewport);
        self.begin_refresh()
    }

    /// Fails with [`RefreshError::InFlight`] while another refresh is out.
    pub fn begin_refresh(&mut self) -> Result<RefreshTicket, RefreshError> {
        if let Some(id) = self.in_flight {
            debug!(outstanding = id, "refresh refused");
            return Err(RefreshError::InFlight);
        }
        self.next_ticket += 1;
        self.in_flight = Some(self.next_ticket);
        debug!(ticket = self.next_ticket, "refresh started");
        Ok(RefreshTicket::new(self.next_ticket))
    }

    /// Ingests a fetched dataset, or records the failure and leaves the
    /// store, view and markers as they were.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        outcome: Result<FetchedRecords, FetchFailure>,
    ) -> Result<IngestReport, RefreshError> {
        if self.in_flight != Some(ticket.id()) {
            return Err(RefreshError::UnknownTicket(ticket.id()));
        }
        self.in_flight = None;

        let records = match outcome {
            Ok(records) => records,
            Err(failure) => {
                warn!("node refresh failed: {failure}");
                self.events.emit(SyncEvent::IngestRejected {
                    reason: failure.to_string(),
                });
                self.last_failure = Some(failure.clone());
                return Err(failure.into());
            }
        };

        self.last_failure = None;
        let (mut collection, rejected) = NodeCollection::build(records);
        log_rejected(&rejected);
        self.sync.bind_markers(&mut collection, &mut self.backend);
        let accepted = collection.len();
        let generation = self.store.replace(collection);
        self.events.emit(SyncEvent::Ingested {
            generation,
            accepted,
            rejected: rejected.len(),
        });

        let pending = std::mem::take(&mut self.pending);
        self.apply_explicit(&pending);
        self.refresh_view();
        self.write_url();

        Ok(IngestReport {
            generation,
            accepted,
            rejected,
        })
    }

    pub fn set_categories(&mut self, categories: CategorySet) {
        self.update(PartialViewState {
            categories: Some(categories),
            ..PartialViewState::default()
        });
    }

    /// Flips one category in the active selection.
    pub fn toggle_category(&mut self, category: Category) {
        let mut categories = self.state.criteria.categories;
        categories.toggle(category);
        self.set_categories(categories);
    }

    pub fn set_since(&mut self, since: Timestamp) {
        self.update(PartialViewState {
            since: Some(since),
            ..PartialViewState::default()
        });
    }

    pub fn set_cluster_zoom(&mut self, disable_clustering_at_zoom: u8) {
        self.update(PartialViewState {
            cluster_zoom: Some(disable_clustering_at_zoom),
            ..PartialViewState::default()
        });
    }

    /// Records where the map came to rest. Returns false when the rounded
    /// viewport is the one already in the URL, so moves caused by our own
    /// URL write do not loop.
    pub fn viewport_settled(&mut self, viewport: Viewport) -> bool {
        let rounded = viewport.rounded();
        if !rounded.is_valid() || self.explicit.viewport == Some(rounded) {
            return false;
        }
        self.state.viewport = rounded;
        self.explicit.viewport = Some(rounded);
        self.events.emit(SyncEvent::ViewportSettled(rounded));
        self.refresh_view();
        self.write_url();
        true
    }

    /// Flies to the node and opens its popup. `None` if the key is unknown.
    pub fn focus_node(&mut self, public_key: &str) -> Option<LatLon> {
        let node = self.store.find_by_key(public_key)?;
        let marker = node.marker()?;
        let position = node.position();
        self.backend
            .focus_marker(marker, position, self.config.focus_zoom);
        Some(position)
    }

    pub fn search(&self, query: &str) -> Vec<&Node> {
        search(self.store.all(), query, self.config.search_limit)
    }

    pub fn stats(&self, now: Timestamp) -> NodeStats {
        NodeStats::compute(self.store.all(), now)
    }

    pub fn visible_nodes(&self) -> Vec<&Node> {
        self.filter
            .current()
            .map(|view| view.nodes(&self.store).collect())
            .unwrap_or_default()
    }

    pub fn view(&self) -> Option<&FilteredView> {
        self.filter.current()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn explicit(&self) -> &PartialViewState {
        &self.explicit
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn events(&self) -> &EventBus<SyncEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus<SyncEvent> {
        &mut self.events
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Why the latest refresh failed, for the page to show. Cleared by the
    /// next successful one.
    pub fn last_failure(&self) -> Option<&FetchFailure> {
        self.last_failure.as_ref()
    }

    pub fn current_query(&self) -> String {
        codec::encode(&self.url_state())
    }

    /// What the URL carries: explicit fields over URL fields still waiting
    /// for the first dataset.
    fn url_state(&self) -> PartialViewState {
        let mut state = self.pending;
        state.merge(&self.explicit);
        state
    }

    fn update(&mut self, change: PartialViewState) {
        if change.categories.is_some() {
            self.pending.categories = None;
        }
        if change.since.is_some() {
            self.pending.since = None;
        }
        if change.cluster_zoom.is_some() {
            self.pending.cluster_zoom = None;
        }
        self.apply_explicit(&change);
        self.refresh_view();
        self.write_url();
    }

    fn apply_explicit(&mut self, change: &PartialViewState) {
        if change.is_empty() {
            return;
        }
        let before = self.state;
        self.state.apply(change);
        self.explicit.merge(change);

        if self.state.criteria != before.criteria {
            self.events
                .emit(SyncEvent::CriteriaChanged(self.state.criteria));
        }
        if self.state.clustering != before.clustering {
            info!(
                threshold = self.state.clustering.disable_clustering_at_zoom,
                "clustering threshold changed"
            );
            self.events.emit(SyncEvent::ClusteringChanged {
                disable_clustering_at_zoom: self.state.clustering.disable_clustering_at_zoom,
            });
        }
    }

    fn refresh_view(&mut self) {
        let view = self.filter.compute(&self.store, &self.state.criteria);
        let report = self
            .sync
            .reconcile(&self.store, view, self.state.clustering, &mut self.backend);
        self.events.emit(SyncEvent::Reconciled {
            generation: self.store.generation(),
            criteria: self.state.criteria,
            cluster_zoom: self.state.clustering.disable_clustering_at_zoom,
            visible: report.visible,
        });
    }

    fn write_url(&mut self) {
        let query = codec::encode(&self.url_state());
        if self.last_query.as_deref() == Some(query.as_str()) {
            return;
        }
        debug!(%query, "writing url");
        self.history.replace(&query);
        self.events.emit(SyncEvent::UrlWritten {
            query: query.clone(),
        });
        self.last_query = Some(query);
    }
}
