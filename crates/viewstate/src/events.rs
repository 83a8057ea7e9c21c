use dataset::FilterCriteria;
use foundation::Viewport;

/// State transitions recorded by the view-state controller, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Ingested {
        generation: u64,
        accepted: usize,
        rejected: usize,
    },
    /// A refresh failed; nothing changed.
    IngestRejected { reason: String },
    CriteriaChanged(FilterCriteria),
    ClusteringChanged { disable_clustering_at_zoom: u8 },
    Reconciled {
        generation: u64,
        criteria: FilterCriteria,
        cluster_zoom: u8,
        visible: usize,
    },
    ViewportSettled(Viewport),
    UrlWritten { query: String },
}

impl SyncEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::Ingested { .. } => "ingested",
            SyncEvent::IngestRejected { .. } => "ingest_rejected",
            SyncEvent::CriteriaChanged(_) => "criteria_changed",
            SyncEvent::ClusteringChanged { .. } => "clustering_changed",
            SyncEvent::Reconciled { .. } => "reconciled",
            SyncEvent::ViewportSettled(_) => "viewport_settled",
            SyncEvent::UrlWritten { .. } => "url_written",
        }
    }
}
