use dataset::{DataFormatError, NodeRecord, records_from_json};
use thiserror::Error;

/// Why a dataset download produced nothing usable. The previous dataset
/// stays in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("response body is not a node list: {0}")]
    Body(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("a refresh is already in flight")]
    InFlight,
    #[error("refresh ticket {0} is not the outstanding one")]
    UnknownTicket(u64),
    #[error(transparent)]
    Fetch(#[from] FetchFailure),
}

/// Proof that a refresh was started. Consumed by `complete_refresh`.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a refresh ticket must be completed or the controller stays busy"]
pub struct RefreshTicket {
    id: u64,
}

impl RefreshTicket {
    pub(crate) fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Per-record results of a fetched body.
pub type FetchedRecords = Vec<Result<NodeRecord, DataFormatError>>;

/// Turns a response body into fetch outcome form.
pub fn parse_nodes_body(body: &str) -> Result<FetchedRecords, FetchFailure> {
    records_from_json(body).map_err(|e| FetchFailure::Body(e.to_string()))
}
