//! Headless driver for the map core: same controller as the web page, with
//! an in-memory renderer.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use dataset::{Category, CategorySet, Node};
use foundation::Timestamp;
use layers::MemoryMapBackend;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use viewstate::{
    FetchFailure, FetchedRecords, MapConfig, MemoryHistory, NodeSubmission, RefreshError,
    SubmissionFailure, SubmissionReply, ViewStateController, parse_nodes_body,
};

pub type HeadlessController = ViewStateController<MemoryMapBackend, MemoryHistory>;

pub fn now() -> Timestamp {
    Utc::now()
}

pub async fn fetch_records(client: &Client, url: &str) -> Result<FetchedRecords, FetchFailure> {
    debug!(%url, "fetching nodes");
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchFailure::Transport(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(FetchFailure::Status(resp.status().as_u16()));
    }
    let body = resp
        .text()
        .await
        .map_err(|e| FetchFailure::Transport(e.to_string()))?;
    parse_nodes_body(&body)
}

pub async fn read_records(path: &Path) -> Result<FetchedRecords, FetchFailure> {
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FetchFailure::Transport(format!("read {}: {e}", path.display())))?;
    parse_nodes_body(&body)
}

pub async fn submit(
    client: &Client,
    url: &str,
    submission: &NodeSubmission,
) -> Result<String, SubmissionFailure> {
    let resp = client
        .post(url)
        .json(submission)
        .send()
        .await
        .map_err(|e| SubmissionFailure::Transport(e.to_string()))?;
    let body = resp
        .text()
        .await
        .map_err(|e| SubmissionFailure::Transport(e.to_string()))?;
    SubmissionReply::parse(&body)?.into_result()
}

/// Accepts codes (`1,3`) or names (`client,room-server`). An empty string is
/// the empty selection.
pub fn parse_categories(raw: &str) -> Result<CategorySet, String> {
    let mut set = CategorySet::empty();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let category = match token.to_ascii_lowercase().as_str() {
            "client" | "clients" => Category::Client,
            "repeater" | "repeaters" => Category::Repeater,
            "room" | "room-server" | "roomserver" => Category::RoomServer,
            "sensor" | "sensors" => Category::Sensor,
            other => match other.parse::<u8>().map(Category::from_code) {
                Ok(c) if c.is_known() => c,
                _ => return Err(format!("unknown node type `{token}`")),
            },
        };
        set.insert(category);
    }
    Ok(set)
}

/// User changes applied after the URL state, in this order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewChanges {
    pub categories: Option<CategorySet>,
    pub since: Option<Timestamp>,
    pub cluster_zoom: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleNode {
    pub public_key: String,
    pub name: String,
    pub category: &'static str,
    pub coords: String,
}

impl From<&Node> for VisibleNode {
    fn from(node: &Node) -> Self {
        Self {
            public_key: node.public_key().to_string(),
            name: node.name().to_string(),
            category: node.category().label(),
            coords: node.coords().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSummary {
    pub generation: u64,
    pub accepted: usize,
    pub rejected: usize,
    pub cluster_zoom: u8,
    pub rendered_markers: usize,
    pub query: String,
    pub visible: Vec<VisibleNode>,
}

impl fmt::Display for ViewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} nodes loaded ({} dropped), {} visible, clustering off at zoom {}",
            self.accepted,
            self.rejected,
            self.visible.len(),
            self.cluster_zoom
        )?;
        writeln!(f, "url: ?{}", self.query)?;
        for n in &self.visible {
            writeln!(f, "  {:<10} {:<28} {}  {}", n.category, n.name, n.coords, n.public_key)?;
        }
        Ok(())
    }
}

/// Loads `records` into a fresh headless controller the way a page load with
/// `query` would, then applies `changes`.
pub fn run_view(
    config: MapConfig,
    records: FetchedRecords,
    query: &str,
    changes: ViewChanges,
) -> Result<(HeadlessController, ViewSummary), RefreshError> {
    let mut controller =
        ViewStateController::new(config, MemoryMapBackend::new(), MemoryHistory::new());
    let ticket = controller.startup(query)?;
    let report = controller.complete_refresh(ticket, Ok(records))?;

    if let Some(categories) = changes.categories {
        controller.set_categories(categories);
    }
    if let Some(since) = changes.since {
        controller.set_since(since);
    }
    if let Some(zoom) = changes.cluster_zoom {
        controller.set_cluster_zoom(zoom);
    }

    let summary = ViewSummary {
        generation: report.generation,
        accepted: report.accepted,
        rejected: report.rejected.len(),
        cluster_zoom: controller.state().clustering.disable_clustering_at_zoom,
        rendered_markers: controller.backend().visible_markers().len(),
        query: controller.current_query(),
        visible: controller
            .visible_nodes()
            .into_iter()
            .map(VisibleNode::from)
            .collect(),
    };
    Ok((controller, summary))
}
