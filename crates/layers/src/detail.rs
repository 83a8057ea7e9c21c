use dataset::Node;
use foundation::format_timestamp;
use serde::Serialize;

/// How a detail value is shown in the marker popup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DetailValue {
    Text(String),
    /// `"lat, lon"`, rendered as a link to an external map.
    Coords(String),
    /// Not shown; the popup offers to copy it instead.
    Copy(String),
    /// Timestamp text, localized by the renderer.
    Instant(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: DetailValue,
}

impl DetailRow {
    fn new(label: &'static str, value: DetailValue) -> Self {
        Self { label, value }
    }
}

/// Popup rows for `node`. Absent or empty fields are left out.
pub fn node_detail(node: &Node) -> Vec<DetailRow> {
    let mut rows = Vec::with_capacity(7);
    if !node.name().is_empty() {
        rows.push(DetailRow::new("Name", DetailValue::Text(node.name().to_string())));
    }
    rows.push(DetailRow::new(
        "Node type",
        DetailValue::Text(node.category().label().to_string()),
    ));
    if let Some(link) = node.link().filter(|l| !l.is_empty()) {
        rows.push(DetailRow::new("Meshcore link", DetailValue::Copy(link.to_string())));
    }
    if let Some(updated) = node.updated_at() {
        rows.push(DetailRow::new(
            "Last heard",
            DetailValue::Instant(format_timestamp(updated)),
        ));
    }
    rows.push(DetailRow::new(
        "Public key",
        DetailValue::Text(node.public_key().to_string()),
    ));
    rows.push(DetailRow::new(
        "Coordinates",
        DetailValue::Coords(node.coords().to_string()),
    ));
    let params = node.params_summary();
    if !params.is_empty() {
        rows.push(DetailRow::new("Radio params", DetailValue::Text(params)));
    }
    rows
}
