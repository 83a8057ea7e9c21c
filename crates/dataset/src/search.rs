use crate::node::Node;

/// Default number of hits returned to the search box.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Nodes whose name contains `query` (case-insensitive) or whose public key
/// starts with it, sorted by name.
pub fn search<'a>(nodes: &'a [Node], query: &str, limit: usize) -> Vec<&'a Node> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    let mut hits: Vec<&Node> = nodes
        .iter()
        .filter(|n| n.name().to_lowercase().contains(&needle) || n.public_key().starts_with(query))
        .collect();
    hits.sort_by(|a, b| {
        a.name()
            .to_lowercase()
            .cmp(&b.name().to_lowercase())
            .then_with(|| a.name().cmp(b.name()))
    });
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{node_json, store_from};

    fn names<'a>(hits: &[&'a Node]) -> Vec<&'a str> {
        hits.iter().map(|n| n.name()).collect()
    }

    #[test]
    fn matches_name_or_key_prefix_sorted_by_name() {
        let store = store_from(vec![
            node_json("f00d", "zeta relay", 2, "2024-01-01"),
            node_json("beef", "Alpha Relay", 2, "2024-01-01"),
            node_json("relay0", "Bravo", 1, "2024-01-01"),
            node_json("cafe", "Charlie", 1, "2024-01-01"),
        ]);
        let hits = search(store.all(), "relay", DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&hits), vec!["Alpha Relay", "Bravo", "zeta relay"]);
    }

    #[test]
    fn empty_query_and_limit() {
        let store = store_from(
            (0..30)
                .map(|i| node_json(&format!("k{i:02}"), &format!("Node {i:02}"), 1, "2024-01-01"))
                .collect(),
        );
        assert!(search(store.all(), "", DEFAULT_SEARCH_LIMIT).is_empty());
        let hits = search(store.all(), "node", DEFAULT_SEARCH_LIMIT);
        assert_eq!(hits.len(), 20);
        assert_eq!(hits[0].name(), "Node 00");
    }
}
