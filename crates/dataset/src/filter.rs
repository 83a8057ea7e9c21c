use foundation::{Timestamp, epoch};

use crate::category::CategorySet;
use crate::node::Node;
use crate::store::{NodeCollection, NodeStore};

/// Which nodes are eligible for display.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub categories: CategorySet,
    /// Nodes whose activity instant is not strictly after this are hidden.
    pub since: Timestamp,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            categories: CategorySet::all(),
            since: epoch(),
        }
    }
}

impl FilterCriteria {
    pub fn accepts(&self, node: &Node) -> bool {
        self.categories.contains(node.category()) && node.activity_instant() > self.since
    }
}

/// Indices into the store's collection that pass the active criteria.
///
/// Ordering contract:
/// - Indices ascend, i.e. nodes keep fetch order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilteredView {
    generation: u64,
    indices: Vec<usize>,
}

impl FilteredView {
    /// Generation of the collection these indices refer to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Resolves the view against `store`. Yields nothing if the store has
    /// been replaced since the view was computed.
    pub fn nodes<'a>(&'a self, store: &'a NodeStore) -> impl Iterator<Item = &'a Node> + 'a {
        let current = store.generation() == self.generation;
        self.indices
            .iter()
            .filter(move |_| current)
            .filter_map(|&i| store.get(i))
    }
}

/// Pure filter over one collection.
///
/// An empty category set yields an empty result; it never means "everything".
pub fn compute(collection: &NodeCollection, criteria: &FilterCriteria) -> Vec<usize> {
    if criteria.categories.is_empty() {
        return Vec::new();
    }
    let nodes = collection.nodes();
    let mut out: Vec<usize> = criteria
        .categories
        .iter()
        .flat_map(|c| collection.category_indices(c).iter().copied())
        .filter(|&i| nodes[i].activity_instant() > criteria.since)
        .collect();
    out.sort_unstable();
    out
}

/// [`compute`] with a single-slot cache keyed by (store generation, criteria).
#[derive(Debug, Default)]
pub struct FilterEngine {
    cached: Option<(FilterCriteria, FilteredView)>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute(&mut self, store: &NodeStore, criteria: &FilterCriteria) -> &FilteredView {
        let hit = self
            .cached
            .as_ref()
            .is_some_and(|(c, v)| c == criteria && v.generation == store.generation());
        if !hit {
            self.cached = None;
        }
        let (_, view) = self.cached.get_or_insert_with(|| {
            let view = FilteredView {
                generation: store.generation(),
                indices: compute(store.collection(), criteria),
            };
            (*criteria, view)
        });
        view
    }

    /// Last computed view, if any.
    pub fn current(&self) -> Option<&FilteredView> {
        self.cached.as_ref().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::record::records_from_values;
    use crate::store::tests::{node_json, store_from};
    use foundation::parse_timestamp;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ts(raw: &str) -> Timestamp {
        parse_timestamp(raw).unwrap()
    }

    fn keys<'a>(view: &'a FilteredView, store: &'a NodeStore) -> Vec<&'a str> {
        view.nodes(store).map(Node::public_key).collect()
    }

    fn sample() -> NodeStore {
        store_from(vec![
            node_json("c1", "Client One", 1, "2024-01-05"),
            node_json("r1", "Repeater", 2, "2024-01-06"),
            node_json("c2", "Client Two", 1, "2024-01-07"),
            node_json("s1", "Room", 3, "2024-01-08"),
            node_json("c3", "Client Three", 1, "2024-01-09"),
        ])
    }

    #[test]
    fn empty_category_set_yields_empty_view() {
        let store = sample();
        let criteria = FilterCriteria {
            categories: CategorySet::empty(),
            since: epoch(),
        };
        assert!(compute(store.collection(), &criteria).is_empty());
    }

    #[test]
    fn category_filter_keeps_fetch_order() {
        let store = sample();
        let mut engine = FilterEngine::new();
        let criteria = FilterCriteria {
            categories: [Category::RoomServer, Category::Client].into_iter().collect(),
            since: epoch(),
        };
        let view = engine.compute(&store, &criteria).clone();
        assert_eq!(keys(&view, &store), vec!["c1", "c2", "s1", "c3"]);
    }

    #[test]
    fn inserted_timestamp_threshold_is_strict() {
        let store = sample();
        let criteria = FilterCriteria {
            categories: CategorySet::all(),
            since: ts("2024-01-07"),
        };
        let got = compute(store.collection(), &criteria);
        assert_eq!(got, vec![3, 4]);
    }

    #[test]
    fn updated_timestamp_is_authoritative() {
        let mut stale_insert = node_json("old", "Old", 1, "2023-01-01");
        stale_insert["updated_date"] = json!("2024-06-01T00:00:00Z");
        let mut fresh_insert = node_json("new", "New", 1, "2024-05-01");
        fresh_insert["updated_date"] = json!("2024-01-01T00:00:00Z");
        let store = store_from(vec![stale_insert, fresh_insert]);

        let criteria = FilterCriteria {
            categories: CategorySet::all(),
            since: ts("2024-03-01"),
        };
        let mut engine = FilterEngine::new();
        let view = engine.compute(&store, &criteria).clone();
        assert_eq!(keys(&view, &store), vec!["old"]);
    }

    #[test]
    fn unknown_categories_never_pass() {
        let store = store_from(vec![node_json("u", "U", 9, "2024-01-01")]);
        assert!(compute(store.collection(), &FilterCriteria::default()).is_empty());
    }

    #[test]
    fn cache_tracks_store_generation() {
        let mut store = sample();
        let mut engine = FilterEngine::new();
        let criteria = FilterCriteria::default();
        assert_eq!(engine.compute(&store, &criteria).len(), 5);

        store.ingest(records_from_values(vec![node_json("x", "X", 2, "2024-02-01")]));
        let view = engine.compute(&store, &criteria).clone();
        assert_eq!(view.generation(), 2);
        assert_eq!(keys(&view, &store), vec!["x"]);
    }

    #[test]
    fn stale_view_resolves_to_nothing() {
        let mut store = sample();
        let view = FilterEngine::new()
            .compute(&store, &FilterCriteria::default())
            .clone();
        store.ingest(records_from_values(vec![node_json("x", "X", 2, "2024-02-01")]));
        assert_eq!(view.nodes(&store).count(), 0);
    }
}
