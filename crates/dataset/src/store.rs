use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::category::Category;
use crate::node::Node;
use crate::record::{DataFormatError, NodeRecord};

/// One complete fetch worth of nodes plus its category partition.
///
/// Ordering contract:
/// - `nodes()` and every partition keep fetch order.
#[derive(Debug, Default, Clone)]
pub struct NodeCollection {
    nodes: Vec<Node>,
    by_category: BTreeMap<Category, Vec<usize>>,
}

impl NodeCollection {
    /// Validates every record, keeping the good ones and reporting the rest.
    pub fn build<I>(records: I) -> (Self, Vec<DataFormatError>)
    where
        I: IntoIterator<Item = Result<NodeRecord, DataFormatError>>,
    {
        let mut nodes = Vec::new();
        let mut rejected = Vec::new();
        for (index, record) in records.into_iter().enumerate() {
            match record.and_then(|r| Node::from_record(index, r)) {
                Ok(node) => nodes.push(node),
                Err(err) => rejected.push(err),
            }
        }
        (Self::from_nodes(nodes), rejected)
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut by_category: BTreeMap<Category, Vec<usize>> = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            by_category.entry(node.category()).or_default().push(i);
        }
        Self { nodes, by_category }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable access for the derived marker back-reference only; the
    /// category index stays valid because categories cannot be changed.
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn category_indices(&self, category: Category) -> &[usize] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub generation: u64,
    pub accepted: usize,
    pub rejected: Vec<DataFormatError>,
}

/// Owner of the current node collection.
///
/// The only mutation is a wholesale [`NodeStore::replace`]: the new collection
/// and its index are built outside the store and swapped in as one step, so a
/// reader never sees a half-built partition.
#[derive(Debug, Default)]
pub struct NodeStore {
    current: NodeCollection,
    generation: u64,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from `records` and swaps it in.
    pub fn ingest<I>(&mut self, records: I) -> IngestReport
    where
        I: IntoIterator<Item = Result<NodeRecord, DataFormatError>>,
    {
        let (collection, rejected) = NodeCollection::build(records);
        log_rejected(&rejected);
        let accepted = collection.len();
        let generation = self.replace(collection);
        IngestReport {
            generation,
            accepted,
            rejected,
        }
    }

    /// Replaces the collection; returns the new generation.
    pub fn replace(&mut self, collection: NodeCollection) -> u64 {
        self.generation += 1;
        info!(
            generation = self.generation,
            nodes = collection.len(),
            "node collection replaced"
        );
        self.current = collection;
        self.generation
    }

    /// Bumped on every replace. Zero until the first ingest.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn collection(&self) -> &NodeCollection {
        &self.current
    }

    pub fn all(&self) -> &[Node] {
        self.current.nodes()
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Node> + '_ {
        self.current
            .category_indices(category)
            .iter()
            .map(|&i| &self.current.nodes[i])
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.current.nodes.get(index)
    }

    pub fn find_by_key(&self, public_key: &str) -> Option<&Node> {
        self.current
            .nodes
            .iter()
            .find(|n| n.public_key() == public_key)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Dropped records are diagnostics only; they never reach the user.
pub fn log_rejected(rejected: &[DataFormatError]) {
    for err in rejected {
        warn!(index = err.index(), "dropping node record: {err}");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::records_from_values;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    pub(crate) fn node_json(key: &str, name: &str, category: u8, inserted: &str) -> Value {
        json!({
            "adv_name": name,
            "type": category,
            "adv_lat": 48.0,
            "adv_lon": 17.0,
            "inserted_date": inserted,
            "public_key": key,
        })
    }

    pub(crate) fn store_from(values: Vec<Value>) -> NodeStore {
        let mut store = NodeStore::new();
        store.ingest(records_from_values(values));
        store
    }

    fn keys<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<&'a str> {
        nodes.map(Node::public_key).collect()
    }

    #[test]
    fn ingest_partitions_by_category_in_fetch_order() {
        let store = store_from(vec![
            node_json("a", "A", 1, "2024-01-01"),
            node_json("b", "B", 2, "2024-01-01"),
            node_json("c", "C", 1, "2024-01-01"),
            node_json("d", "D", 3, "2024-01-01"),
        ]);
        assert_eq!(store.generation(), 1);
        assert_eq!(keys(store.all().iter()), vec!["a", "b", "c", "d"]);
        assert_eq!(keys(store.by_category(Category::Client)), vec!["a", "c"]);
        assert_eq!(keys(store.by_category(Category::RoomServer)), vec!["d"]);
        assert_eq!(store.by_category(Category::Sensor).count(), 0);
    }

    #[test]
    fn bad_records_are_dropped_not_fatal() {
        let mut bad = node_json("x", "X", 1, "2024-01-01");
        bad.as_object_mut().unwrap().remove("adv_lat");
        let mut store = NodeStore::new();
        let report = store.ingest(records_from_values(vec![
            node_json("a", "A", 1, "2024-01-01"),
            bad,
            json!("garbage"),
            node_json("b", "B", 2, "2024-01-01"),
        ]));
        assert_eq!(report.accepted, 2);
        assert_eq!(
            report.rejected.iter().map(|e| e.index()).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(keys(store.all().iter()), vec!["a", "b"]);
    }

    #[test]
    fn replace_supersedes_previous_collection() {
        let mut store = store_from(vec![node_json("a", "A", 1, "2024-01-01")]);
        store.ingest(records_from_values(vec![node_json("z", "Z", 4, "2024-01-01")]));
        assert_eq!(store.generation(), 2);
        assert_eq!(keys(store.all().iter()), vec!["z"]);
        assert_eq!(store.by_category(Category::Client).count(), 0);
        assert!(store.find_by_key("a").is_none());
        assert_eq!(store.find_by_key("z").map(Node::name), Some("Z"));
    }
}
