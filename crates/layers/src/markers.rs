use std::collections::{BTreeSet, HashMap, HashSet};

use dataset::NodeCollection;
use foundation::MarkerHandle;
use tracing::debug;

use crate::backend::{MapBackend, MarkerSpec};
use crate::detail::node_detail;
use crate::symbology::marker_style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindReport {
    pub created: usize,
    pub reused: usize,
    /// Markers left without a node; released after the next reconcile.
    pub orphaned: usize,
}

/// Owner of every marker object the backend holds.
///
/// Handles are generational: a released index is recycled with a bumped
/// generation so stale back-references never alias a new marker.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    specs: HashMap<MarkerHandle, MarkerSpec>,
    /// Keyed by public key and its occurrence index within the collection.
    by_key: HashMap<(String, usize), MarkerHandle>,
    orphans: BTreeSet<MarkerHandle>,
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a marker to every node of `collection`, before it is swapped
    /// into the store.
    ///
    /// A node keeps its previous marker when one exists for the same public
    /// key (and, for repeated keys, the same occurrence) with an identical
    /// spec. Markers no node claims become orphans; they may still be
    /// attached and are only released through
    /// [`MarkerRegistry::release_orphans`].
    pub fn bind(
        &mut self,
        collection: &mut NodeCollection,
        backend: &mut dyn MapBackend,
    ) -> BindReport {
        let mut report = BindReport::default();
        let mut claimed: HashSet<MarkerHandle> = HashSet::new();
        let mut next_by_key: HashMap<(String, usize), MarkerHandle> = HashMap::new();
        let mut occurrences: HashMap<String, usize> = HashMap::new();

        for node in collection.nodes_mut() {
            let occurrence = occurrences.entry(node.public_key().to_string()).or_default();
            let key = (node.public_key().to_string(), *occurrence);
            *occurrence += 1;
            let spec = MarkerSpec {
                public_key: node.public_key().to_string(),
                position: node.position(),
                style: marker_style(node),
                detail: node_detail(node),
            };
            let reusable = self
                .by_key
                .get(&key)
                .copied()
                .filter(|h| !claimed.contains(h) && self.specs.get(h) == Some(&spec));

            let handle = match reusable {
                Some(h) => {
                    report.reused += 1;
                    h
                }
                None => {
                    let h = self.allocate();
                    backend.create_marker(h, &spec);
                    self.specs.insert(h, spec);
                    report.created += 1;
                    h
                }
            };
            claimed.insert(handle);
            next_by_key.insert(key, handle);
            node.set_marker(Some(handle));
        }

        for h in self.specs.keys() {
            if !claimed.contains(h) {
                self.orphans.insert(*h);
            }
        }
        self.orphans.retain(|h| !claimed.contains(h));
        report.orphaned = self.orphans.len();
        self.by_key = next_by_key;

        debug!(
            created = report.created,
            reused = report.reused,
            orphaned = report.orphaned,
            "markers bound"
        );
        report
    }

    /// Releases orphans that are not in `attached`. Returns how many.
    pub fn release_orphans(
        &mut self,
        attached: &BTreeSet<MarkerHandle>,
        backend: &mut dyn MapBackend,
    ) -> usize {
        let releasable: Vec<MarkerHandle> = self
            .orphans
            .iter()
            .copied()
            .filter(|h| !attached.contains(h))
            .collect();
        for h in &releasable {
            self.orphans.remove(h);
            self.specs.remove(h);
            backend.release_marker(*h);
            self.free.push(h.index());
        }
        releasable.len()
    }

    pub fn spec(&self, handle: MarkerHandle) -> Option<&MarkerSpec> {
        self.specs.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    fn allocate(&mut self) -> MarkerHandle {
        match self.free.pop() {
            Some(index) => {
                let generation = &mut self.generations[index as usize];
                *generation += 1;
                MarkerHandle::new(index, *generation)
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                MarkerHandle::new(index, 0)
            }
        }
    }
}
