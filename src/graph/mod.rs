//! Property graph façade used by every pass and detector.
//!
//! [`Graph`] wraps a [`GraphStore`] backend and routes each operation through
//! a [`RetryPolicy`], so a store that is still starting up is waited for
//! instead of failing the run.

mod error;
mod memory;
mod query;
mod retry;
mod store;

pub use error::{GraphError, GraphResult, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{HopPattern, HopRow, NodeFilter};
pub use retry::RetryPolicy;
pub use store::{Edge, GraphStore};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{EntityKind, Label, Node, NodeId, Property, RelationKind, Value};

/// Number of distinct same-named children of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCount {
    pub name: String,
    pub number: usize,
}

/// Size of the graph, logged at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub relationships: usize,
    pub inheritance: usize,
    pub compositions: usize,
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} relationships ({} inheritance, excluding implicit java.lang.Object \
             supertypes, {} composition)",
            self.nodes, self.relationships, self.inheritance, self.compositions
        )
    }
}

pub struct Graph<S: GraphStore = MemoryStore> {
    store: S,
    retry: RetryPolicy,
}

impl Graph<MemoryStore> {
    pub fn in_memory(retry: RetryPolicy) -> Self {
        Self::new(MemoryStore::new(), retry)
    }
}

impl<S: GraphStore> Graph<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn read<T, F>(&self, operation: &'static str, f: F) -> GraphResult<T>
    where
        F: Fn(&S) -> StoreResult<T>,
    {
        let store = &self.store;
        self.retry.run(operation, || f(store))
    }

    fn write<T, F>(&mut self, operation: &'static str, mut f: F) -> GraphResult<T>
    where
        F: FnMut(&mut S) -> StoreResult<T>,
    {
        let policy = self.retry;
        let store = &mut self.store;
        policy.run(operation, || f(&mut *store))
    }

    /// Create a node unconditionally. Used for methods and constructors,
    /// which are not unique by name.
    pub fn create_node(
        &mut self,
        name: &str,
        kind: EntityKind,
        labels: &[Label],
    ) -> GraphResult<Node> {
        let mut all = vec![Label::Kind(kind)];
        all.extend_from_slice(labels);
        self.write("create_node", |s| {
            let id = s.create_node(name, &all)?;
            s.node(id)
        })
    }

    /// Return the node named `name` with primary kind `kind`, creating it if
    /// absent.
    ///
    /// `create_labels` are applied only when the node is created,
    /// `match_labels` only when it already existed.
    pub fn get_or_create_node(
        &mut self,
        name: &str,
        kind: EntityKind,
        create_labels: &[Label],
        match_labels: &[Label],
    ) -> GraphResult<Node> {
        let kind_label = Label::Kind(kind);
        let mut on_create = vec![kind_label];
        on_create.extend_from_slice(create_labels);
        self.write("get_or_create_node", |s| {
            for id in s.nodes_named(name)? {
                let node = s.node(id)?;
                if node.has_label(kind_label) {
                    if match_labels.is_empty() {
                        return Ok(node);
                    }
                    s.add_labels(id, match_labels)?;
                    return s.node(id);
                }
            }
            let id = s.create_node(name, &on_create)?;
            s.node(id)
        })
    }

    pub fn node(&self, id: NodeId) -> GraphResult<Node> {
        self.read("node", |s| s.node(id))
    }

    /// Every node, in creation order.
    pub fn nodes(&self) -> GraphResult<Vec<Node>> {
        self.read("nodes", |s| {
            s.node_ids()?.into_iter().map(|id| s.node(id)).collect()
        })
    }

    pub fn nodes_matching(&self, filter: &NodeFilter) -> GraphResult<Vec<Node>> {
        Ok(self
            .nodes()?
            .into_iter()
            .filter(|n| filter.matches(n))
            .collect())
    }

    /// First node named `name`, if any.
    pub fn find_by_name(&self, name: &str) -> GraphResult<Option<Node>> {
        self.read("find_by_name", |s| match s.nodes_named(name)?.first() {
            Some(id) => s.node(*id).map(Some),
            None => Ok(None),
        })
    }

    /// First node named `name` carrying every label in `labels`.
    pub fn find_by_labels_and_name(
        &self,
        labels: &[Label],
        name: &str,
    ) -> GraphResult<Option<Node>> {
        self.read("find_by_labels_and_name", |s| {
            for id in s.nodes_named(name)? {
                let node = s.node(id)?;
                if labels.iter().all(|l| node.has_label(*l)) {
                    return Ok(Some(node));
                }
            }
            Ok(None)
        })
    }

    /// First class or interface whose name starts with `package.` and ends
    /// with `.simple`.
    pub fn find_in_package(&self, simple: &str, package: &str) -> GraphResult<Option<Node>> {
        let prefix = format!("{}.", package);
        let suffix = format!(".{}", simple);
        let last = simple.rsplit('.').next().unwrap_or(simple);
        self.read("find_in_package", |s| {
            for id in s.nodes_with_simple_name(last)? {
                let node = s.node(id)?;
                if node.is_type() && node.name.starts_with(&prefix) && node.name.ends_with(&suffix)
                {
                    return Ok(Some(node));
                }
            }
            Ok(None)
        })
    }

    pub fn add_label(&mut self, id: NodeId, label: impl Into<Label>) -> GraphResult<()> {
        let label = label.into();
        self.write("add_label", |s| s.add_labels(id, &[label]))
    }

    pub fn set_property(
        &mut self,
        id: NodeId,
        prop: Property,
        value: impl Into<Value>,
    ) -> GraphResult<()> {
        let value = value.into();
        self.write("set_property", |s| s.set_property(id, prop, value))
    }

    pub fn property(&self, id: NodeId, prop: Property) -> GraphResult<Option<Value>> {
        Ok(self.node(id)?.property(prop))
    }

    pub fn link(&mut self, source: NodeId, target: NodeId, kind: RelationKind) -> GraphResult<()> {
        self.write("link", |s| s.create_edge(source, target, kind))
    }

    /// Whether a direct edge of any kind goes from `source` to `target`.
    pub fn related_to(&self, source: NodeId, target: NodeId) -> GraphResult<bool> {
        self.read("related_to", |s| {
            Ok(s.outgoing(source)?.iter().any(|e| e.target == target))
        })
    }

    /// Targets of outgoing edges whose kind is in `kinds` (all kinds when
    /// empty), each node once.
    pub fn children(&self, id: NodeId, kinds: &[RelationKind]) -> GraphResult<Vec<Node>> {
        self.read("children", |s| {
            let mut seen = BTreeSet::new();
            let mut out = Vec::new();
            for edge in s.outgoing(id)? {
                if (kinds.is_empty() || kinds.contains(&edge.kind)) && seen.insert(edge.target) {
                    out.push(s.node(edge.target)?);
                }
            }
            Ok(out)
        })
    }

    /// Sources of incoming edges whose kind is in `kinds`, each node once.
    pub fn parents(&self, id: NodeId, kinds: &[RelationKind]) -> GraphResult<Vec<Node>> {
        self.read("parents", |s| {
            let mut seen = BTreeSet::new();
            let mut out = Vec::new();
            for edge in s.incoming(id)? {
                if (kinds.is_empty() || kinds.contains(&edge.kind)) && seen.insert(edge.source) {
                    out.push(s.node(edge.source)?);
                }
            }
            Ok(out)
        })
    }

    /// Number of CLASS nodes directly extending or implementing `id`.
    pub fn nb_variants(&self, id: NodeId) -> GraphResult<usize> {
        Ok(self
            .children(id, &RelationKind::INHERITANCE)?
            .iter()
            .filter(|n| n.has_label(Label::CLASS))
            .count())
    }

    /// The CLASS node with an EXTENDS edge to the node named `name`.
    pub fn superclass_of(&self, name: &str) -> GraphResult<Option<Node>> {
        Ok(self
            .supertypes_of(name, RelationKind::Extends, Label::CLASS)?
            .into_iter()
            .next())
    }

    /// INTERFACE nodes with an IMPLEMENTS edge to the node named `name`.
    pub fn implemented_interfaces_of(&self, name: &str) -> GraphResult<Vec<Node>> {
        self.supertypes_of(name, RelationKind::Implements, Label::INTERFACE)
    }

    fn supertypes_of(
        &self,
        name: &str,
        kind: RelationKind,
        label: Label,
    ) -> GraphResult<Vec<Node>> {
        self.read("supertypes_of", |s| {
            let mut out = Vec::new();
            for id in s.nodes_named(name)? {
                for edge in s.incoming(id)? {
                    if edge.kind != kind {
                        continue;
                    }
                    let parent = s.node(edge.source)?;
                    if parent.has_label(label) {
                        out.push(parent);
                    }
                }
            }
            Ok(out)
        })
    }

    /// Every edge matching `pattern`, in edge creation order.
    pub fn run_query(&self, pattern: &HopPattern) -> GraphResult<Vec<HopRow>> {
        self.read("run_query", |s| {
            let mut cache: HashMap<NodeId, Node> = HashMap::new();
            let mut rows = Vec::new();
            for edge in s.edges()? {
                if !pattern.accepts_kind(edge.kind) {
                    continue;
                }
                let source = cached(s, &mut cache, edge.source)?;
                if !pattern.source.matches(&source) {
                    continue;
                }
                let target = cached(s, &mut cache, edge.target)?;
                if !pattern.target.matches(&target) {
                    continue;
                }
                rows.push(HopRow {
                    source,
                    kind: edge.kind,
                    target,
                });
            }
            Ok(rows)
        })
    }

    /// For each distinct name among the outgoing neighbours of `id` that
    /// carry `label`, the number of distinct such neighbours with that name.
    /// Singletons are included with a count of 1. Sorted by name.
    pub fn count_same_name_children(&self, id: NodeId, label: Label) -> GraphResult<Vec<NameCount>> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for child in self.children(id, &[])? {
            if child.has_label(label) {
                *counts.entry(child.name).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(name, number)| NameCount { name, number })
            .collect())
    }

    /// Nodes reachable from `start` through `kind` edges, `start` included.
    pub fn reachable(&self, start: NodeId, kind: RelationKind) -> GraphResult<Vec<NodeId>> {
        self.read("reachable", |s| s.reachable(start, kind))
    }

    pub fn summary(&self) -> GraphResult<GraphSummary> {
        self.read("summary", |s| {
            let edges = s.edges()?;
            Ok(GraphSummary {
                nodes: s.node_ids()?.len(),
                relationships: edges.len(),
                inheritance: edges
                    .iter()
                    .filter(|e| RelationKind::INHERITANCE.contains(&e.kind))
                    .count(),
                compositions: edges
                    .iter()
                    .filter(|e| e.kind == RelationKind::Instantiate)
                    .count(),
            })
        })
    }

    /// Remove every node and edge.
    pub fn clear(&mut self) -> GraphResult<()> {
        self.write("clear", |s| s.clear())
    }
}

fn cached<S: GraphStore>(
    store: &S,
    cache: &mut HashMap<NodeId, Node>,
    id: NodeId,
) -> StoreResult<Node> {
    if let Some(node) = cache.get(&id) {
        return Ok(node.clone());
    }
    let node = store.node(id)?;
    cache.insert(id, node.clone());
    Ok(node)
}
