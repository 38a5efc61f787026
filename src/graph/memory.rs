//! In-process graph store on top of petgraph.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, EdgeFiltered, EdgeRef};
use petgraph::Direction;

use crate::model::{Label, Node, NodeId, Property, RelationKind, Value};

use super::error::{StoreError, StoreResult};
use super::store::{Edge, GraphStore};

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    labels: BTreeSet<Label>,
    properties: BTreeMap<Property, Value>,
}

/// Property graph held in memory. Always available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: StableDiGraph<NodeData, RelationKind>,
    by_name: HashMap<String, Vec<NodeIndex>>,
    by_simple_name: HashMap<String, Vec<NodeIndex>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, id: NodeId) -> StoreResult<NodeIndex> {
        let idx = NodeIndex::new(id.0 as usize);
        if self.graph.contains_node(idx) {
            Ok(idx)
        } else {
            Err(StoreError::UnknownNode(id))
        }
    }

    fn data_mut(&mut self, id: NodeId) -> StoreResult<&mut NodeData> {
        let idx = self.index(id)?;
        self.graph
            .node_weight_mut(idx)
            .ok_or(StoreError::UnknownNode(id))
    }

    fn edges_of(&self, id: NodeId, direction: Direction) -> StoreResult<Vec<Edge>> {
        let idx = self.index(id)?;
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                (
                    e.id(),
                    Edge {
                        source: to_id(e.source()),
                        target: to_id(e.target()),
                        kind: *e.weight(),
                    },
                )
            })
            .collect();
        edges.sort_by_key(|(edge_id, _)| *edge_id);
        Ok(edges.into_iter().map(|(_, e)| e).collect())
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn to_id(idx: NodeIndex) -> NodeId {
    NodeId(idx.index() as u32)
}

impl GraphStore for MemoryStore {
    fn create_node(&mut self, name: &str, labels: &[Label]) -> StoreResult<NodeId> {
        let idx = self.graph.add_node(NodeData {
            name: name.to_string(),
            labels: labels.iter().copied().collect(),
            properties: BTreeMap::new(),
        });
        self.by_name.entry(name.to_string()).or_default().push(idx);
        self.by_simple_name
            .entry(simple_name(name).to_string())
            .or_default()
            .push(idx);
        Ok(to_id(idx))
    }

    fn node(&self, id: NodeId) -> StoreResult<Node> {
        let idx = self.index(id)?;
        let data = self
            .graph
            .node_weight(idx)
            .ok_or(StoreError::UnknownNode(id))?;
        Ok(Node {
            id,
            name: data.name.clone(),
            labels: data.labels.clone(),
            properties: data.properties.clone(),
        })
    }

    fn node_ids(&self) -> StoreResult<Vec<NodeId>> {
        Ok(self.graph.node_indices().map(to_id).collect())
    }

    fn nodes_named(&self, name: &str) -> StoreResult<Vec<NodeId>> {
        Ok(self
            .by_name
            .get(name)
            .map(|ids| ids.iter().copied().map(to_id).collect())
            .unwrap_or_default())
    }

    fn nodes_with_simple_name(&self, simple: &str) -> StoreResult<Vec<NodeId>> {
        Ok(self
            .by_simple_name
            .get(simple)
            .map(|ids| ids.iter().copied().map(to_id).collect())
            .unwrap_or_default())
    }

    fn add_labels(&mut self, id: NodeId, labels: &[Label]) -> StoreResult<()> {
        let data = self.data_mut(id)?;
        data.labels.extend(labels.iter().copied());
        Ok(())
    }

    fn set_property(&mut self, id: NodeId, prop: Property, value: Value) -> StoreResult<()> {
        let data = self.data_mut(id)?;
        data.properties.insert(prop, value);
        Ok(())
    }

    fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: RelationKind,
    ) -> StoreResult<()> {
        let a = self.index(source)?;
        let b = self.index(target)?;
        self.graph.add_edge(a, b, kind);
        Ok(())
    }

    fn outgoing(&self, id: NodeId) -> StoreResult<Vec<Edge>> {
        self.edges_of(id, Direction::Outgoing)
    }

    fn incoming(&self, id: NodeId) -> StoreResult<Vec<Edge>> {
        self.edges_of(id, Direction::Incoming)
    }

    fn edges(&self) -> StoreResult<Vec<Edge>> {
        Ok(self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                let kind = *self.graph.edge_weight(e)?;
                Some(Edge {
                    source: to_id(a),
                    target: to_id(b),
                    kind,
                })
            })
            .collect())
    }

    fn reachable(&self, start: NodeId, kind: RelationKind) -> StoreResult<Vec<NodeId>> {
        let start = self.index(start)?;
        let filtered = EdgeFiltered::from_fn(&self.graph, |e| *e.weight() == kind);
        let mut bfs = Bfs::new(&filtered, start);
        let mut out = Vec::new();
        while let Some(idx) = bfs.next(&filtered) {
            out.push(to_id(idx));
        }
        Ok(out)
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.graph.clear();
        self.by_name.clear();
        self.by_simple_name.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_named_in_creation_order() {
        let mut store = MemoryStore::new();
        let a = store.create_node("draw", &[Label::METHOD]).unwrap();
        let _ = store.create_node("paint", &[Label::METHOD]).unwrap();
        let b = store.create_node("draw", &[Label::METHOD]).unwrap();
        assert_eq!(store.nodes_named("draw").unwrap(), vec![a, b]);
        assert!(store.nodes_named("missing").unwrap().is_empty());
    }

    #[test]
    fn test_outgoing_edges_keep_creation_order() {
        let mut store = MemoryStore::new();
        let p = store.create_node("a.P", &[Label::CLASS]).unwrap();
        let c1 = store.create_node("a.C1", &[Label::CLASS]).unwrap();
        let c2 = store.create_node("a.C2", &[Label::CLASS]).unwrap();
        store.create_edge(p, c1, RelationKind::Extends).unwrap();
        store.create_edge(p, c2, RelationKind::Instantiate).unwrap();
        let targets: Vec<_> = store.outgoing(p).unwrap().iter().map(|e| e.target).collect();
        assert_eq!(targets, vec![c1, c2]);
        assert_eq!(store.incoming(c2).unwrap()[0].source, p);
    }

    #[test]
    fn test_reachable_follows_only_requested_kind() {
        let mut store = MemoryStore::new();
        let a = store.create_node("a", &[Label::CLASS]).unwrap();
        let b = store.create_node("b", &[Label::CLASS]).unwrap();
        let c = store.create_node("c", &[Label::CLASS]).unwrap();
        let d = store.create_node("d", &[Label::CLASS]).unwrap();
        store.create_edge(a, b, RelationKind::Instantiate).unwrap();
        store.create_edge(b, c, RelationKind::Instantiate).unwrap();
        store.create_edge(c, a, RelationKind::Instantiate).unwrap();
        store.create_edge(a, d, RelationKind::Extends).unwrap();
        let mut reached = store.reachable(a, RelationKind::Instantiate).unwrap();
        reached.sort();
        assert_eq!(reached, vec![a, b, c]);
    }

    #[test]
    fn test_unknown_node_is_reported() {
        let store = MemoryStore::new();
        assert_eq!(
            store.node(NodeId(3)).unwrap_err(),
            StoreError::UnknownNode(NodeId(3))
        );
    }

    #[test]
    fn test_clear_resets_index() {
        let mut store = MemoryStore::new();
        store.create_node("a.A", &[Label::CLASS]).unwrap();
        store.clear().unwrap();
        assert!(store.node_ids().unwrap().is_empty());
        assert!(store.nodes_named("a.A").unwrap().is_empty());
        assert!(store.nodes_with_simple_name("A").unwrap().is_empty());
    }

    #[test]
    fn test_simple_name_index() {
        let mut store = MemoryStore::new();
        let circle = store.create_node("a.b.Circle", &[Label::CLASS]).unwrap();
        let _ = store.create_node("a.b.Square", &[Label::CLASS]).unwrap();
        let other = store.create_node("c.Circle", &[Label::CLASS]).unwrap();
        let bare = store.create_node("Circle", &[Label::METHOD]).unwrap();
        assert_eq!(
            store.nodes_with_simple_name("Circle").unwrap(),
            vec![circle, other, bare]
        );
        assert!(store.nodes_with_simple_name("b.Circle").unwrap().is_empty());
    }
}
