//! Storage backend contract.

use crate::model::{Label, Node, NodeId, Property, RelationKind, Value};

use super::error::StoreResult;

/// A directed, typed edge between two stored nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: RelationKind,
}

/// Primitive operations a property-graph backend provides.
///
/// Listing operations return nodes and edges in creation order. Any
/// operation may fail with [`super::StoreError::Unavailable`] while the
/// backend is not ready; the façade retries those.
pub trait GraphStore {
    fn create_node(&mut self, name: &str, labels: &[Label]) -> StoreResult<NodeId>;

    fn node(&self, id: NodeId) -> StoreResult<Node>;

    fn node_ids(&self) -> StoreResult<Vec<NodeId>>;

    /// Ids of every node named exactly `name`.
    fn nodes_named(&self, name: &str) -> StoreResult<Vec<NodeId>>;

    /// Ids of every node whose name ends with `simple` after its last `.`,
    /// in creation order.
    fn nodes_with_simple_name(&self, simple: &str) -> StoreResult<Vec<NodeId>>;

    fn add_labels(&mut self, id: NodeId, labels: &[Label]) -> StoreResult<()>;

    fn set_property(&mut self, id: NodeId, prop: Property, value: Value) -> StoreResult<()>;

    fn create_edge(&mut self, source: NodeId, target: NodeId, kind: RelationKind)
        -> StoreResult<()>;

    fn outgoing(&self, id: NodeId) -> StoreResult<Vec<Edge>>;

    fn incoming(&self, id: NodeId) -> StoreResult<Vec<Edge>>;

    fn edges(&self) -> StoreResult<Vec<Edge>>;

    /// Nodes reachable from `start` following `kind` edges, `start` included.
    fn reachable(&self, start: NodeId, kind: RelationKind) -> StoreResult<Vec<NodeId>>;

    fn clear(&mut self) -> StoreResult<()>;
}
