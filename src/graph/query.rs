//! Declarative single-hop pattern queries.
//!
//! A [`HopPattern`] reads as `(source)-[kinds]->(target)` with label
//! constraints on both ends. The detectors and the serializer express their
//! graph rules with it instead of hand-walking adjacency lists.

use crate::model::{Label, Node, RelationKind};

/// Label constraints on one end of a hop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    /// Every one of these must be present.
    pub all: Vec<Label>,
    /// At least one of these must be present (ignored when empty).
    pub any: Vec<Label>,
    /// None of these may be present.
    pub none: Vec<Label>,
}

impl NodeFilter {
    /// Matches every node.
    pub fn any_node() -> Self {
        Self::default()
    }

    pub fn with(label: Label) -> Self {
        Self {
            all: vec![label],
            ..Self::default()
        }
    }

    pub fn one_of(labels: &[Label]) -> Self {
        Self {
            any: labels.to_vec(),
            ..Self::default()
        }
    }

    /// Class or interface.
    pub fn types() -> Self {
        Self::one_of(&[Label::CLASS, Label::INTERFACE])
    }

    pub fn and(mut self, label: Label) -> Self {
        self.all.push(label);
        self
    }

    pub fn without(mut self, label: Label) -> Self {
        self.none.push(label);
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.all.iter().all(|l| node.has_label(*l))
            && (self.any.is_empty() || self.any.iter().any(|l| node.has_label(*l)))
            && !self.none.iter().any(|l| node.has_label(*l))
    }
}

/// `(source)-[kinds]->(target)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopPattern {
    pub source: NodeFilter,
    /// Accepted relation kinds; empty accepts every kind.
    pub kinds: Vec<RelationKind>,
    pub target: NodeFilter,
}

impl HopPattern {
    pub fn new(source: NodeFilter, kinds: &[RelationKind], target: NodeFilter) -> Self {
        Self {
            source,
            kinds: kinds.to_vec(),
            target,
        }
    }

    pub fn accepts_kind(&self, kind: RelationKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// One match of a [`HopPattern`].
#[derive(Debug, Clone, PartialEq)]
pub struct HopRow {
    pub source: Node,
    pub kind: RelationKind,
    pub target: Node,
}
