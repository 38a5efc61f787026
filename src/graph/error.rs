//! Graph store errors.

use thiserror::Error;

use crate::model::NodeId;

/// Failure reported by a storage backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot serve requests yet. Retried by the façade.
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

impl StoreError {
    /// Whether the operation is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Error returned by [`super::Graph`] operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{operation}: graph store still unavailable after {attempts} attempts ({last})")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        last: StoreError,
    },

    #[error("{operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type GraphResult<T> = Result<T, GraphError>;
