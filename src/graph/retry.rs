//! Bounded retry around store operations.

use std::thread;
use std::time::Duration;

use tracing::warn;

use super::error::{GraphError, GraphResult, StoreResult};

/// How many times a store operation is attempted, and how long to wait
/// between attempts while the store reports itself unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Retries without sleeping. Used by tests and in-process stores.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Run `op`, retrying transient failures up to `max_attempts` times.
    ///
    /// Non-transient errors are returned on first occurrence.
    pub fn run<T, F>(&self, operation: &'static str, mut op: F) -> GraphResult<T>
    where
        F: FnMut() -> StoreResult<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => {
                    return Err(GraphError::Store {
                        operation,
                        source: e,
                    })
                }
                Err(e) if attempt >= attempts => {
                    return Err(GraphError::Exhausted {
                        operation,
                        attempts,
                        last: e,
                    })
                }
                Err(e) => {
                    warn!(
                        "Waiting for graph store to be ready ({}, attempt {}/{}): {}",
                        operation, attempt, attempts, e
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StoreError;
    use crate::model::NodeId;

    #[test]
    fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::immediate(5);
        let mut calls = 0;
        let result = policy.run("probe", || {
            calls += 1;
            if calls < 3 {
                Err(StoreError::Unavailable("starting".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let policy = RetryPolicy::immediate(4);
        let mut calls = 0;
        let result: GraphResult<()> = policy.run("probe", || {
            calls += 1;
            Err(StoreError::Unavailable("down".into()))
        });
        assert_eq!(calls, 4);
        match result {
            Err(GraphError::Exhausted { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_non_transient_error_is_not_retried() {
        let policy = RetryPolicy::immediate(10);
        let mut calls = 0;
        let result: GraphResult<()> = policy.run("probe", || {
            calls += 1;
            Err(StoreError::UnknownNode(NodeId(7)))
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(GraphError::Store { .. })));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let mut calls = 0;
        let _ = policy.run("probe", || {
            calls += 1;
            Ok::<_, StoreError>(())
        });
        assert_eq!(calls, 1);
    }
}
