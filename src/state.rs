// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{EikonalError, Result};

/// Lifecycle of a node during a march. Only ever advances Far -> Considered -> Accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Not yet reached by the front.
    Far,
    /// In the narrow band with a tentative time.
    Considered,
    /// Final; the time will not change again.
    Accepted,
}

/// Columnar per-node solver state, indexed by flat node id.
#[derive(Debug, Clone)]
pub struct NodeStateTable {
    time: Vec<f64>,
    status: Vec<NodeStatus>,
    accepted: usize,
}

impl NodeStateTable {
    /// All nodes Far with time +inf.
    pub fn new(num_nodes: usize) -> Self {
        NodeStateTable {
            time: vec![f64::INFINITY; num_nodes],
            status: vec![NodeStatus::Far; num_nodes],
            accepted: 0,
        }
    }

    /// Number of nodes in the table.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// True for a table without nodes.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Current (tentative or final) time of a node.
    #[inline]
    pub fn time(&self, node: usize) -> f64 {
        self.time[node]
    }

    /// Current status of a node.
    #[inline]
    pub fn status(&self, node: usize) -> NodeStatus {
        self.status[node]
    }

    /// Shorthand for `status(node) == Accepted`.
    #[inline]
    pub fn is_accepted(&self, node: usize) -> bool {
        self.status[node] == NodeStatus::Accepted
    }

    /// Number of Accepted nodes.
    pub fn accepted_count(&self) -> usize {
        self.accepted
    }

    /// Freeze a node at `time`.
    ///
    /// # Errors
    /// Returns an invariant violation if the node was already Accepted or the
    /// time is negative or NaN.
    pub fn set_accepted(&mut self, node: usize, time: f64) -> Result<()> {
        if self.status[node] == NodeStatus::Accepted {
            return Err(EikonalError::InvariantViolation {
                node,
                reason: format!(
                    "accepted twice (held {}, offered {})",
                    self.time[node], time
                ),
            });
        }
        if time.is_nan() || time < 0.0 {
            return Err(EikonalError::InvariantViolation {
                node,
                reason: format!("accepted with invalid time {}", time),
            });
        }
        self.time[node] = time;
        self.status[node] = NodeStatus::Accepted;
        self.accepted += 1;
        Ok(())
    }

    /// Lower a non-Accepted node's time to `candidate` if it improves on it.
    /// Returns true if the update succeeded; the caller must then push the node
    /// into the narrow band.
    pub fn try_decrease(&mut self, node: usize, candidate: f64) -> bool {
        if self.status[node] == NodeStatus::Accepted || !candidate.is_finite() {
            return false;
        }
        if candidate < self.time[node] {
            self.time[node] = candidate;
            self.status[node] = NodeStatus::Considered;
            true
        } else {
            false
        }
    }

    /// Consume the table and return the time column.
    pub fn into_times(self) -> Vec<f64> {
        self.time
    }

    /// Reset every node that never reached Accepted back to +inf.
    /// Returns how many nodes were reset.
    pub(crate) fn discard_unaccepted(&mut self) -> usize {
        let mut count = 0;
        for (t, s) in self.time.iter_mut().zip(self.status.iter()) {
            if *s != NodeStatus::Accepted {
                *t = f64::INFINITY;
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_far_and_infinite() {
        let table = NodeStateTable::new(5);
        assert_eq!(table.len(), 5);
        for node in 0..5 {
            assert_eq!(table.status(node), NodeStatus::Far);
            assert!(table.time(node).is_infinite());
        }
        assert_eq!(table.accepted_count(), 0);
    }

    #[test]
    fn try_decrease_monotonicity() {
        let mut table = NodeStateTable::new(4);

        // Start at infinity, decrease
        assert!(table.try_decrease(1, 10.0));
        assert_eq!(table.status(1), NodeStatus::Considered);
        assert_eq!(table.time(1), 10.0);

        assert!(table.try_decrease(1, 5.0));
        assert_eq!(table.time(1), 5.0);

        // Increase is rejected
        assert!(!table.try_decrease(1, 7.0));
        assert_eq!(table.time(1), 5.0);

        // So is an equal value
        assert!(!table.try_decrease(1, 5.0));

        // Non-finite candidates never reach the band
        assert!(!table.try_decrease(2, f64::INFINITY));
        assert!(!table.try_decrease(2, f64::NAN));
        assert_eq!(table.status(2), NodeStatus::Far);
    }

    #[test]
    fn accepted_nodes_are_frozen() {
        let mut table = NodeStateTable::new(3);
        assert!(table.try_decrease(0, 2.0));
        table.set_accepted(0, 2.0).unwrap();
        assert!(table.is_accepted(0));
        assert_eq!(table.accepted_count(), 1);

        assert!(!table.try_decrease(0, 1.0));
        assert_eq!(table.time(0), 2.0);
    }

    #[test]
    fn double_accept_is_an_invariant_violation() {
        let mut table = NodeStateTable::new(3);
        table.set_accepted(2, 0.0).unwrap();
        let err = table.set_accepted(2, 1.0).unwrap_err();
        assert!(matches!(
            err,
            EikonalError::InvariantViolation { node: 2, .. }
        ));
    }

    #[test]
    fn negative_time_is_an_invariant_violation() {
        let mut table = NodeStateTable::new(1);
        assert!(table.set_accepted(0, -1.0).is_err());
        assert!(table.set_accepted(0, f64::NAN).is_err());
        assert_eq!(table.status(0), NodeStatus::Far);
    }

    #[test]
    fn discard_unaccepted_resets_considered() {
        let mut table = NodeStateTable::new(3);
        table.set_accepted(0, 0.0).unwrap();
        table.try_decrease(1, 4.0);
        assert_eq!(table.discard_unaccepted(), 2);
        let times = table.into_times();
        assert_eq!(times[0], 0.0);
        assert!(times[1].is_infinite());
        assert!(times[2].is_infinite());
    }
}
