// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::state::NodeStateTable;

#[derive(Debug, Clone, Copy)]
struct BandEntry {
    time: f64,
    node: usize,
}

impl PartialEq for BandEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BandEntry {}

impl PartialOrd for BandEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BandEntry {
    // Reversed so the max-heap yields the smallest time, then the smallest node id.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// The narrow band: a binary min-heap of (time, node) with lazy invalidation.
///
/// A node may have several entries at once; the state table is authoritative and
/// entries that no longer match it are dropped on pop. Equal times pop in order
/// of increasing flat node index.
#[derive(Debug, Default)]
pub struct NarrowBand {
    heap: BinaryHeap<BandEntry>,
    pushes: u64,
    stale: u64,
}

impl NarrowBand {
    /// Empty band.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty band with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        NarrowBand {
            heap: BinaryHeap::with_capacity(capacity),
            pushes: 0,
            stale: 0,
        }
    }

    /// Insert an entry.
    pub fn push(&mut self, node: usize, time: f64) {
        self.pushes += 1;
        self.heap.push(BandEntry { time, node });
    }

    /// Remove and return the valid entry with the smallest time, skipping stale ones.
    pub fn pop_min(&mut self, state: &NodeStateTable) -> Option<(usize, f64)> {
        while let Some(entry) = self.heap.pop() {
            if state.is_accepted(entry.node) || entry.time != state.time(entry.node) {
                self.stale += 1;
                continue;
            }
            return Some((entry.node, entry.time));
        }
        None
    }

    /// Time of the smallest entry, stale or not.
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.time)
    }

    /// True when no entries remain.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of entries, including stale ones not yet discarded.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Total entries pushed so far.
    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    /// Total stale entries discarded so far.
    pub fn stale_pops(&self) -> u64 {
        self.stale
    }
}
