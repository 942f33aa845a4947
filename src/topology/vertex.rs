//! Vertex, arc and trans-arc records of one graph partition.

use serde::{Deserialize, Serialize};

use crate::topology::interval::{Interval, IntervalSet};

/// Global vertex label. Labels are unique across all partitions.
pub type Label = u64;

/// Index of a partition (one per cooperating process).
pub type PartitionId = usize;

/// Outgoing arc of a vertex: the head label and the partition owning it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutArc {
    pub head: Label,
    pub assn: PartitionId,
}

impl OutArc {
    pub fn new(head: Label, assn: PartitionId) -> Self {
        Self { head, assn }
    }

    /// An arc is local iff its head lives on `rank`.
    #[inline]
    pub fn is_local(&self, rank: PartitionId) -> bool {
        self.assn == rank
    }
}

/// Traversal state of a vertex during local reachability analysis.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Finished; at least one trans-arc tail is reachable.
    Black = 0,
    /// Not yet visited.
    #[default]
    White = 1,
    /// Finished; no trans-arc is reachable.
    Green = 2,
    /// On the active traversal path.
    Red = 3,
}

/// A vertex owned by exactly one partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vertex {
    pub label: Label,
    pub alist: Vec<OutArc>,
    reach: IntervalSet,
}

impl Vertex {
    pub fn new(label: Label, alist: Vec<OutArc>) -> Self {
        Self {
            label,
            alist,
            reach: IntervalSet::new(),
        }
    }

    /// Number of outgoing arcs.
    #[inline]
    pub fn arcs(&self) -> usize {
        self.alist.len()
    }

    /// Convex hull `[C0, C1]` of reachable trans-arc tail labels, if any.
    pub fn interval(&self) -> Option<Interval> {
        self.reach.hull()
    }

    /// Lower bound of the reachable interval, `-1` when unset.
    pub fn c0(&self) -> i64 {
        self.interval().map_or(-1, |iv| iv.c0 as i64)
    }

    /// Upper bound of the reachable interval, `-1` when unset.
    pub fn c1(&self) -> i64 {
        self.interval().map_or(-1, |iv| iv.c1 as i64)
    }

    /// Full reachable set; a single span unless the analysis ran in exact mode.
    pub fn reach(&self) -> &IntervalSet {
        &self.reach
    }

    pub(crate) fn reach_mut(&mut self) -> &mut IntervalSet {
        &mut self.reach
    }
}

/// A directed arc whose endpoints live on different partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransArc {
    pub tail: Label,
    pub head: Label,
    pub tail_assn: PartitionId,
    pub head_assn: PartitionId,
}

impl TransArc {
    pub fn new(tail: Label, head: Label, tail_assn: PartitionId, head_assn: PartitionId) -> Self {
        Self {
            tail,
            head,
            tail_assn,
            head_assn,
        }
    }
}
