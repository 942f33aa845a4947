//! Entry/exit ("express") vertices of one partition.
//!
//! Every locally originated trans-arc yields an *exit* vertex labelled by its
//! tail; every trans-arc arriving here yields an *entry* vertex labelled by its
//! head, carrying the reachable set of that local head vertex. Both keep the
//! opposite endpoint as their pairing `(adj_label, adj_assn)`, so an exit is
//! matched to exactly one entry by `(label, adj_label)` and never by label alone.

use std::ops::Range;

use crate::cycle_error::CycleError;
use crate::topology::interval::IntervalSet;
use crate::topology::local_graph::LocalGraph;
use crate::topology::vertex::{Label, PartitionId, TransArc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpressVertex {
    pub label: Label,
    /// Label at the other end of the trans-arc.
    pub adj_label: Label,
    /// Partition owning `adj_label`.
    pub adj_assn: PartitionId,
    /// Exit labels reachable from this vertex; always empty for exits.
    pub reach: IntervalSet,
}

impl ExpressVertex {
    fn key(&self) -> (Label, Label) {
        (self.label, self.adj_label)
    }
}

/// Half-open range of `items` (sorted by `f`) whose key equals `key`.
pub(crate) fn equal_range<T, K: Ord>(items: &[T], key: &K, f: impl Fn(&T) -> K) -> Range<usize> {
    let bound = |strict: bool| {
        let (mut lo, mut hi) = (0usize, items.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let k = f(&items[mid]);
            let go_right = if strict { k <= *key } else { k < *key };
            if go_right {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    };
    bound(false)..bound(true)
}

/// Entry and exit vertices of one partition, each sorted by `(label, adj_label)`.
#[derive(Clone, Debug, Default)]
pub struct ExpressGraph {
    rank: PartitionId,
    entries: Vec<ExpressVertex>,
    exits: Vec<ExpressVertex>,
}

impl ExpressGraph {
    /// Build from this partition's analysed graph and both trans-arc sets.
    ///
    /// `graph` must already carry the reachable sets computed by
    /// [`analyze`](crate::algs::reachability::analyze).
    pub fn build(
        graph: &LocalGraph,
        outgoing: &[TransArc],
        incoming: &[TransArc],
    ) -> Result<Self, CycleError> {
        let rank = graph.rank();

        let mut exits = Vec::with_capacity(outgoing.len());
        for arc in outgoing {
            if arc.tail_assn != rank {
                return Err(CycleError::LabelOffPartition {
                    label: arc.tail,
                    partition: arc.tail_assn,
                    rank,
                });
            }
            exits.push(ExpressVertex {
                label: arc.tail,
                adj_label: arc.head,
                adj_assn: arc.head_assn,
                reach: IntervalSet::new(),
            });
        }

        let mut entries = Vec::with_capacity(incoming.len());
        for arc in incoming {
            let idx = graph.local_index(arc.head)?;
            entries.push(ExpressVertex {
                label: arc.head,
                adj_label: arc.tail,
                adj_assn: arc.tail_assn,
                reach: graph.vertices()[idx].reach().clone(),
            });
        }

        entries.sort_by_key(ExpressVertex::key);
        exits.sort_by_key(ExpressVertex::key);
        entries.dedup_by(|a, b| a.key() == b.key());
        exits.dedup_by(|a, b| a.key() == b.key());

        log::debug!(
            "rank {rank}: express graph with {} entries, {} exits",
            entries.len(),
            exits.len()
        );
        Ok(Self {
            rank,
            entries,
            exits,
        })
    }

    pub fn rank(&self) -> PartitionId {
        self.rank
    }

    pub fn entries(&self) -> &[ExpressVertex] {
        &self.entries
    }

    pub fn exits(&self) -> &[ExpressVertex] {
        &self.exits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::reachability::analyze;
    use crate::config::ReachMode;
    use crate::topology::interval::Interval;
    use crate::topology::vertex::{OutArc, Vertex};

    #[test]
    fn equal_range_finds_runs() {
        let v = [1, 3, 3, 3, 7];
        assert_eq!(equal_range(&v, &3, |&x| x), 1..4);
        assert_eq!(equal_range(&v, &4, |&x| x), 4..4);
        assert_eq!(equal_range(&v, &9, |&x| x), 5..5);
        assert_eq!(equal_range::<i32, i32>(&[], &0, |&x| x), 0..0);
    }

    #[test]
    fn entries_carry_head_reach() {
        // partition 1 of 2 owns {2, 3}: 2 -> 3 -> 0 (trans)
        let verts = vec![
            Vertex::new(2, vec![OutArc::new(3, 1)]),
            Vertex::new(3, vec![OutArc::new(0, 0)]),
        ];
        let mut g = LocalGraph::new(1, 2, verts).unwrap();
        let a = analyze(&mut g, ReachMode::Convex, true).unwrap();
        let incoming = [TransArc::new(1, 2, 0, 1)];
        let x = ExpressGraph::build(&g, &a.trans_arcs, &incoming).unwrap();

        assert_eq!(x.exits().len(), 1);
        assert_eq!((x.exits()[0].label, x.exits()[0].adj_label), (3, 0));
        assert_eq!(x.entries().len(), 1);
        let e = &x.entries()[0];
        assert_eq!((e.label, e.adj_label, e.adj_assn), (2, 1, 0));
        assert_eq!(e.reach.hull(), Some(Interval::point(3)));
    }

    #[test]
    fn shared_exit_labels_sort_by_head() {
        let verts = vec![Vertex::new(0, vec![OutArc::new(1, 1), OutArc::new(2, 2)])];
        let mut g = LocalGraph::new(0, 3, verts).unwrap();
        let a = analyze(&mut g, ReachMode::Convex, true).unwrap();
        let x = ExpressGraph::build(&g, &a.trans_arcs, &[]).unwrap();
        let keys: Vec<_> = x.exits().iter().map(|v| (v.label, v.adj_label)).collect();
        assert_eq!(keys, [(0, 1), (0, 2)]);
    }

    #[test]
    fn incoming_head_must_be_local() {
        let g = LocalGraph::new(0, 2, vec![Vertex::new(0, Vec::new())]).unwrap();
        let incoming = [TransArc::new(1, 1, 1, 0)];
        assert!(ExpressGraph::build(&g, &[], &incoming).is_err());
    }
}
