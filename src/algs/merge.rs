//! Hypercube merge of packed interval graphs.
//!
//! Over `ceil(log2 P)` rounds, partitions pair up by the schedule in
//! [`hypercube`](crate::algs::hypercube): senders ship their packed graph,
//! receivers concatenate it after their own and resolve every exit whose
//! paired entry now lives in the merged graph. A resolved exit whose entry
//! already reaches the exit's own label closes a cycle. Every round ends with
//! a logical-OR reduction of the cycle flag on all partitions.

use serde::Serialize;

use crate::algs::communicator::{Communicator, CycleCommTags, Wait};
use crate::algs::hypercube::{RoundRole, ceil_log2, clear_last_b, round_role};
use crate::algs::wire::{WireGraphHeader, cast_slice, decode_records, expect_exact_len};
use crate::cycle_error::CycleError;
use crate::data::packed_graph::PackedIntervalGraph;
use crate::debug_invariants::DebugInvariants;
use crate::topology::vertex::{Label, PartitionId};

/// Outcome of one merge step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// All owned exits were wired in; `resolved` of them.
    Merged { resolved: usize },
    /// Exit `exit` points at entry `entry`, which already reaches `exit`.
    Cycle { exit: Label, entry: Label },
}

/// Resolve, on the concatenated graph of receiver `z` in round `h`, every
/// live exit whose pairing partition is now merged into `z`.
///
/// Entries reaching a resolved exit inherit copies of the paired entry's
/// intervals; the exit and the entry are then deleted. The caller compacts.
pub fn merge_step(
    graph: &mut PackedIntervalGraph,
    z: PartitionId,
    h: u32,
) -> Result<StepOutcome, CycleError> {
    let lut = graph.entry_lut();
    let mut resolved = 0;

    for x in 0..graph.exits().len() {
        if graph.exit_is_dead(x) {
            continue;
        }
        let exit = graph.exits()[x];
        if clear_last_b(exit.adj_assn, h) != z {
            continue;
        }
        let entr = graph
            .find_entry(&lut, exit.adj_label, exit.label)
            .ok_or(CycleError::MissingEntry {
                exit: exit.label,
                entry: exit.adj_label,
            })?;

        if graph.chain_contains(entr, exit.label)? {
            log::debug!(
                "rank {z} round {h}: entry {} reaches its own exit {}",
                exit.adj_label,
                exit.label
            );
            return Ok(StepOutcome::Cycle {
                exit: exit.label,
                entry: exit.adj_label,
            });
        }

        let spans = graph.interval_chain(entr)?;
        if !spans.is_empty() {
            for e in 0..graph.entries().len() {
                if e == entr || graph.entry_is_dead(e) || !graph.chain_contains(e, exit.label)? {
                    continue;
                }
                graph.append_copies(e, &spans)?;
            }
        }

        graph.kill_exit(x);
        graph.kill_entry(entr);
        resolved += 1;
    }

    log::debug!(
        "rank {z} round {h}: resolved {resolved} exits, {} splices pending",
        graph.pending_splices().len()
    );
    Ok(StepOutcome::Merged { resolved })
}

/// Ship `graph` to `to`: the size header first, then the body.
pub fn send_graph<C: Communicator>(
    comm: &C,
    to: PartitionId,
    graph: &PackedIntervalGraph,
    tags: &CycleCommTags,
) -> Result<(), CycleError> {
    let (header, body) = graph.encode()?;
    let sizes = comm.isend(
        to,
        tags.graph_sizes.as_u16(),
        cast_slice(std::slice::from_ref(&header)),
    );
    let data = comm.isend(to, tags.graph_data.as_u16(), &body);
    let _ = sizes.wait();
    let _ = data.wait();
    Ok(())
}

/// Receive a packed graph from `from`, sizing the body buffer from the header.
pub fn recv_graph<C: Communicator>(
    comm: &C,
    from: PartitionId,
    tags: &CycleCommTags,
) -> Result<PackedIntervalGraph, CycleError> {
    let header_len = std::mem::size_of::<WireGraphHeader>();
    let mut hbuf = vec![0u8; header_len];
    let raw = comm
        .irecv(from, tags.graph_sizes.as_u16(), &mut hbuf)
        .wait()
        .ok_or_else(|| CycleError::comm(from, "failed to receive graph sizes"))?;
    expect_exact_len(raw.len(), header_len)?;
    let header = decode_records::<WireGraphHeader>(&raw)?[0];

    let body_len = header.body_bytes()?;
    let mut bbuf = vec![0u8; body_len];
    let body = comm
        .irecv(from, tags.graph_data.as_u16(), &mut bbuf)
        .wait()
        .ok_or_else(|| CycleError::comm(from, "failed to receive graph body"))?;
    PackedIntervalGraph::decode(&header, &body)
}

/// A cycle closed during the merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MergeCycle {
    pub exit: Label,
    pub entry: Label,
    pub round: u32,
}

#[derive(Clone, Debug)]
pub struct MergeOutcome {
    /// `true` if any partition closed a cycle.
    pub cycle_found: bool,
    /// The cycle this partition closed, if it did.
    pub witness: Option<MergeCycle>,
    pub rounds_completed: u32,
    pub rounds_planned: u32,
    /// Graph still held here; `None` once it was sent away.
    pub graph: Option<PackedIntervalGraph>,
}

/// Run the hypercube merge starting from this partition's packed graph.
pub fn hypercube_merge<C: Communicator>(
    comm: &C,
    graph: PackedIntervalGraph,
    tags: &CycleCommTags,
    check_invariants: bool,
) -> Result<MergeOutcome, CycleError> {
    let z = comm.rank();
    let parts = comm.size();
    let rounds_planned = ceil_log2(parts);
    let mut held = Some(graph);
    let mut witness = None;
    let mut rounds_completed = 0;
    let mut cycle_found = false;

    for h in 0..rounds_planned {
        let role = round_role(z, h, parts);
        log::debug!("rank {z} round {h}: {role:?}");
        match (role, held.take()) {
            (RoundRole::Receive { from }, Some(mine)) => {
                let theirs = recv_graph(comm, from, tags)?;
                let mut merged = mine.concat(theirs)?;
                if let StepOutcome::Cycle { exit, entry } = merge_step(&mut merged, z, h)? {
                    witness = Some(MergeCycle { exit, entry, round: h });
                }
                let next = merged.compacted()?;
                if check_invariants {
                    next.validate_invariants()?;
                } else {
                    next.debug_assert_invariants();
                }
                held = Some(next);
            }
            (RoundRole::Send { to }, Some(mine)) => {
                send_graph(comm, to, &mine, tags)?;
            }
            (RoundRole::Receive { .. } | RoundRole::Send { .. }, None) => {
                return Err(CycleError::comm(
                    z,
                    format!("round {h} scheduled a partition that already sent its graph"),
                ));
            }
            (RoundRole::Idle | RoundRole::Inactive, g) => held = g,
        }

        rounds_completed = h + 1;
        if comm.allreduce_or(witness.is_some())? {
            cycle_found = true;
            break;
        }
    }

    Ok(MergeOutcome {
        cycle_found,
        witness,
        rounds_completed,
        rounds_planned,
        graph: held,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{CommTag, NoComm};
    use crate::data::packed_graph::PackedIntervalGraph;

    // header + entries + exits + intervals as flat words
    fn graph(words: &[i64]) -> PackedIntervalGraph {
        PackedIntervalGraph::from_words(words).unwrap()
    }

    #[test]
    fn two_partition_ring_closes_in_round_zero() {
        // p0 owns {0,1}: 0 -> 1 -> 2; entry 0 (from 3) reaches exit 1
        let p0 = graph(&[1, 1, 1, 0, 3, 1, 0, 1, 2, 1, -1, 1, 1, -1]);
        // p1 owns {2,3}: 2 -> 3 -> 0; entry 2 (from 1) reaches exit 3
        let p1 = graph(&[1, 1, 1, 2, 1, 0, 0, 3, 0, 0, -1, 3, 3, -1]);
        let mut g = p0.concat(p1).unwrap();
        assert_eq!(
            merge_step(&mut g, 0, 0).unwrap(),
            StepOutcome::Cycle { exit: 3, entry: 0 }
        );
    }

    #[test]
    fn chain_without_return_resolves() {
        // 0 -> 1 | 2 -> 3, single trans-arc 1 -> 2
        let p0 = graph(&[0, 1, 0, 1, 2, 1, -1]);
        let p1 = graph(&[1, 0, 0, 2, 1, 0, -1]);
        let mut g = p0.concat(p1).unwrap();
        assert_eq!(merge_step(&mut g, 0, 0).unwrap(), StepOutcome::Merged { resolved: 1 });
        let c = g.compacted().unwrap();
        assert_eq!((c.entries().len(), c.exits().len()), (0, 0));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let mut g = graph(&[0, 1, 0, 1, 2, 1, -1]);
        assert!(matches!(
            merge_step(&mut g, 0, 0),
            Err(CycleError::MissingEntry { exit: 1, entry: 2 })
        ));
    }

    #[test]
    fn exits_to_unmerged_partitions_stay() {
        // exit 1 -> 8 on partition 2 is not owned by receiver 0 in round 0
        let mut g = graph(&[0, 1, 0, 1, 8, 2, -1]);
        assert_eq!(merge_step(&mut g, 0, 0).unwrap(), StepOutcome::Merged { resolved: 0 });
        assert_eq!(g.live_exits(), 1);
    }

    #[test]
    fn single_partition_has_no_rounds() {
        let tags = CycleCommTags::from_base(CommTag::new(0x10));
        let out = hypercube_merge(&NoComm, PackedIntervalGraph::default(), &tags, true).unwrap();
        assert_eq!((out.rounds_planned, out.rounds_completed), (0, 0));
        assert!(!out.cycle_found);
        assert!(out.graph.is_some());
    }
}
