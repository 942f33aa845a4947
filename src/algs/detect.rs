//! End-to-end distributed cycle detection.
//!
//! Every partition calls [`detect_cycle`] with its own slice of the graph and
//! a communicator of the same world. Phases run in lock-step:
//!
//! 1. `local_cycles`: reachability analysis; a local back arc anywhere ends
//!    the run after one reduction.
//! 2. `discovery`: trans-arcs move to the owners of their heads.
//! 3. `express`: entry/exit vertices are built.
//! 4. `pack`: they are packed into an interval graph.
//! 5. `merge`: the hypercube merge.
//!
//! The outcome is reduced over all partitions, so every rank returns the same
//! `cycle_found`.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::algs::communicator::{CommTag, Communicator, CycleCommTags};
use crate::algs::express::ExpressGraph;
use crate::algs::hypercube::ceil_log2;
use crate::algs::merge::hypercube_merge;
use crate::algs::reachability::analyze;
use crate::algs::transarc_exchange::exchange_trans_arcs;
use crate::config::DetectConfig;
use crate::cycle_error::CycleError;
use crate::data::packed_graph::PackedIntervalGraph;
use crate::debug_invariants::DebugInvariants;
use crate::topology::local_graph::LocalGraph;
use crate::topology::vertex::Label;

/// Wall-clock duration of one phase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhaseTiming {
    pub phase: &'static str,
    pub seconds: f64,
}

/// Records phase durations between successive marks.
#[derive(Debug)]
pub struct PhaseTimer {
    last: Instant,
    marks: Vec<PhaseTiming>,
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Close the phase that started at the previous mark.
    pub fn mark(&mut self, phase: &'static str) -> Duration {
        let now = Instant::now();
        let took = now - self.last;
        self.last = now;
        self.marks.push(PhaseTiming {
            phase,
            seconds: took.as_secs_f64(),
        });
        took
    }

    pub fn timings(&self) -> &[PhaseTiming] {
        &self.marks
    }

    pub fn into_timings(self) -> Vec<PhaseTiming> {
        self.marks
    }
}

/// Evidence for a reported cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CycleWitness {
    /// Back arc found by the local traversal.
    Local { tail: Label, head: Label },
    /// Exit `exit` points at entry `entry`, which reaches `exit` after round `round`.
    Merge { exit: Label, entry: Label, round: u32 },
}

/// Per-partition result of a detection run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub rank: usize,
    pub parts: usize,
    /// Global verdict; identical on every partition.
    pub cycle_found: bool,
    /// Set only on the partition that found the cycle.
    pub witness: Option<CycleWitness>,
    pub rounds_completed: u32,
    pub rounds_planned: u32,
    pub trans_arcs_out: usize,
    pub trans_arcs_in: usize,
    pub timings: Vec<PhaseTiming>,
}

impl CycleReport {
    pub fn result_line(&self) -> &'static str {
        if self.cycle_found {
            "RESULT: A cycle was found!"
        } else {
            "RESULT: No cycles were found."
        }
    }

    /// One `TIME` line per phase.
    pub fn timing_lines(&self) -> Vec<String> {
        self.timings
            .iter()
            .map(|t| format!("TIME {:>14}: {:12.6} s", t.phase, t.seconds))
            .collect()
    }

    pub fn total_seconds(&self) -> f64 {
        self.timings.iter().map(|t| t.seconds).sum()
    }
}

/// Detect whether the partitioned graph contains a directed cycle.
///
/// `graph` must be partition `comm.rank()` of `comm.size()`. Colors and
/// reachable sets of `graph` are overwritten.
pub fn detect_cycle<C: Communicator>(
    comm: &C,
    graph: &mut LocalGraph,
    cfg: &DetectConfig,
) -> Result<CycleReport, CycleError> {
    cfg.validate()?;
    let rank = comm.rank();
    let parts = comm.size();
    if graph.rank() != rank || graph.parts() != parts {
        return Err(CycleError::InvalidInput(format!(
            "graph is partition {} of {} but communicator is rank {rank} of {parts}",
            graph.rank(),
            graph.parts()
        )));
    }
    if graph.is_empty() {
        log::warn!("rank {rank}: partition holds no vertices");
    }
    if cfg.validate_input {
        graph.validate_invariants()?;
    }
    let tags = CycleCommTags::from_base(CommTag::new(cfg.tag_base));
    let mut timer = PhaseTimer::new();
    let mut report = CycleReport {
        rank,
        parts,
        cycle_found: false,
        witness: None,
        rounds_completed: 0,
        rounds_planned: ceil_log2(parts),
        trans_arcs_out: 0,
        trans_arcs_in: 0,
        timings: Vec::new(),
    };

    let local = analyze(graph, cfg.reach_mode, cfg.stop_at_first_local_cycle)?;
    report.witness = local
        .cycle
        .map(|(tail, head)| CycleWitness::Local { tail, head });
    let any_local = comm.allreduce_or(local.has_cycle())?;
    timer.mark("local_cycles");

    if any_local {
        if rank == 0 {
            log::info!("local cycle found; skipping the merge");
        }
        report.cycle_found = true;
        report.timings = timer.into_timings();
        finish(&report);
        return Ok(report);
    }

    let outgoing = local.trans_arcs;
    let incoming = exchange_trans_arcs(comm, &outgoing, &tags)?;
    report.trans_arcs_out = outgoing.len();
    report.trans_arcs_in = incoming.len();
    timer.mark("discovery");

    let express = ExpressGraph::build(graph, &outgoing, &incoming)?;
    timer.mark("express");

    let packed = PackedIntervalGraph::from_express(&express)?;
    if cfg.check_invariants {
        packed.validate_invariants()?;
    }
    log::debug!(
        "rank {rank}: packed graph of {} words",
        packed.wire_len_words()
    );
    timer.mark("pack");

    let merged = hypercube_merge(comm, packed, &tags, cfg.check_invariants)?;
    report.rounds_completed = merged.rounds_completed;
    report.witness = merged.witness.map(|m| CycleWitness::Merge {
        exit: m.exit,
        entry: m.entry,
        round: m.round,
    });
    report.cycle_found = comm.allreduce_or(merged.cycle_found)?;
    timer.mark("merge");

    report.timings = timer.into_timings();
    finish(&report);
    Ok(report)
}

fn finish(report: &CycleReport) {
    if let Some(w) = &report.witness {
        log::info!("rank {}: cycle witness {w:?}", report.rank);
    }
    if report.rank == 0 {
        log::info!("{}", report.result_line());
        for line in report.timing_lines() {
            log::info!("{line}");
        }
    }
}
