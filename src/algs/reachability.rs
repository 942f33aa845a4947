//! Local reachability analysis of one partition.
//!
//! A depth-first traversal colors every vertex and computes, bottom-up, the
//! set of trans-arc tail labels it can reach through local arcs. Re-entering
//! a vertex that is still on the traversal path (RED) closes a local cycle.
//!
//! The traversal uses an explicit `(vertex, next_arc)` stack, so partition
//! size is not bounded by the thread's stack depth.

use crate::config::ReachMode;
use crate::cycle_error::CycleError;
use crate::topology::interval::Interval;
use crate::topology::local_graph::LocalGraph;
use crate::topology::vertex::{Color, Label, TransArc};

/// Result of analysing one partition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalAnalysis {
    /// Trans-arcs leaving this partition, sorted and deduplicated.
    pub trans_arcs: Vec<TransArc>,
    /// First local back arc `(tail, head)` encountered, if any.
    pub cycle: Option<(Label, Label)>,
}

impl LocalAnalysis {
    pub fn has_cycle(&self) -> bool {
        self.cycle.is_some()
    }
}

/// Color every vertex of `graph` and fill in its reachable set.
///
/// With `stop_at_first_cycle` the traversal returns as soon as a back arc is
/// found; colors and reachable sets are then partial.
pub fn analyze(
    graph: &mut LocalGraph,
    mode: ReachMode,
    stop_at_first_cycle: bool,
) -> Result<LocalAnalysis, CycleError> {
    graph.reset_analysis();
    let rank = graph.rank();
    let mut out = LocalAnalysis::default();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..graph.num() {
        if graph.colors()[root] != Color::White {
            continue;
        }
        graph.parts_mut().1[root] = Color::Red;
        stack.push((root, 0));

        while let Some((v, i)) = stack.pop() {
            let Some(arc) = graph.vertices()[v].alist.get(i).copied() else {
                finish(graph, v, mode);
                if let Some(&(parent, _)) = stack.last() {
                    fold_child(graph, parent, v);
                }
                continue;
            };
            stack.push((v, i + 1));

            if !arc.is_local(rank) {
                let tail = graph.vertices()[v].label;
                out.trans_arcs.push(TransArc::new(tail, arc.head, rank, arc.assn));
                graph.parts_mut().0[v].reach_mut().insert(Interval::point(tail));
                continue;
            }

            let w = graph.local_index(arc.head)?;
            match graph.colors()[w] {
                Color::White => {
                    graph.parts_mut().1[w] = Color::Red;
                    stack.push((w, 0));
                }
                Color::Red => {
                    let tail = graph.vertices()[v].label;
                    log::debug!("rank {rank}: local back arc ({tail}, {})", arc.head);
                    out.cycle.get_or_insert((tail, arc.head));
                    if stop_at_first_cycle {
                        return Ok(out);
                    }
                }
                Color::Black => fold_child(graph, v, w),
                Color::Green => {}
            }
        }
    }

    out.trans_arcs.sort_unstable();
    out.trans_arcs.dedup();
    log::debug!(
        "rank {rank}: {} vertices analysed, {} trans-arcs out, local cycle: {}",
        graph.num(),
        out.trans_arcs.len(),
        out.has_cycle()
    );
    Ok(out)
}

fn finish(graph: &mut LocalGraph, v: usize, mode: ReachMode) {
    let (verts, colors) = graph.parts_mut();
    let reach = verts[v].reach_mut();
    if mode == ReachMode::Convex {
        reach.make_convex();
    }
    colors[v] = if reach.is_empty() {
        Color::Green
    } else {
        Color::Black
    };
}

fn fold_child(graph: &mut LocalGraph, parent: usize, child: usize) {
    if parent == child {
        return;
    }
    let (verts, _) = graph.parts_mut();
    if verts[child].reach().is_empty() {
        return;
    }
    let reach = verts[child].reach().clone();
    verts[parent].reach_mut().union_with(&reach);
}
