//! Input graph generators.
//!
//! Each generator builds the slice of a global `n`-vertex graph owned by
//! partition `rank` of `parts`: the contiguous label range
//! `[rank * num, (rank + 1) * num)` with `num = n / parts`.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cycle_error::CycleError;
use crate::topology::local_graph::LocalGraph;
use crate::topology::vertex::{Label, OutArc, PartitionId, Vertex};

/// Vertices per partition; `n` must split evenly.
pub fn partition_size(n: usize, parts: usize) -> Result<usize, CycleError> {
    if parts == 0 || n % parts != 0 {
        return Err(CycleError::InvalidInput(format!(
            "{n} vertices do not divide evenly over {parts} partitions"
        )));
    }
    Ok(n / parts)
}

fn exact_sqrt(v: usize, what: &str) -> Result<usize, CycleError> {
    let r = (v as f64).sqrt().round() as usize;
    if r * r != v {
        return Err(CycleError::InvalidInput(format!("{what} ({v}) must be a square")));
    }
    Ok(r)
}

/// Chain `0 -> 1 -> ... -> n-1`, optionally closed by `n-1 -> 0`.
pub fn linear(
    n: usize,
    rank: PartitionId,
    parts: usize,
    with_cycle: bool,
) -> Result<LocalGraph, CycleError> {
    let num = partition_size(n, parts)?;
    let base = rank * num;
    let verts = (base..base + num)
        .map(|l| {
            let arcs = if l + 1 < n {
                vec![OutArc::new((l + 1) as Label, (l + 1) / num)]
            } else if with_cycle {
                vec![OutArc::new(0, 0)]
            } else {
                Vec::new()
            };
            Vertex::new(l as Label, arcs)
        })
        .collect();
    LocalGraph::new(rank, parts, verts)
}

/// One ring per partition; no trans-arcs.
pub fn local_cycles(n: usize, rank: PartitionId, parts: usize) -> Result<LocalGraph, CycleError> {
    let num = partition_size(n, parts)?;
    let base = rank * num;
    let verts = (0..num)
        .map(|i| {
            let next = base + (i + 1) % num;
            Vertex::new((base + i) as Label, vec![OutArc::new(next as Label, rank)])
        })
        .collect();
    LocalGraph::new(rank, parts, verts)
}

/// Label of block-local cell `(row, col)`: boundary cells clockwise from the
/// top-left corner, then interior cells row-major.
pub fn lattice_label(offset: usize, row: usize, col: usize, n_row: usize, n_col: usize) -> Label {
    let lab = if row == 0 {
        col
    } else if col == n_col - 1 {
        n_col + row - 1
    } else if row == n_row - 1 {
        2 * n_col + n_row - col - 3
    } else if col == 0 {
        2 * (n_col + n_row) - row - 4
    } else {
        2 * (n_row + n_col) - 4 + (row - 1) * (n_col - 2) + (col - 1)
    };
    (offset + lab) as Label
}

/// A `sqrt(parts) x sqrt(parts)` grid of partitions, each a
/// `sqrt(num) x sqrt(num)` grid with arcs right and down. With `with_cycle`
/// the bottom-right vertex of the last partition points back at label 0.
pub fn lattice(
    n: usize,
    rank: PartitionId,
    parts: usize,
    with_cycle: bool,
) -> Result<LocalGraph, CycleError> {
    let num = partition_size(n, parts)?;
    let p_col = exact_sqrt(parts, "partition count")?;
    let side = exact_sqrt(num, "vertices per partition")?;
    if side == 0 {
        return LocalGraph::new(rank, parts, Vec::new());
    }
    let (my_row, my_col) = (rank / p_col, rank % p_col);
    let offset = rank * num;
    let label = |off: usize, r: usize, c: usize| lattice_label(off, r, c, side, side);

    let mut verts = Vec::with_capacity(num);
    for i in 0..num {
        let (row, col) = (i / side, i % side);
        let mut arcs = Vec::with_capacity(3);
        if col + 1 < side {
            arcs.push(OutArc::new(label(offset, row, col + 1), rank));
        }
        if row + 1 < side {
            arcs.push(OutArc::new(label(offset, row + 1, col), rank));
        }
        if col + 1 == side && my_col + 1 < p_col {
            arcs.push(OutArc::new(label(offset + num, row, 0), rank + 1));
        }
        if row + 1 == side && my_row + 1 < p_col {
            arcs.push(OutArc::new(label(offset + p_col * num, 0, col), rank + p_col));
        }
        if with_cycle && rank + 1 == parts && row + 1 == side && col + 1 == side {
            arcs.push(OutArc::new(0, 0));
        }
        verts.push(Vertex::new(label(offset, row, col), arcs));
    }
    LocalGraph::new(rank, parts, verts)
}

/// Random DAG: every vertex but the last gets `arcs_per_vertex` arcs to
/// uniformly drawn higher labels. `with_cycle` adds `n-1 -> 0`.
pub fn random_dag(
    n: usize,
    rank: PartitionId,
    parts: usize,
    arcs_per_vertex: usize,
    seed: u64,
    with_cycle: bool,
) -> Result<LocalGraph, CycleError> {
    let num = partition_size(n, parts)?;
    let base = rank * num;
    let mut rng = SmallRng::seed_from_u64(seed ^ (rank as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let verts = (base..base + num)
        .map(|l| {
            let mut arcs: Vec<OutArc> = if l + 1 < n {
                (0..arcs_per_vertex)
                    .map(|_| {
                        let head = rng.gen_range(l + 1..n);
                        OutArc::new(head as Label, head / num)
                    })
                    .collect()
            } else {
                Vec::new()
            };
            if with_cycle && l + 1 == n {
                arcs.push(OutArc::new(0, 0));
            }
            Vertex::new(l as Label, arcs)
        })
        .collect();
    LocalGraph::new(rank, parts, verts)
}

/// Partition `rank`'s slice of an explicit global arc list.
pub fn from_edges(
    n: usize,
    rank: PartitionId,
    parts: usize,
    edges: &[(Label, Label)],
) -> Result<LocalGraph, CycleError> {
    let num = partition_size(n, parts)?;
    let base = (rank * num) as Label;
    let mut verts: Vec<Vertex> = (0..num as Label)
        .map(|i| Vertex::new(base + i, Vec::new()))
        .collect();
    for &(tail, head) in edges {
        if tail >= n as Label || head >= n as Label {
            return Err(CycleError::InvalidInput(format!(
                "arc ({tail}, {head}) outside {n} vertices"
            )));
        }
        if (tail / num as Label) as PartitionId == rank {
            verts[(tail - base) as usize]
                .alist
                .push(OutArc::new(head, (head / num as Label) as PartitionId));
        }
    }
    LocalGraph::new(rank, parts, verts)
}

/// The built-in input families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InputGraph {
    Lattice,
    Linear,
    LocalCycles,
    RandomDag,
}

impl InputGraph {
    /// Human-readable name for the run banner.
    pub fn name(self, with_cycle: bool) -> &'static str {
        match (self, with_cycle) {
            (InputGraph::Lattice, true) => "Lattice with cycle",
            (InputGraph::Lattice, false) => "Lattice with no cycle",
            (InputGraph::Linear, true) => "Linear with cycle",
            (InputGraph::Linear, false) => "Linear with no cycle",
            (InputGraph::LocalCycles, _) => "LocalCycles",
            (InputGraph::RandomDag, true) => "Random DAG with cycle",
            (InputGraph::RandomDag, false) => "Random DAG with no cycle",
        }
    }

    pub fn build(
        self,
        n: usize,
        rank: PartitionId,
        parts: usize,
        with_cycle: bool,
        seed: u64,
    ) -> Result<LocalGraph, CycleError> {
        match self {
            InputGraph::Lattice => lattice(n, rank, parts, with_cycle),
            InputGraph::Linear => linear(n, rank, parts, with_cycle),
            InputGraph::LocalCycles => local_cycles(n, rank, parts),
            InputGraph::RandomDag => random_dag(n, rank, parts, 2, seed, with_cycle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_invariants::DebugInvariants;

    #[test]
    fn lattice_labels_walk_the_boundary() {
        // 3x3 block: boundary 0..8 clockwise, centre 8
        let grid: Vec<Label> = (0..9).map(|i| lattice_label(0, i / 3, i % 3, 3, 3)).collect();
        assert_eq!(grid, vec![0, 1, 2, 7, 8, 3, 6, 5, 4]);
    }

    #[test]
    fn lattice_partitions_are_valid() {
        for rank in 0..4 {
            let g = lattice(64, rank, 4, true).unwrap();
            g.validate_invariants().unwrap();
            assert_eq!(g.num(), 16);
        }
    }

    #[test]
    fn lattice_needs_square_counts() {
        assert!(lattice(24, 0, 3, false).is_err());
        assert!(lattice(32, 0, 4, false).is_err());
    }

    #[test]
    fn linear_crosses_partitions() {
        let g = linear(8, 0, 2, false).unwrap();
        assert_eq!(g.vertices()[3].alist, vec![OutArc::new(4, 1)]);
        let g = linear(8, 1, 2, true).unwrap();
        assert_eq!(g.vertices()[3].alist, vec![OutArc::new(0, 0)]);
        assert!(linear(9, 0, 2, false).is_err());
    }

    #[test]
    fn random_dag_is_deterministic_and_forward() {
        let a = random_dag(64, 1, 4, 3, 7, false).unwrap();
        let b = random_dag(64, 1, 4, 3, 7, false).unwrap();
        assert_eq!(a.vertices(), b.vertices());
        for v in a.vertices() {
            assert!(v.alist.iter().all(|arc| arc.head > v.label));
        }
        a.validate_invariants().unwrap();
    }

    #[test]
    fn from_edges_keeps_own_tails() {
        let g = from_edges(4, 1, 2, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
        assert_eq!(g.vertices()[1].alist, vec![OutArc::new(0, 0)]);
        assert!(from_edges(4, 0, 2, &[(0, 9)]).is_err());
    }
}
