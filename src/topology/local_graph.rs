//! One partition's slice of the global graph.
//!
//! Partition `r` of `parts` owns the contiguous label range
//! `[r * num, (r + 1) * num)`. Within the range labels may be laid out in any
//! order; [`LocalGraph::local_index`] maps a label back to its slot.

use hashbrown::HashMap;

use crate::cycle_error::CycleError;
use crate::debug_invariants::DebugInvariants;
use crate::topology::vertex::{Color, Label, PartitionId, Vertex};

#[derive(Clone, Debug)]
enum LabelIndex {
    /// `label == base + index` for every vertex.
    Linear,
    Table(HashMap<Label, u32>),
}

/// The vertices owned by one partition plus their traversal colors.
#[derive(Clone, Debug)]
pub struct LocalGraph {
    rank: PartitionId,
    parts: usize,
    vertices: Vec<Vertex>,
    colors: Vec<Color>,
    index: LabelIndex,
}

impl LocalGraph {
    /// Wrap `vertices` as partition `rank` of `parts`.
    ///
    /// The slot of a vertex is its position in `vertices`; labels must be
    /// unique.
    pub fn new(
        rank: PartitionId,
        parts: usize,
        vertices: Vec<Vertex>,
    ) -> Result<Self, CycleError> {
        if parts == 0 || rank >= parts {
            return Err(CycleError::InvalidInput(format!(
                "rank {rank} is not a partition of {parts}"
            )));
        }
        let base = (rank * vertices.len()) as Label;
        let linear = vertices
            .iter()
            .enumerate()
            .all(|(i, v)| v.label == base + i as Label);
        let index = if linear {
            LabelIndex::Linear
        } else {
            let mut table = HashMap::with_capacity(vertices.len());
            for (i, v) in vertices.iter().enumerate() {
                if table.insert(v.label, i as u32).is_some() {
                    return Err(CycleError::InvalidInput(format!(
                        "duplicate label {} on rank {rank}",
                        v.label
                    )));
                }
            }
            LabelIndex::Table(table)
        };
        let colors = vec![Color::White; vertices.len()];
        Ok(Self {
            rank,
            parts,
            vertices,
            colors,
            index,
        })
    }

    #[inline]
    pub fn rank(&self) -> PartitionId {
        self.rank
    }

    /// Number of partitions the global graph is split into.
    #[inline]
    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Vertices per partition.
    #[inline]
    pub fn num(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// First label of this partition's range.
    #[inline]
    pub fn base_label(&self) -> Label {
        (self.rank * self.num()) as Label
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [Vertex], &mut [Color]) {
        (&mut self.vertices, &mut self.colors)
    }

    /// Partition owning `label`, or `None` for an empty partition layout.
    pub fn owner_of(&self, label: Label) -> Option<PartitionId> {
        match self.num() {
            0 => None,
            num => Some((label / num as Label) as PartitionId),
        }
    }

    /// Map a label of this partition to its slot.
    pub fn local_index(&self, label: Label) -> Result<usize, CycleError> {
        match self.owner_of(label) {
            Some(p) if p == self.rank => {}
            Some(p) => {
                return Err(CycleError::LabelOffPartition {
                    label,
                    partition: p,
                    rank: self.rank,
                });
            }
            None => {
                return Err(CycleError::UnknownLabel {
                    label,
                    rank: self.rank,
                });
            }
        }
        let idx = match &self.index {
            LabelIndex::Linear => Some((label - self.base_label()) as usize),
            LabelIndex::Table(t) => t.get(&label).map(|&i| i as usize),
        };
        match idx {
            Some(i) if self.vertices.get(i).is_some_and(|v| v.label == label) => Ok(i),
            _ => Err(CycleError::UnknownLabel {
                label,
                rank: self.rank,
            }),
        }
    }

    /// Forget colors and reachable sets from a previous analysis.
    pub fn reset_analysis(&mut self) {
        self.colors.fill(Color::White);
        for v in &mut self.vertices {
            v.reach_mut().clear();
        }
    }
}

impl DebugInvariants for LocalGraph {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "LocalGraph");
    }

    fn validate_invariants(&self) -> Result<(), CycleError> {
        if self.colors.len() != self.vertices.len() {
            return Err(CycleError::CountMismatch {
                what: "color slots",
                expected: self.vertices.len(),
                actual: self.colors.len(),
            });
        }
        for v in &self.vertices {
            self.local_index(v.label)?;
            for a in &v.alist {
                if a.assn >= self.parts {
                    return Err(CycleError::InvalidInput(format!(
                        "arc ({}, {}) assigned to partition {} of {}",
                        v.label, a.head, a.assn, self.parts
                    )));
                }
                if a.is_local(self.rank) {
                    self.local_index(a.head)?;
                } else if let Some(owner) = self.owner_of(a.head)
                    && owner != a.assn
                {
                    return Err(CycleError::LabelOffPartition {
                        label: a.head,
                        partition: owner,
                        rank: a.assn,
                    });
                }
            }
        }
        Ok(())
    }
}
