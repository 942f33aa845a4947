//! Packed entry/exit interval graph.
//!
//! Three append-only tables: entry records, exit records and interval
//! records. Each entry owns a private singly-linked chain of intervals,
//! threaded through the interval table by [`IntervalIdx`] positions. Deletion
//! only sets a dead flag; [`PackedIntervalGraph::compacted`] rebuilds the
//! tables with live rows only and renumbers intervals contiguously.
//!
//! The wire form is the flat integer layout
//!
//! ```text
//! header   entrNum exitNum intervalNum
//! entries  (label, adjLabel, adjPartition, firstIntervalIndex) * entrNum
//! exits    (label, adjLabel, adjPartition, -1)                 * exitNum
//! table    (C0, C1, nextIntervalIndex)                         * intervalNum
//! ```
//!
//! with `-1` terminating a chain.

use crate::algs::express::{ExpressGraph, ExpressVertex, equal_range};
use crate::algs::wire::{
    INTERVAL_WORDS, NIL, VERTEX_WORDS, WireGraphHeader, WireIntervalRecord, WireVertexRecord,
    cast_slice, decode_records, expect_exact_len,
};
use crate::cycle_error::CycleError;
use crate::debug_invariants::DebugInvariants;
use crate::topology::interval::{Interval, normalize};
use crate::topology::vertex::{Label, PartitionId};

/// Position of a record in the interval table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalIdx(u32);

impl IntervalIdx {
    /// Index as a table position.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    fn from_usize(i: usize) -> Result<Self, CycleError> {
        u32::try_from(i)
            .map(IntervalIdx)
            .map_err(|_| CycleError::WireFormat(format!("interval index {i} out of range")))
    }

    fn to_wire(idx: Option<IntervalIdx>) -> i64 {
        idx.map_or(NIL, |i| i64::from(i.0))
    }

    fn from_wire(raw: i64, len: usize, what: &str) -> Result<Option<Self>, CycleError> {
        match raw {
            NIL => Ok(None),
            i if i >= 0 && (i as usize) < len => Self::from_usize(i as usize).map(Some),
            i => Err(CycleError::WireFormat(format!(
                "{what} interval index {i} outside table of {len}"
            ))),
        }
    }
}

/// One entry or exit vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryRecord {
    /// Label of the vertex.
    pub label: Label,
    /// Label at the other end of its trans-arc.
    pub adj_label: Label,
    /// Partition that owned `adj_label` at discovery time.
    pub adj_assn: PartitionId,
    /// Head of the interval chain; always `None` for exits.
    pub first: Option<IntervalIdx>,
}

impl BoundaryRecord {
    fn of(v: &ExpressVertex) -> Self {
        Self {
            label: v.label,
            adj_label: v.adj_label,
            adj_assn: v.adj_assn,
            first: None,
        }
    }

    fn to_wire(self) -> WireVertexRecord {
        WireVertexRecord::new(
            self.label,
            self.adj_label,
            self.adj_assn,
            IntervalIdx::to_wire(self.first),
        )
    }
}

/// One `[C0, C1]` span and its chain successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalRecord {
    /// The closed label range.
    pub span: Interval,
    /// Next interval of the same chain.
    pub next: Option<IntervalIdx>,
}

/// Intervals appended to an entry chain since the last compaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Splice {
    /// Entry whose chain was extended.
    pub entry: usize,
    /// First appended interval.
    pub first: IntervalIdx,
}

/// Serializable, compactable entry/exit interval graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedIntervalGraph {
    entries: Vec<BoundaryRecord>,
    exits: Vec<BoundaryRecord>,
    intervals: Vec<IntervalRecord>,
    entry_dead: Vec<bool>,
    exit_dead: Vec<bool>,
    interval_dead: Vec<bool>,
    pending: Vec<Splice>,
}

impl PackedIntervalGraph {
    /// Pack an express graph: one chain per entry holding the spans of its
    /// reachable set; entries that reach nothing get an empty chain.
    pub fn from_express(express: &ExpressGraph) -> Result<Self, CycleError> {
        let mut g = Self::default();
        for v in express.entries() {
            let mut rec = BoundaryRecord::of(v);
            let mut prev: Option<usize> = None;
            for span in v.reach.iter() {
                let idx = IntervalIdx::from_usize(g.intervals.len())?;
                g.intervals.push(IntervalRecord {
                    span: *span,
                    next: None,
                });
                match prev {
                    Some(p) => g.intervals[p].next = Some(idx),
                    None => rec.first = Some(idx),
                }
                prev = Some(idx.get());
            }
            g.entries.push(rec);
        }
        g.exits = express.exits().iter().map(BoundaryRecord::of).collect();
        g.reset_masks();
        Ok(g)
    }

    fn reset_masks(&mut self) {
        self.entry_dead = vec![false; self.entries.len()];
        self.exit_dead = vec![false; self.exits.len()];
        self.interval_dead = vec![false; self.intervals.len()];
        self.pending.clear();
    }

    /// Entry records, dead ones included.
    pub fn entries(&self) -> &[BoundaryRecord] {
        &self.entries
    }

    /// Exit records, dead ones included.
    pub fn exits(&self) -> &[BoundaryRecord] {
        &self.exits
    }

    /// The interval table, dead rows included.
    pub fn intervals(&self) -> &[IntervalRecord] {
        &self.intervals
    }

    /// Chain extensions recorded since the last compaction.
    pub fn pending_splices(&self) -> &[Splice] {
        &self.pending
    }

    /// `true` if entry `i` has been deleted.
    pub fn entry_is_dead(&self, i: usize) -> bool {
        self.entry_dead.get(i).copied().unwrap_or(true)
    }

    /// `true` if exit `i` has been deleted.
    pub fn exit_is_dead(&self, i: usize) -> bool {
        self.exit_dead.get(i).copied().unwrap_or(true)
    }

    /// Number of deleted entries.
    pub fn dead_entries(&self) -> usize {
        self.entry_dead.iter().filter(|&&d| d).count()
    }

    /// Number of deleted exits.
    pub fn dead_exits(&self) -> usize {
        self.exit_dead.iter().filter(|&&d| d).count()
    }

    /// Number of deleted intervals.
    pub fn dead_intervals(&self) -> usize {
        self.interval_dead.iter().filter(|&&d| d).count()
    }

    /// Number of live entries.
    pub fn live_entries(&self) -> usize {
        self.entries.len() - self.dead_entries()
    }

    /// Number of live exits.
    pub fn live_exits(&self) -> usize {
        self.exits.len() - self.dead_exits()
    }

    /// Integers on the wire, header included.
    pub fn wire_len_words(&self) -> usize {
        3 + VERTEX_WORDS * (self.entries.len() + self.exits.len())
            + INTERVAL_WORDS * self.intervals.len()
    }

    // --- chains ---

    /// Positions of entry `entry`'s chain in link order.
    fn chain_indices(&self, entry: usize) -> Result<Vec<usize>, CycleError> {
        let rec = self.entries.get(entry).ok_or_else(|| {
            CycleError::WireFormat(format!("entry {entry} outside table of {}", self.entries.len()))
        })?;
        let mut out = Vec::new();
        let mut cur = rec.first;
        while let Some(idx) = cur {
            if out.len() >= self.intervals.len() {
                return Err(CycleError::WireFormat(format!(
                    "interval chain of entry {} loops",
                    rec.label
                )));
            }
            let i = idx.get();
            let ir = self.intervals.get(i).ok_or_else(|| {
                CycleError::WireFormat(format!("interval index {i} outside table"))
            })?;
            out.push(i);
            cur = ir.next;
        }
        Ok(out)
    }

    /// Live spans of entry `entry`'s chain, in link order.
    pub fn interval_chain(&self, entry: usize) -> Result<Vec<Interval>, CycleError> {
        Ok(self
            .chain_indices(entry)?
            .into_iter()
            .filter(|&i| !self.interval_dead[i])
            .map(|i| self.intervals[i].span)
            .collect())
    }

    /// `true` if a live interval of entry `entry`'s chain contains `label`.
    pub fn chain_contains(&self, entry: usize, label: Label) -> Result<bool, CycleError> {
        Ok(self
            .chain_indices(entry)?
            .into_iter()
            .any(|i| !self.interval_dead[i] && self.intervals[i].span.contains(label)))
    }

    /// Append copies of `spans` to the end of entry `entry`'s chain, skipping
    /// spans the chain already covers. Returns how many were appended.
    pub fn append_copies(&mut self, entry: usize, spans: &[Interval]) -> Result<usize, CycleError> {
        let chain = self.chain_indices(entry)?;
        let fresh: Vec<Interval> = spans
            .iter()
            .filter(|s| {
                !chain
                    .iter()
                    .any(|&i| !self.interval_dead[i] && self.intervals[i].span.covers(s))
            })
            .copied()
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let first = IntervalIdx::from_usize(self.intervals.len())?;
        for (k, span) in fresh.iter().enumerate() {
            let next = if k + 1 < fresh.len() {
                Some(IntervalIdx::from_usize(self.intervals.len() + 1)?)
            } else {
                None
            };
            self.intervals.push(IntervalRecord { span: *span, next });
            self.interval_dead.push(false);
        }
        match chain.last() {
            Some(&tail) => self.intervals[tail].next = Some(first),
            None => self.entries[entry].first = Some(first),
        }
        self.pending.push(Splice { entry, first });
        Ok(fresh.len())
    }

    // --- lookup ---

    /// Entry positions sorted by `(label, adj_label)`.
    pub fn entry_lut(&self) -> Vec<usize> {
        let mut lut: Vec<usize> = (0..self.entries.len()).collect();
        lut.sort_by_key(|&i| (self.entries[i].label, self.entries[i].adj_label));
        lut
    }

    /// The live entry `label` paired with exit `adj_label`.
    pub fn find_entry(&self, lut: &[usize], label: Label, adj_label: Label) -> Option<usize> {
        let key = (label, adj_label);
        let range = equal_range(lut, &key, |&i| {
            (self.entries[i].label, self.entries[i].adj_label)
        });
        lut[range].iter().copied().find(|&i| !self.entry_is_dead(i))
    }

    /// `true` if a live exit other than `except` carries `label`.
    pub fn has_live_exit_labelled(&self, label: Label, except: usize) -> bool {
        self.exits
            .iter()
            .enumerate()
            .any(|(i, x)| i != except && !self.exit_dead[i] && x.label == label)
    }

    // --- deletion ---

    /// Delete entry `i`.
    pub fn kill_entry(&mut self, i: usize) {
        if let Some(d) = self.entry_dead.get_mut(i) {
            *d = true;
        }
    }

    /// Delete exit `i`; when it was the last live exit with its label, trim
    /// that label from every interval bound it sits on.
    pub fn kill_exit(&mut self, i: usize) {
        let Some(label) = self.exits.get(i).map(|x| x.label) else {
            return;
        };
        self.exit_dead[i] = true;
        if self.has_live_exit_labelled(label, i) {
            return;
        }
        for (k, rec) in self.intervals.iter_mut().enumerate() {
            if self.interval_dead[k] || !rec.span.contains(label) {
                continue;
            }
            let Interval { c0, c1 } = rec.span;
            if c0 == c1 {
                self.interval_dead[k] = true;
            } else if c0 == label {
                rec.span.c0 = c0 + 1;
            } else if c1 == label {
                rec.span.c1 = c1 - 1;
            }
        }
    }

    // --- concatenation and compaction ---

    /// Append `other`'s tables after this graph's, re-basing its interval
    /// indices by this graph's interval count.
    pub fn concat(mut self, other: PackedIntervalGraph) -> Result<Self, CycleError> {
        let base = self.intervals.len();
        let rebase = |idx: Option<IntervalIdx>| -> Result<Option<IntervalIdx>, CycleError> {
            idx.map(|i| IntervalIdx::from_usize(i.get() + base)).transpose()
        };
        let entry_base = self.entries.len();

        for mut e in other.entries {
            e.first = rebase(e.first)?;
            self.entries.push(e);
        }
        self.exits.extend(other.exits);
        for mut r in other.intervals {
            r.next = rebase(r.next)?;
            self.intervals.push(r);
        }
        self.entry_dead.extend(other.entry_dead);
        self.exit_dead.extend(other.exit_dead);
        self.interval_dead.extend(other.interval_dead);
        for s in other.pending {
            self.pending.push(Splice {
                entry: s.entry + entry_base,
                first: IntervalIdx::from_usize(s.first.get() + base)?,
            });
        }
        Ok(self)
    }

    /// Rebuild with live rows only. Every live entry's chain is normalized
    /// (sorted, overlapping and adjacent spans coalesced) and laid out
    /// contiguously in entry order.
    pub fn compacted(&self) -> Result<Self, CycleError> {
        let mut g = Self::default();
        for (i, e) in self.entries.iter().enumerate() {
            if self.entry_dead[i] {
                continue;
            }
            let mut spans = self.interval_chain(i)?;
            normalize(&mut spans);
            let mut rec = *e;
            rec.first = None;
            if !spans.is_empty() {
                let start = g.intervals.len();
                rec.first = Some(IntervalIdx::from_usize(start)?);
                for (k, span) in spans.iter().enumerate() {
                    let next = if k + 1 < spans.len() {
                        Some(IntervalIdx::from_usize(start + k + 1)?)
                    } else {
                        None
                    };
                    g.intervals.push(IntervalRecord { span: *span, next });
                }
            }
            g.entries.push(rec);
        }
        g.exits = self
            .exits
            .iter()
            .enumerate()
            .filter(|&(i, _)| !self.exit_dead[i])
            .map(|(_, x)| *x)
            .collect();
        g.reset_masks();
        log::debug!(
            "compaction: entries {} -> {}, exits {} -> {}, intervals {} -> {}",
            self.entries.len(),
            g.entries.len(),
            self.exits.len(),
            g.exits.len(),
            self.intervals.len(),
            g.intervals.len()
        );
        Ok(g)
    }

    /// `true` if compaction would not change the graph.
    pub fn is_compact(&self) -> bool {
        if !self.pending.is_empty()
            || self.dead_entries() + self.dead_exits() + self.dead_intervals() > 0
        {
            return false;
        }
        let mut expected = 0usize;
        for e in &self.entries {
            let mut cur = e.first;
            let mut prev: Option<Interval> = None;
            while let Some(idx) = cur {
                if idx.get() != expected {
                    return false;
                }
                let Some(&rec) = self.intervals.get(idx.get()) else {
                    return false;
                };
                if let Some(p) = prev
                    && p.c1.saturating_add(1) >= rec.span.c0
                {
                    return false;
                }
                prev = Some(rec.span);
                expected += 1;
                cur = rec.next;
            }
        }
        expected == self.intervals.len()
    }

    // --- wire codec ---

    /// Size header of the wire form.
    pub fn header(&self) -> WireGraphHeader {
        WireGraphHeader::new(self.entries.len(), self.exits.len(), self.intervals.len())
    }

    /// Header and body bytes. Dead rows have no wire form, so a graph that is
    /// not compact is compacted first.
    pub fn encode(&self) -> Result<(WireGraphHeader, Vec<u8>), CycleError> {
        if !self.is_compact() {
            return self.compacted()?.encode();
        }
        let verts: Vec<WireVertexRecord> = self
            .entries
            .iter()
            .chain(self.exits.iter())
            .map(|r| r.to_wire())
            .collect();
        let table: Vec<WireIntervalRecord> = self
            .intervals
            .iter()
            .map(|r| WireIntervalRecord::new(r.span.c0, r.span.c1, IntervalIdx::to_wire(r.next)))
            .collect();
        let mut body = Vec::with_capacity(
            verts.len() * std::mem::size_of::<WireVertexRecord>()
                + table.len() * std::mem::size_of::<WireIntervalRecord>(),
        );
        body.extend_from_slice(cast_slice(&verts));
        body.extend_from_slice(cast_slice(&table));
        Ok((self.header(), body))
    }

    /// Rebuild from a header and body, rejecting out-of-range indices, exits
    /// that carry intervals, and intervals referenced more than once.
    pub fn decode(header: &WireGraphHeader, body: &[u8]) -> Result<Self, CycleError> {
        let (entr_num, exit_num, interval_num) = header.counts()?;
        expect_exact_len(body.len(), header.body_bytes()?)?;
        let split = (entr_num + exit_num) * std::mem::size_of::<WireVertexRecord>();
        let verts = decode_records::<WireVertexRecord>(&body[..split])?;
        let table = decode_records::<WireIntervalRecord>(&body[split..])?;

        let mut referenced = vec![false; interval_num];
        let mut claim = |idx: Option<IntervalIdx>| -> Result<(), CycleError> {
            if let Some(i) = idx {
                if referenced[i.get()] {
                    return Err(CycleError::WireFormat(format!(
                        "interval {} referenced more than once",
                        i.get()
                    )));
                }
                referenced[i.get()] = true;
            }
            Ok(())
        };

        let non_negative = |v: i64, what: &str| {
            u64::try_from(v).map_err(|_| CycleError::WireFormat(format!("negative {what} {v}")))
        };
        let mut g = Self::default();
        for (k, w) in verts.iter().enumerate() {
            let first = IntervalIdx::from_wire(w.interval(), interval_num, "vertex")?;
            let rec = BoundaryRecord {
                label: non_negative(w.label(), "label")?,
                adj_label: non_negative(w.adj_label(), "adjacent label")?,
                adj_assn: non_negative(w.adj_assn(), "partition")? as PartitionId,
                first,
            };
            if k < entr_num {
                claim(first)?;
                g.entries.push(rec);
            } else if first.is_some() {
                return Err(CycleError::WireFormat(format!(
                    "exit vertex {} carries an interval",
                    rec.label
                )));
            } else {
                g.exits.push(rec);
            }
        }
        for w in &table {
            let next = IntervalIdx::from_wire(w.next(), interval_num, "chain")?;
            claim(next)?;
            let c0 = non_negative(w.c0(), "interval bound")?;
            let c1 = non_negative(w.c1(), "interval bound")?;
            if c0 > c1 {
                return Err(CycleError::WireFormat(format!(
                    "interval bounds out of order: [{c0}, {c1}]"
                )));
            }
            g.intervals.push(IntervalRecord {
                span: Interval::new(c0, c1),
                next,
            });
        }
        g.reset_masks();
        Ok(g)
    }

    /// The flat integer form: header followed by the body words.
    pub fn to_words(&self) -> Result<Vec<i64>, CycleError> {
        let (header, body) = self.encode()?;
        let mut words = vec![
            i64::from_le(header.entr_num_le),
            i64::from_le(header.exit_num_le),
            i64::from_le(header.interval_num_le),
        ];
        words.extend(
            body.chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])),
        );
        Ok(words)
    }

    /// Inverse of [`to_words`](Self::to_words).
    pub fn from_words(words: &[i64]) -> Result<Self, CycleError> {
        if words.len() < 3 {
            return Err(CycleError::WireLength {
                expected: 3 * 8,
                actual: words.len() * 8,
            });
        }
        let header = WireGraphHeader {
            entr_num_le: words[0].to_le(),
            exit_num_le: words[1].to_le(),
            interval_num_le: words[2].to_le(),
        };
        let body: Vec<u8> = words[3..].iter().flat_map(|w| w.to_le_bytes()).collect();
        Self::decode(&header, &body)
    }
}

impl DebugInvariants for PackedIntervalGraph {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "PackedIntervalGraph");
    }

    fn validate_invariants(&self) -> Result<(), CycleError> {
        let masks = [
            ("entry dead-mask", self.entries.len(), self.entry_dead.len()),
            ("exit dead-mask", self.exits.len(), self.exit_dead.len()),
            ("interval dead-mask", self.intervals.len(), self.interval_dead.len()),
        ];
        for (what, expected, actual) in masks {
            if expected != actual {
                return Err(CycleError::CountMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }
        let mut referenced = vec![false; self.intervals.len()];
        let heads = self.entries.iter().map(|e| e.first);
        let links = self.intervals.iter().map(|r| r.next);
        for idx in heads.chain(links).flatten() {
            let slot = referenced.get_mut(idx.get()).ok_or_else(|| {
                CycleError::WireFormat(format!("interval index {} outside table", idx.get()))
            })?;
            if *slot {
                return Err(CycleError::WireFormat(format!(
                    "interval {} shared between chains",
                    idx.get()
                )));
            }
            *slot = true;
        }
        if let Some(x) = self.exits.iter().find(|x| x.first.is_some()) {
            return Err(CycleError::WireFormat(format!(
                "exit vertex {} carries an interval",
                x.label
            )));
        }
        for s in &self.pending {
            if s.entry >= self.entries.len() || s.first.get() >= self.intervals.len() {
                return Err(CycleError::WireFormat("pending splice out of range".into()));
            }
        }
        for i in 0..self.entries.len() {
            self.chain_indices(i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::interval::IntervalSet;

    fn entry(label: Label, adj: Label, assn: usize, spans: &[(Label, Label)]) -> ExpressVertex {
        ExpressVertex {
            label,
            adj_label: adj,
            adj_assn: assn,
            reach: IntervalSet::from_intervals(spans.iter().map(|&(a, b)| Interval::new(a, b))),
        }
    }

    fn packed(entries: Vec<ExpressVertex>, exits: Vec<ExpressVertex>) -> PackedIntervalGraph {
        let mut g = PackedIntervalGraph::default();
        for v in &entries {
            let chain = v.reach.as_slice().to_vec();
            g.entries.push(BoundaryRecord::of(v));
            g.entry_dead.push(false);
            let i = g.entries.len() - 1;
            g.append_copies(i, &chain).unwrap();
        }
        g.exits = exits.iter().map(BoundaryRecord::of).collect();
        g.exit_dead = vec![false; g.exits.len()];
        g.pending.clear();
        g
    }

    #[test]
    fn packing_is_compact() {
        let g = packed(
            vec![entry(2, 1, 0, &[(3, 3)]), entry(6, 5, 0, &[]), entry(7, 0, 0, &[(1, 2), (4, 4)])],
            vec![entry(3, 0, 0, &[])],
        );
        assert!(g.is_compact());
        assert_eq!(g.wire_len_words(), 3 + 4 * 4 + 3 * 3);
        assert_eq!(g.interval_chain(2).unwrap(), vec![Interval::new(1, 2), Interval::point(4)]);
        assert!(g.interval_chain(1).unwrap().is_empty());
    }

    #[test]
    fn concat_rebases_interval_indices() {
        let a = packed(vec![entry(0, 3, 1, &[(1, 1)])], vec![entry(1, 2, 1, &[])]);
        let b = packed(vec![entry(2, 1, 0, &[(3, 3)])], vec![entry(3, 0, 0, &[])]);
        let g = a.concat(b).unwrap();
        assert_eq!(g.entries()[1].first, Some(IntervalIdx(1)));
        assert_eq!(g.interval_chain(1).unwrap(), vec![Interval::point(3)]);
        g.validate_invariants().unwrap();
    }

    #[test]
    fn splice_then_compaction_coalesces() {
        let mut g = packed(vec![entry(0, 9, 1, &[(1, 2)]), entry(5, 9, 1, &[(3, 4)])], vec![]);
        assert_eq!(g.append_copies(0, &[Interval::new(3, 4)]).unwrap(), 1);
        assert_eq!(g.pending_splices().len(), 1);
        assert!(!g.is_compact());
        // already covered: nothing appended
        assert_eq!(g.append_copies(0, &[Interval::point(4)]).unwrap(), 0);
        let c = g.compacted().unwrap();
        assert_eq!(c.interval_chain(0).unwrap(), vec![Interval::new(1, 4)]);
        assert!(c.is_compact());
        assert_eq!(c.compacted().unwrap(), c);
    }

    #[test]
    fn killing_last_exit_trims_intervals() {
        let mut g = packed(
            vec![entry(0, 9, 1, &[(3, 3)]), entry(1, 9, 1, &[(3, 5)]), entry(2, 9, 1, &[(1, 3)])],
            vec![entry(3, 8, 1, &[]), entry(3, 7, 1, &[])],
        );
        g.kill_exit(0);
        assert!(g.chain_contains(0, 3).unwrap());
        g.kill_exit(1);
        assert!(g.interval_chain(0).unwrap().is_empty());
        assert_eq!(g.interval_chain(1).unwrap(), vec![Interval::new(4, 5)]);
        assert_eq!(g.interval_chain(2).unwrap(), vec![Interval::new(1, 2)]);
        assert_eq!(g.dead_exits(), 2);
        assert_eq!(g.compacted().unwrap().exits().len(), 0);
    }

    #[test]
    fn find_entry_needs_pairing_and_liveness() {
        let mut g = packed(vec![entry(4, 1, 0, &[]), entry(4, 2, 0, &[])], vec![]);
        let lut = g.entry_lut();
        assert_eq!(g.find_entry(&lut, 4, 2), Some(1));
        assert_eq!(g.find_entry(&lut, 4, 3), None);
        g.kill_entry(1);
        assert_eq!(g.find_entry(&lut, 4, 2), None);
    }

    #[test]
    fn words_roundtrip() {
        let g = packed(
            vec![entry(0, 3, 1, &[(1, 1), (5, 6)])],
            vec![entry(1, 2, 1, &[])],
        );
        let words = g.to_words().unwrap();
        assert_eq!(&words[..3], &[1, 1, 2]);
        assert_eq!(&words[3..7], &[0, 3, 1, 0]);
        assert_eq!(&words[7..11], &[1, 2, 1, -1]);
        assert_eq!(PackedIntervalGraph::from_words(&words).unwrap(), g);
    }

    #[test]
    fn decode_rejects_shared_chain() {
        // two entries pointing at interval 0
        let words = [2, 0, 1, 0, 5, 1, 0, 1, 6, 1, 0, 3, 3, -1];
        assert!(matches!(
            PackedIntervalGraph::from_words(&words),
            Err(CycleError::WireFormat(_))
        ));
    }

    #[test]
    fn decode_rejects_exit_with_interval() {
        let words = [0, 1, 1, 2, 5, 1, 0, 3, 3, -1];
        assert!(PackedIntervalGraph::from_words(&words).is_err());
    }

    #[test]
    fn decode_rejects_index_out_of_range() {
        let words = [1, 0, 1, 0, 5, 1, 4, 3, 3, -1];
        assert!(PackedIntervalGraph::from_words(&words).is_err());
    }

    #[test]
    fn orphan_intervals_are_dropped_by_compaction() {
        // interval 0 -> 1 -> 0, reachable from no entry
        let words = [1, 0, 2, 0, 5, 1, -1, 1, 1, 1, 2, 2, 0];
        let g = PackedIntervalGraph::from_words(&words).unwrap();
        assert!(!g.is_compact());
        assert_eq!(g.compacted().unwrap().intervals().len(), 0);
    }
}
