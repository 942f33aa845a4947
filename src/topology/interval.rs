//! Closed label intervals and normalized unions of them.
//!
//! An [`Interval`] is the convex `[C0, C1]` summary of the trans-arc tails a
//! vertex can reach. An [`IntervalSet`] keeps its spans sorted, disjoint and
//! non-adjacent, so two sets describing the same labels compare equal.

use serde::{Deserialize, Serialize};

use crate::topology::vertex::Label;

/// Closed interval `[c0, c1]` of labels, `c0 <= c1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub c0: Label,
    pub c1: Label,
}

impl Interval {
    pub fn new(c0: Label, c1: Label) -> Self {
        debug_assert!(c0 <= c1, "interval bounds out of order: [{c0}, {c1}]");
        Self { c0, c1 }
    }

    pub fn point(label: Label) -> Self {
        Self { c0: label, c1: label }
    }

    #[inline]
    pub fn contains(&self, label: Label) -> bool {
        self.c0 <= label && label <= self.c1
    }

    /// `true` if every label of `other` lies inside `self`.
    #[inline]
    pub fn covers(&self, other: &Interval) -> bool {
        self.c0 <= other.c0 && other.c1 <= self.c1
    }

    /// Smallest interval containing both.
    #[inline]
    pub fn hull(self, other: Interval) -> Interval {
        Interval {
            c0: self.c0.min(other.c0),
            c1: self.c1.max(other.c1),
        }
    }

    /// `true` if the union of the two is itself an interval.
    #[inline]
    fn touches(&self, other: &Interval) -> bool {
        self.c0 <= other.c1.saturating_add(1) && other.c0 <= self.c1.saturating_add(1)
    }
}

/// Min/max fold of two optional intervals; `None` is the identity.
pub fn fold(a: Option<Interval>, b: Option<Interval>) -> Option<Interval> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.hull(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Normalized union of closed intervals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalSet {
    spans: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self { spans: Vec::new() }
    }

    pub fn from_intervals(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut spans: Vec<Interval> = intervals.into_iter().collect();
        normalize(&mut spans);
        Self { spans }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Number of disjoint spans.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> + '_ {
        self.spans.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.spans
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    pub fn contains(&self, label: Label) -> bool {
        // last span starting at or before `label`
        let mut lo = 0usize;
        let mut hi = self.spans.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.spans[mid].c0 <= label {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo > 0 && self.spans[lo - 1].contains(label)
    }

    /// `true` if `iv` lies entirely inside one span.
    pub fn covers(&self, iv: &Interval) -> bool {
        self.spans.iter().any(|s| s.covers(iv))
    }

    pub fn hull(&self) -> Option<Interval> {
        match (self.spans.first(), self.spans.last()) {
            (Some(first), Some(last)) => Some(Interval::new(first.c0, last.c1)),
            _ => None,
        }
    }

    pub fn insert(&mut self, iv: Interval) {
        self.spans.push(iv);
        normalize(&mut self.spans);
    }

    pub fn union_with(&mut self, other: &IntervalSet) {
        if other.is_empty() {
            return;
        }
        self.spans.extend_from_slice(&other.spans);
        normalize(&mut self.spans);
    }

    /// Collapse to the single hull interval.
    pub fn make_convex(&mut self) {
        if let Some(h) = self.hull() {
            self.spans.clear();
            self.spans.push(h);
        }
    }
}

/// Sort by lower bound and coalesce overlapping or adjacent spans.
pub(crate) fn normalize(spans: &mut Vec<Interval>) {
    if spans.len() < 2 {
        return;
    }
    spans.sort_unstable();
    let mut out: Vec<Interval> = Vec::with_capacity(spans.len());
    for &iv in spans.iter() {
        match out.last_mut() {
            Some(last) if last.touches(&iv) => *last = last.hull(iv),
            _ => out.push(iv),
        }
    }
    *spans = out;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_treats_none_as_identity() {
        let a = Some(Interval::new(3, 5));
        assert_eq!(fold(a, None), a);
        assert_eq!(fold(None, a), a);
        assert_eq!(fold(None, None), None);
        assert_eq!(fold(a, Some(Interval::point(9))), Some(Interval::new(3, 9)));
    }

    #[test]
    fn set_coalesces_adjacent_spans() {
        let s = IntervalSet::from_intervals([
            Interval::new(7, 9),
            Interval::new(1, 2),
            Interval::new(3, 4),
            Interval::point(11),
        ]);
        assert_eq!(s.as_slice(), &[Interval::new(1, 4), Interval::new(7, 9), Interval::point(11)]);
        assert!(s.contains(4));
        assert!(!s.contains(5));
        assert!(!s.contains(10));
        assert!(s.contains(11));
        assert_eq!(s.hull(), Some(Interval::new(1, 11)));
    }

    #[test]
    fn make_convex_keeps_hull() {
        let mut s = IntervalSet::from_intervals([Interval::point(2), Interval::point(8)]);
        s.make_convex();
        assert_eq!(s.as_slice(), &[Interval::new(2, 8)]);
        assert!(s.contains(5));
    }

    #[test]
    fn contains_on_empty_set() {
        assert!(!IntervalSet::new().contains(0));
        assert_eq!(IntervalSet::new().hull(), None);
    }
}
