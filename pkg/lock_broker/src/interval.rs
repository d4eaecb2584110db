//! Coalesced interval bookkeeping for the range-block engine.
//!
//! The lock directory's range-block engine needs a per-key set of value
//! intervals that can be added and removed concurrently, with exact
//! point-containment queries and no false negatives when several range reads
//! overlap. This is a direct generalization of the transaction manager's
//! key-range map: instead of splitting `[start_key, end_key)` byte ranges, we
//! split `[lo_cut, hi_cut)` ranges over an augmented "cut point" space that
//! encodes open/closed/unbounded endpoints as infinitesimal offsets around a
//! value, which lets the exact same split/merge algorithm support arbitrary
//! `Bound<V>` intervals.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

/// A cut point in the value line, augmented with a half-step so that
/// `Included`/`Excluded` bounds at the same value sort distinctly.
///
/// `At(v)` sits at `v` itself; `After(v)` sits immediately to its right. An
/// interval's lower bound becomes `At(v)` (for `Included`) or `After(v)`
/// (for `Excluded`); its upper bound becomes `After(v)` (for `Included`, so
/// the half-open end sits just past `v`) or `At(v)` (for `Excluded`, so `v`
/// itself is outside the range).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CutPoint<V> {
    NegInf,
    At(V),
    After(V),
    PosInf,
}

impl<V: Ord> PartialOrd for CutPoint<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: Ord> Ord for CutPoint<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        use CutPoint::*;
        match (self, other) {
            (NegInf, NegInf) => Ordering::Equal,
            (NegInf, _) => Ordering::Less,
            (_, NegInf) => Ordering::Greater,
            (PosInf, PosInf) => Ordering::Equal,
            (PosInf, _) => Ordering::Greater,
            (_, PosInf) => Ordering::Less,
            (At(a), At(b)) => a.cmp(b),
            (At(a), After(b)) => a.cmp(b).then(Ordering::Less),
            (After(a), At(b)) => a.cmp(b).then(Ordering::Greater),
            (After(a), After(b)) => a.cmp(b),
        }
    }
}

fn lower_cut<V: Ord + Clone>(bound: &Bound<V>) -> CutPoint<V> {
    match bound {
        Bound::Unbounded => CutPoint::NegInf,
        Bound::Included(v) => CutPoint::At(v.clone()),
        Bound::Excluded(v) => CutPoint::After(v.clone()),
    }
}

fn upper_cut<V: Ord + Clone>(bound: &Bound<V>) -> CutPoint<V> {
    match bound {
        Bound::Unbounded => CutPoint::PosInf,
        Bound::Included(v) => CutPoint::After(v.clone()),
        Bound::Excluded(v) => CutPoint::At(v.clone()),
    }
}

/// An inclusive/exclusive/unbounded interval over `V`, exactly as produced by
/// the operator table's comparisons.
pub type Interval<V> = (Bound<V>, Bound<V>);

pub fn interval_contains<V: Ord>(interval: &Interval<V>, value: &V) -> bool {
    let lo_ok = match &interval.0 {
        Bound::Unbounded => true,
        Bound::Included(v) => value >= v,
        Bound::Excluded(v) => value > v,
    };
    let hi_ok = match &interval.1 {
        Bound::Unbounded => true,
        Bound::Included(v) => value <= v,
        Bound::Excluded(v) => value < v,
    };
    lo_ok && hi_ok
}

/// Generic map of non-overlapping `[lo, hi)` cut-point ranges to data,
/// generalized from the byte-range map used by the transaction manager this
/// broker was extracted from. See `range()` for the split/merge contract.
struct RangeMap<C, T> {
    ranges: BTreeMap<C, (C, T)>,
}

impl<C: Ord + Clone, T: Default + Clone> RangeMap<C, T> {
    fn new() -> Self {
        Self {
            ranges: BTreeMap::new(),
        }
    }

    /// Mutates all the data associated with all ranges between `lo` and
    /// `hi`, creating default-valued ranges to fill gaps and splitting
    /// existing ranges at `lo`/`hi` as needed. `f` returning `false` deletes
    /// that sub-range instead of keeping it, which is how refcounts drop to
    /// zero and disappear from the map.
    fn range<F: FnMut(&mut T) -> bool>(&mut self, lo: C, hi: C, mut f: F) {
        let mut lo = lo;

        let lower_bound = {
            if let Some((key, _)) = self
                .ranges
                .range((Bound::Unbounded, Bound::Included(lo.clone())))
                .next_back()
            {
                Bound::Included(key.clone())
            } else if let Some((key, _)) = self.ranges.iter().next() {
                Bound::Included(key.clone())
            } else {
                Bound::Unbounded
            }
        };

        let mut add_ranges = vec![];
        let mut delete_keys = vec![];

        let mut iter = self.ranges.range_mut((lower_bound, Bound::Unbounded));
        while let Some((cur_lo, (cur_hi, v))) = iter.next() {
            let cur_hi: &C = cur_hi;

            if *cur_hi <= lo {
                continue;
            }
            if *cur_lo >= hi {
                break;
            }

            let mut equal_cur = true;

            if lo < *cur_lo {
                let new_lo = lo.clone();
                let new_hi = cur_lo.clone();
                let mut new_value = T::default();
                if f(&mut new_value) {
                    add_ranges.push((new_lo, (new_hi, new_value)));
                }
                lo = cur_lo.clone();
            } else if lo > *cur_lo {
                delete_keys.push(cur_lo.clone());

                let new_lo = cur_lo.clone();
                let new_hi = lo.clone();
                let new_value = v.clone();
                add_ranges.push((new_lo, (new_hi, new_value)));

                let new_lo = lo.clone();
                let new_hi = cur_hi.clone();
                let mut new_value = v.clone();
                if f(&mut new_value) {
                    add_ranges.push((new_lo, (new_hi, new_value)));
                }

                equal_cur = false;
            }

            if hi < *cur_hi {
                delete_keys.push(cur_lo.clone());

                let new_lo = lo.clone();
                let new_hi = hi.clone();
                let mut new_value = v.clone();
                if f(&mut new_value) {
                    add_ranges.push((new_lo, (new_hi, new_value)));
                }

                let new_lo = hi.clone();
                let new_hi = cur_hi.clone();
                let new_value = v.clone();
                add_ranges.push((new_lo, (new_hi, new_value)));

                equal_cur = false;
            }

            if equal_cur {
                if !f(v) {
                    delete_keys.push(cur_lo.clone());
                }
            }

            lo = cur_hi.clone();
        }

        if lo < hi {
            let mut new_value = T::default();
            if f(&mut new_value) {
                add_ranges.push((lo, (hi, new_value)));
            }
        }

        for key in delete_keys {
            self.ranges.remove(&key);
        }
        for (key, value) in add_ranges {
            self.ranges.insert(key, value);
        }
    }

    fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// The read-range set for a single secondary-index key: a coalesced,
/// reference-counted union of value intervals. Multiple overlapping range
/// reads share coverage of the overlap; a point is "in" the set as long as
/// at least one active range read still covers it.
pub struct IntervalSet<V: Ord + Clone> {
    map: RangeMap<CutPoint<V>, usize>,
}

impl<V: Ord + Clone> IntervalSet<V> {
    pub fn new() -> Self {
        Self {
            map: RangeMap::new(),
        }
    }

    pub fn add(&mut self, interval: &Interval<V>) {
        let lo = lower_cut(&interval.0);
        let hi = upper_cut(&interval.1);
        if lo >= hi {
            return;
        }
        self.map.range(lo, hi, |count| {
            *count += 1;
            true
        });
    }

    pub fn remove(&mut self, interval: &Interval<V>) {
        let lo = lower_cut(&interval.0);
        let hi = upper_cut(&interval.1);
        if lo >= hi {
            return;
        }
        self.map.range(lo, hi, |count| {
            *count = count.saturating_sub(1);
            *count > 0
        });
    }

    pub fn contains(&self, value: &V) -> bool {
        let point = CutPoint::At(value.clone());
        self.map
            .ranges
            .range((Bound::Unbounded, Bound::Included(point.clone())))
            .next_back()
            .map(|(_, (hi, count))| *count > 0 && point < *hi)
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(a: i64, b: i64) -> Interval<i64> {
        (Bound::Included(a), Bound::Included(b))
    }

    #[test]
    fn add_then_contains() {
        let mut set = IntervalSet::new();
        set.add(&closed(1, 10));
        assert!(set.contains(&5));
        assert!(!set.contains(&11));
    }

    #[test]
    fn overlapping_adds_coalesce_and_survive_one_removal() {
        let mut set = IntervalSet::new();
        set.add(&closed(1, 10));
        set.add(&closed(5, 15));

        set.remove(&closed(1, 10));

        // The second reader's coverage of [5,15] still holds the overlap.
        assert!(set.contains(&5));
        assert!(set.contains(&12));
        assert!(!set.contains(&20));

        set.remove(&closed(5, 15));
        assert!(set.is_empty());
        assert!(!set.contains(&5));
    }

    #[test]
    fn open_vs_closed_endpoints() {
        let mut set = IntervalSet::new();
        set.add(&(Bound::Excluded(1i64), Bound::Excluded(10)));
        assert!(!set.contains(&1));
        assert!(set.contains(&2));
        assert!(!set.contains(&10));
    }

    #[test]
    fn unbounded_both_sides_covers_everything() {
        let mut set = IntervalSet::new();
        set.add(&(Bound::Unbounded, Bound::Unbounded));
        assert!(set.contains(&i64::MIN));
        assert!(set.contains(&0));
        assert!(set.contains(&i64::MAX));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force_contains(intervals: &[Interval<i32>], value: i32) -> bool {
        intervals.iter().any(|i| interval_contains(i, &value))
    }

    fn arb_interval() -> impl Strategy<Value = Interval<i32>> {
        (any::<i32>(), any::<i32>()).prop_map(|(a, b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            (Bound::Included(lo), Bound::Included(hi))
        })
    }

    proptest! {
        // contains() must agree with a naive scan over every interval still
        // added (none removed), for an arbitrary sequence of closed ranges.
        #[test]
        fn contains_matches_brute_force_scan(
            intervals in proptest::collection::vec(arb_interval(), 0..12),
            probe in any::<i32>(),
        ) {
            let mut set = IntervalSet::new();
            for interval in &intervals {
                set.add(interval);
            }
            prop_assert_eq!(set.contains(&probe), brute_force_contains(&intervals, probe));
        }

        // Adding then immediately removing the same interval is a no-op on
        // point containment, regardless of what else is already present.
        #[test]
        fn add_remove_is_commutative_with_prior_state(
            base in proptest::collection::vec(arb_interval(), 0..8),
            extra in arb_interval(),
            probe in any::<i32>(),
        ) {
            let mut set = IntervalSet::new();
            for interval in &base {
                set.add(interval);
            }
            let before = set.contains(&probe);

            set.add(&extra);
            set.remove(&extra);

            prop_assert_eq!(set.contains(&probe), before);
        }
    }
}
