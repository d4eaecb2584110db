//! The canonical range-operator to interval mapping.

use std::ops::Bound;

use crate::interval::Interval;
use crate::token::RangeOperator;

/// Expands a range-read operator into the concrete set of intervals it
/// denotes. `EQ`/`NEQ` are kept as dedicated cases in the range-block engine
/// rather than routed through here, since their blocking test is a plain
/// membership check against the write-point set; this function exists for
/// the `LT/LTE/GT/GTE/BETWEEN/REGEX/NOT_REGEX` family, whose blocking test
/// genuinely needs concrete intervals.
pub fn intervals_for<V: Clone>(operator: &RangeOperator<V>) -> Vec<Interval<V>> {
    match operator {
        RangeOperator::Eq(v) => vec![(Bound::Included(v.clone()), Bound::Included(v.clone()))],
        RangeOperator::Neq(v) => vec![
            (Bound::Unbounded, Bound::Excluded(v.clone())),
            (Bound::Excluded(v.clone()), Bound::Unbounded),
        ],
        RangeOperator::Lt(v) => vec![(Bound::Unbounded, Bound::Excluded(v.clone()))],
        RangeOperator::Lte(v) => vec![(Bound::Unbounded, Bound::Included(v.clone()))],
        RangeOperator::Gt(v) => vec![(Bound::Excluded(v.clone()), Bound::Unbounded)],
        RangeOperator::Gte(v) => vec![(Bound::Included(v.clone()), Bound::Unbounded)],
        RangeOperator::Between(lo, hi) => vec![(lo.clone(), hi.clone())],
        RangeOperator::Regex | RangeOperator::NotRegex => {
            vec![(Bound::Unbounded, Bound::Unbounded)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_both_infinite_is_the_all_interval() {
        let op: RangeOperator<i64> = RangeOperator::Between(Bound::Unbounded, Bound::Unbounded);
        assert_eq!(intervals_for(&op), vec![(Bound::Unbounded, Bound::Unbounded)]);
    }

    #[test]
    fn neq_splits_around_the_value() {
        let op = RangeOperator::Neq(5i64);
        assert_eq!(
            intervals_for(&op),
            vec![
                (Bound::Unbounded, Bound::Excluded(5)),
                (Bound::Excluded(5), Bound::Unbounded),
            ]
        );
    }
}
