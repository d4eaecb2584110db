use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;

use crate::directory::Directory;
use crate::interval::{interval_contains, IntervalSet};
use crate::operator::intervals_for;
use crate::token::{Key, RangeOperator, RangePredicate, RangeToken, Token, Value};

/// The range-block predicate engine: detects conflicts between point writes
/// and range reads against the same secondary-index key, without forcing
/// every range operation to take a coarse per-key lock.
pub struct RangeBlockEngine<K: Key, V: Value> {
    read_ranges: DashMap<K, Mutex<IntervalSet<V>>>,
    write_points: DashMap<K, DashSet<V>>,
}

impl<K: Key, V: Value> RangeBlockEngine<K, V> {
    pub fn new() -> Self {
        Self {
            read_ranges: DashMap::new(),
            write_points: DashMap::new(),
        }
    }

    /// `is-range-blocked(mode, token)`. Only defined for range tokens; any
    /// other token kind is never blocked by this engine.
    pub fn is_blocked(&self, directory: &Directory<K, V>, token: &Token<K, V>) -> bool {
        let Some(range) = token.as_range() else {
            return false;
        };

        match &range.predicate {
            RangePredicate::Write(v) => self
                .read_ranges
                .get(&range.key)
                .map(|set| set.lock().contains(v))
                .unwrap_or(false),
            RangePredicate::Read(operator) => self.read_blocked(directory, &range.key, operator),
        }
    }

    fn read_blocked(&self, directory: &Directory<K, V>, key: &K, operator: &RangeOperator<V>) -> bool {
        match operator {
            RangeOperator::Eq(v) => self
                .write_points
                .get(key)
                .map(|points| points.contains(v))
                .unwrap_or(false),

            RangeOperator::Neq(v) => self
                .write_points
                .get(key)
                .map(|points| points.len() > 1 || points.iter().any(|p| p.key() != v))
                .unwrap_or(false),

            RangeOperator::Regex | RangeOperator::NotRegex => self
                .write_points
                .get(key)
                .map(|points| !points.is_empty())
                .unwrap_or(false),

            RangeOperator::Lt(_)
            | RangeOperator::Lte(_)
            | RangeOperator::Gt(_)
            | RangeOperator::Gte(_)
            | RangeOperator::Between(_, _) => {
                let Some(points) = self.write_points.get(key) else {
                    return false;
                };
                let intervals = intervals_for(operator);
                points.iter().any(|w| {
                    let w = w.key();
                    intervals.iter().any(|r| interval_contains(r, w))
                        && directory.contains(&Token::Range(RangeToken::write(key.clone(), w.clone())))
                })
            }
        }
    }

    /// Inserts the token's coverage into the side tables. Must be called
    /// immediately after the underlying primitive is acquired.
    pub fn record_acquired(&self, token: &Token<K, V>) {
        let Some(range) = token.as_range() else {
            return;
        };

        match &range.predicate {
            RangePredicate::Write(v) => {
                self.write_points
                    .entry(range.key.clone())
                    .or_insert_with(DashSet::new)
                    .insert(v.clone());
            }
            RangePredicate::Read(operator) => {
                let intervals = intervals_for(operator);
                let entry = self
                    .read_ranges
                    .entry(range.key.clone())
                    .or_insert_with(|| Mutex::new(IntervalSet::new()));
                let mut set = entry.lock();
                for interval in &intervals {
                    set.add(interval);
                }
            }
        }
    }

    /// Removes the token's coverage, dropping the per-key structure if it
    /// becomes empty. Must be called immediately after release.
    pub fn record_released(&self, token: &Token<K, V>) {
        let Some(range) = token.as_range() else {
            return;
        };

        match &range.predicate {
            RangePredicate::Write(v) => {
                if let Some(points) = self.write_points.get(&range.key) {
                    points.remove(v);
                }
                self.write_points
                    .remove_if(&range.key, |_, points| points.is_empty());
            }
            RangePredicate::Read(operator) => {
                let intervals = intervals_for(operator);
                if let Some(entry) = self.read_ranges.get(&range.key) {
                    let mut set = entry.lock();
                    for interval in &intervals {
                        set.remove(interval);
                    }
                }
                self.read_ranges
                    .remove_if(&range.key, |_, set| set.lock().is_empty());
            }
        }
    }
}
