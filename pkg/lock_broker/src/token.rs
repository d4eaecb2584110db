use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Bound;

use bytes::Bytes;

/// An opaque, hashable, comparable identifier for a logical resource.
///
/// `Token` is generic over the secondary-index key type `K` and the value
/// type `V` used by range predicates; ordinary and shared tokens never touch
/// either parameter, since they are plain byte sequences compared
/// canonically.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token<K, V> {
    /// Maps to the ordinary reader/writer-exclusion primitive.
    Ordinary(Bytes),

    /// Structurally identical to `Ordinary`, but tagged so the directory
    /// instantiates a [`crate::primitives::SharedPrimitive`] for it instead.
    Shared(Bytes),

    /// Drives the range-block engine.
    Range(RangeToken<K, V>),
}

impl<K, V> Token<K, V> {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Ordinary(_) => TokenKind::Ordinary,
            Token::Shared(_) => TokenKind::Shared,
            Token::Range(_) => TokenKind::Range,
        }
    }

    pub fn as_range(&self) -> Option<&RangeToken<K, V>> {
        match self {
            Token::Range(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Ordinary,
    Shared,
    Range,
}

/// A range token: a secondary-index key plus either a read predicate or a
/// single written point value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RangeToken<K, V> {
    pub key: K,
    pub predicate: RangePredicate<V>,
}

impl<K, V> RangeToken<K, V> {
    pub fn write(key: K, value: V) -> Self {
        Self {
            key,
            predicate: RangePredicate::Write(value),
        }
    }

    pub fn read(key: K, operator: RangeOperator<V>) -> Self {
        Self {
            key,
            predicate: RangePredicate::Read(operator),
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self.predicate, RangePredicate::Write(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RangePredicate<V> {
    /// A point write. Never carries an operator.
    Write(V),
    /// A range read, driven by an operator over one or two values.
    Read(RangeOperator<V>),
}

/// Operators a range-read token may carry. `Between` encodes its own
/// inclusivity via the two `Bound`s rather than a separate selector enum;
/// `(Unbounded, Unbounded)` is the degenerate "matches everything" case.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RangeOperator<V> {
    Eq(V),
    Neq(V),
    Lt(V),
    Lte(V),
    Gt(V),
    Gte(V),
    Between(Bound<V>, Bound<V>),
    Regex,
    NotRegex,
}

/// Trait bound alias for values usable inside range tokens: must support a
/// total order (for interval containment) and the usual bookkeeping traits
/// needed to live inside concurrent hash-based tables. `Debug` is required
/// so acquire/release spans can log the token they operate on.
pub trait Value: Ord + Clone + Hash + Debug + Send + Sync + 'static {}
impl<T: Ord + Clone + Hash + Debug + Send + Sync + 'static> Value for T {}

/// Trait bound alias for secondary-index keys.
pub trait Key: Eq + Hash + Clone + Debug + Send + Sync + 'static {}
impl<T: Eq + Hash + Clone + Debug + Send + Sync + 'static> Key for T {}
