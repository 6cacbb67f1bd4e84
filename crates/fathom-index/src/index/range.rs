//! Module: index::range
//! Responsibility: turn a partial key plus an optional per-column predicate
//! into the byte boundaries of a shard scan. Server-side bounds are
//! inclusive-start / exclusive-end, so inclusive uppers and exclusive lowers
//! are converted with a byte-level prefix successor.

use crate::direction::Direction;
use crate::error::IndexError;
use crate::index::codec::{self, IndexKey};
use crate::index::definition::IndexDefinition;
use crate::obs::{self, MetricsEvent};
use crate::value::FieldValue;
use std::ops::Bound;
use thiserror::Error as ThisError;

///
/// RangeError
///

#[derive(Debug, ThisError)]
pub enum RangeError {
    #[error("range predicate on '{found}' may only extend the filled key; next open column is '{expected}'")]
    ColumnMismatch { expected: String, found: String },

    #[error("key is already complete; a range predicate on '{column}' cannot replace a filled column")]
    NoOpenColumn { column: String },

    #[error("null bound requires a null-supporting column, and '{column}' is not")]
    NullBound { column: String },

    #[error(transparent)]
    Codec(#[from] IndexError),
}

///
/// FieldRange
///
/// A single column's bound pair. The column must be the first one beyond
/// the already-filled key prefix.
///

#[derive(Clone, Debug)]
pub struct FieldRange {
    pub column: String,
    pub lower: Bound<FieldValue>,
    pub upper: Bound<FieldValue>,
}

impl FieldRange {
    #[must_use]
    pub fn new(column: impl Into<String>, lower: Bound<FieldValue>, upper: Bound<FieldValue>) -> Self {
        Self {
            column: column.into(),
            lower,
            upper,
        }
    }
}

///
/// ScanBounds
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScanBounds {
    /// Provably matches nothing. Callers short-circuit to zero results
    /// without contacting any shard.
    Empty,
    Range {
        /// Serialization of the filled prefix only.
        prefix: Vec<u8>,
        /// Inclusive start.
        start: Vec<u8>,
        /// Exclusive end; `None` is open.
        end: Option<Vec<u8>>,
    },
}

impl ScanBounds {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

///
/// IndexRange
///
/// The scan descriptor: bounds, direction, and how many leading columns are
/// pinned to equality (which decides whether the merge layer deduplicates).
///

#[derive(Clone, Debug)]
pub struct IndexRange {
    pub bounds: ScanBounds,
    pub direction: Direction,
    exact_match: bool,
    equality_columns: usize,
}

impl IndexRange {
    /// Build the descriptor for `key` (a possibly-partial equality prefix),
    /// optionally extended by `field_range` on the next open column.
    pub fn build_range(
        definition: &IndexDefinition,
        key: &IndexKey,
        field_range: Option<&FieldRange>,
        direction: Direction,
    ) -> Result<Self, RangeError> {
        let filled = key.filled_len();
        let prefix = codec::serialize_key(definition, key, true)?
            .unwrap_or_default();

        if key.is_complete() && field_range.is_none() {
            return Ok(Self {
                bounds: ScanBounds::Range {
                    prefix: prefix.clone(),
                    start: prefix,
                    end: None,
                },
                direction,
                exact_match: true,
                equality_columns: definition.column_count(),
            });
        }

        let bounds = match field_range {
            Some(range) => {
                let Some(field) = definition.fields().get(filled) else {
                    return Err(RangeError::NoOpenColumn {
                        column: range.column.clone(),
                    });
                };
                if !field.name.eq_ignore_ascii_case(&range.column) {
                    return Err(RangeError::ColumnMismatch {
                        expected: field.name.clone(),
                        found: range.column.clone(),
                    });
                }

                let encode = |value: &FieldValue| -> Result<Vec<u8>, RangeError> {
                    codec::encode_bound_value(field, value)?.ok_or_else(|| {
                        RangeError::NullBound {
                            column: field.name.clone(),
                        }
                    })
                };

                let start = match &range.lower {
                    Bound::Included(value) => concat(&prefix, &encode(value)?),
                    Bound::Excluded(value) => {
                        // Smallest key past every entry equal to the bound.
                        match prefix_successor(concat(&prefix, &encode(value)?)) {
                            Some(start) => start,
                            None => {
                                obs::emit(MetricsEvent::EmptyRange);
                                return Ok(Self::empty(direction, filled));
                            }
                        }
                    }
                    Bound::Unbounded => prefix.clone(),
                };

                let end = match &range.upper {
                    Bound::Included(value) => prefix_successor(concat(&prefix, &encode(value)?)),
                    Bound::Excluded(value) => Some(concat(&prefix, &encode(value)?)),
                    // An open upper on a nullable column stops before the
                    // null indicators, honoring null-sorts-last.
                    Bound::Unbounded if definition.supports_null && field.nullable => {
                        Some(concat(&prefix, &[crate::NULL_INDICATOR]))
                    }
                    Bound::Unbounded => None,
                };
                let end = match end {
                    Some(end) => Some(end),
                    None => prefix_successor(prefix.clone()),
                };

                if let Some(end) = &end {
                    if start >= *end {
                        obs::emit(MetricsEvent::EmptyRange);
                        return Ok(Self::empty(direction, filled));
                    }
                }

                ScanBounds::Range { prefix, start, end }
            }
            None => {
                let end = prefix_successor(prefix.clone());
                ScanBounds::Range {
                    prefix: prefix.clone(),
                    start: prefix,
                    end,
                }
            }
        };

        Ok(Self {
            bounds,
            direction,
            exact_match: false,
            equality_columns: filled,
        })
    }

    const fn empty(direction: Direction, equality_columns: usize) -> Self {
        Self {
            bounds: ScanBounds::Empty,
            direction,
            exact_match: false,
            equality_columns,
        }
    }

    #[must_use]
    pub const fn exact_match(&self) -> bool {
        self.exact_match
    }

    /// Leading columns pinned to equality by the key prefix.
    #[must_use]
    pub const fn equality_columns(&self) -> usize {
        self.equality_columns
    }

    /// Post-filter a key the server returned. The prefix must match
    /// exactly; the exclusive end applies to forward iteration and the
    /// inclusive start is re-checked only on reverse re-entry.
    #[must_use]
    pub fn in_range(&self, key_bytes: &[u8]) -> bool {
        match &self.bounds {
            ScanBounds::Empty => false,
            ScanBounds::Range { prefix, start, end } => {
                if self.exact_match {
                    return key_bytes == start.as_slice();
                }
                if !key_bytes.starts_with(prefix) {
                    return false;
                }
                match self.direction {
                    Direction::Forward | Direction::Unordered => {
                        end.as_ref().is_none_or(|end| key_bytes < end.as_slice())
                    }
                    Direction::Reverse => key_bytes >= start.as_slice(),
                }
            }
        }
    }
}

fn concat(prefix: &[u8], tail: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + tail.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(tail);
    out
}

// Smallest byte string ordering after every string that starts with
// `bytes`. None when no such string exists (all 0xFF).
fn prefix_successor(mut bytes: Vec<u8>) -> Option<Vec<u8>> {
    while let Some(last) = bytes.last_mut() {
        if *last == 0xFF {
            bytes.pop();
        } else {
            *last += 1;
            return Some(bytes);
        }
    }
    None
}
