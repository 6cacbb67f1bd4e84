//! Total order over indexable values.
//!
//! This order is the semantic contract the binary key codec must preserve:
//! for any two indexable values of a column's type,
//! `cmp_index_values(a, b) == encode(a).cmp(&encode(b))`.

use crate::value::FieldValue;
use std::cmp::Ordering;

// Null flavors sort after every concrete value; Null before JsonNull so the
// value order matches the indicator-byte order (0x01 < 0x02).
const fn null_rank(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Null => 1,
        FieldValue::JsonNull => 2,
        _ => 0,
    }
}

/// Compare two values under the index order.
///
/// Returns `None` when the pair is not comparable: different non-numeric
/// types, or complex values (arrays, maps, records), which never reach an
/// index column directly.
#[must_use]
pub fn cmp_index_values(left: &FieldValue, right: &FieldValue) -> Option<Ordering> {
    let ranks = (null_rank(left), null_rank(right));
    if ranks.0 != 0 || ranks.1 != 0 {
        return Some(ranks.0.cmp(&ranks.1));
    }

    if left.is_numeric() && right.is_numeric() {
        return Some(cmp_numeric(left, right));
    }

    match (left, right) {
        (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
        (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
        (FieldValue::Binary(a), FieldValue::Binary(b))
        | (FieldValue::FixedBinary(a), FieldValue::FixedBinary(b)) => Some(a.cmp(b)),
        (FieldValue::Enum(a), FieldValue::Enum(b)) => Some(a.cmp(b)),
        (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// Numeric comparison promotes both sides to Decimal. Infinities cannot be
// represented there, so those fall back to f64, where the comparison against
// any finite value is exact.
fn cmp_numeric(left: &FieldValue, right: &FieldValue) -> Ordering {
    if let (Some(a), Some(b)) = (left.to_decimal(), right.to_decimal()) {
        return a.cmp(&b);
    }

    match (left.to_f64_wide(), right.to_f64_wide()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        // Decimal wider than f64 range vs an infinity: the infinity wins.
        (Some(a), None) => {
            if a == f64::NEG_INFINITY {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (None, Some(b)) => {
            if b == f64::NEG_INFINITY {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (None, None) => Ordering::Equal,
    }
}
