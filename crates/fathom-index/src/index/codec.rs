//! Module: index::codec
//! Responsibility: the sortable binary key format. Unsigned-byte order over
//! encoded keys must agree with column-wise value order (first column major,
//! later columns as tie-breakers, null sorts last).

use crate::error::IndexError;
use crate::index::definition::{IndexDefinition, IndexField};
use crate::schema::PathKind;
use crate::value::{
    EnumSymbol, FieldType, FieldValue, Float32, Float64, TimestampValue, find_at_path,
    put_at_path, put_map_entry,
};
use crate::{JSON_NULL_INDICATOR, NOT_NULL_INDICATOR, NULL_INDICATOR};
use rust_decimal::Decimal;

const NULL_VALUE: FieldValue = FieldValue::Null;

// Packed-integer prefixes. Positives encode as 0x80 + length then the
// big-endian magnitude; negatives as 0x7F - length then the low bytes of the
// two's complement. Zero is the bare 0x80 byte.
const PACKED_POSITIVE_BASE: u8 = 0x80;
const PACKED_NEGATIVE_BASE: u8 = 0x7F;

const SIGN32: u32 = 1 << 31;
const SIGN64: u64 = 1 << 63;

// Decimal sign buckets and per-sign digit terminators.
const DECIMAL_NEGATIVE: u8 = 0x00;
const DECIMAL_ZERO: u8 = 0x01;
const DECIMAL_POSITIVE: u8 = 0x02;
const DECIMAL_POSITIVE_TERMINATOR: u8 = 0x00;
const DECIMAL_NEGATIVE_TERMINATOR: u8 = 0xFF;
const DECIMAL_EXPONENT_BIAS: i32 = 128;

const STRING_TERMINATOR: u8 = 0x00;

///
/// IndexKey
///
/// A partially- or fully-populated instance of a definition's flattened key
/// shape. Columns are positional and filled left-to-right; explicit NULL is
/// distinct from missing. Scoped to one query or build operation.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexKey {
    columns: Vec<Option<FieldValue>>,
}

impl IndexKey {
    #[must_use]
    pub fn new(definition: &IndexDefinition) -> Self {
        Self {
            columns: vec![None; definition.column_count()],
        }
    }

    pub fn set(&mut self, position: usize, value: FieldValue) -> Result<(), IndexError> {
        let len = self.columns.len();
        let slot = self.columns.get_mut(position).ok_or_else(|| {
            IndexError::codec_invariant(format!(
                "column position {position} out of bounds for a {len}-column key"
            ))
        })?;
        *slot = Some(value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&FieldValue> {
        self.columns.get(position).and_then(Option::as_ref)
    }

    /// Number of leading filled columns.
    #[must_use]
    pub fn filled_len(&self) -> usize {
        self.columns
            .iter()
            .take_while(|column| column.is_some())
            .count()
    }

    /// True when every declared column carries a value (possibly NULL).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.columns.iter().all(Option::is_some)
    }
}

enum ColumnOutcome {
    Written,
    /// Null hit a non-null-supporting column: the row contributes no entry.
    NoEntry,
}

///
/// ENCODING
///

/// Serialize `key` under `definition`.
///
/// `Ok(None)` means the key cannot produce an entry (a null in a column
/// without null support). With `allow_partial`, encoding stops at the first
/// missing column and returns the prefix built so far (possibly empty);
/// without it, missing nullable columns are substituted with SQL NULL.
pub fn serialize_key(
    definition: &IndexDefinition,
    key: &IndexKey,
    allow_partial: bool,
) -> Result<Option<Vec<u8>>, IndexError> {
    let mut buf = Vec::new();

    for (position, field) in definition.fields().iter().enumerate() {
        let value = match key.get(position) {
            Some(value) => value,
            None if allow_partial => return Ok(Some(buf)),
            None if field.nullable => &NULL_VALUE,
            None => return Ok(None),
        };
        match encode_column(&mut buf, field, value)? {
            ColumnOutcome::Written => {}
            ColumnOutcome::NoEntry => return Ok(None),
        }
    }

    Ok(Some(buf))
}

/// Serialize a full row into one binary entry by resolving every declared
/// column path against it. `Ok(None)` means the row does not participate in
/// this index. Multi-key definitions must go through key extraction instead;
/// marker steps are not resolvable against a bare row.
pub fn serialize_row(
    definition: &IndexDefinition,
    row: &FieldValue,
) -> Result<Option<Vec<u8>>, IndexError> {
    let mut buf = Vec::new();

    for field in definition.fields() {
        let value = find_at_path(row, field.path.steps()).unwrap_or(&NULL_VALUE);
        match encode_column(&mut buf, field, value)? {
            ColumnOutcome::Written => {}
            ColumnOutcome::NoEntry => return Ok(None),
        }
    }

    Ok(Some(buf))
}

/// Serialize one entry from a per-column resolver. Unresolved columns are
/// substituted with SQL NULL; a null in a non-null-supporting column yields
/// `Ok(None)` (no entry). Extraction drives this once per locus element.
pub(crate) fn serialize_resolved<F>(
    definition: &IndexDefinition,
    mut resolve: F,
) -> Result<Option<Vec<u8>>, IndexError>
where
    F: FnMut(&IndexField) -> Option<FieldValue>,
{
    let mut buf = Vec::new();

    for field in definition.fields() {
        let value = resolve(field).unwrap_or(FieldValue::Null);
        match encode_column(&mut buf, field, &value)? {
            ColumnOutcome::Written => {}
            ColumnOutcome::NoEntry => return Ok(None),
        }
    }

    Ok(Some(buf))
}

/// Encode one bound value in the column's key layout. `Ok(None)` when the
/// value is a null the column cannot carry.
pub(crate) fn encode_bound_value(
    field: &IndexField,
    value: &FieldValue,
) -> Result<Option<Vec<u8>>, IndexError> {
    let mut buf = Vec::new();
    match encode_column(&mut buf, field, value)? {
        ColumnOutcome::Written => Ok(Some(buf)),
        ColumnOutcome::NoEntry => Ok(None),
    }
}

fn encode_column(
    buf: &mut Vec<u8>,
    field: &IndexField,
    value: &FieldValue,
) -> Result<ColumnOutcome, IndexError> {
    if value.is_null() {
        if !field.nullable {
            return Ok(ColumnOutcome::NoEntry);
        }
        buf.push(match value {
            FieldValue::JsonNull => JSON_NULL_INDICATOR,
            _ => NULL_INDICATOR,
        });
        return Ok(ColumnOutcome::Written);
    }

    if field.nullable {
        buf.push(NOT_NULL_INDICATOR);
    }
    encode_value(buf, field, value)?;
    Ok(ColumnOutcome::Written)
}

fn encode_value(
    buf: &mut Vec<u8>,
    field: &IndexField,
    value: &FieldValue,
) -> Result<(), IndexError> {
    match (&field.field_type, value) {
        (FieldType::Integer, FieldValue::Integer(v)) => {
            encode_packed_int(buf, i64::from(*v));
            Ok(())
        }
        (FieldType::Long, FieldValue::Long(v)) => {
            encode_packed_int(buf, *v);
            Ok(())
        }
        (FieldType::Float, FieldValue::Float(v)) => {
            buf.extend_from_slice(&f32_to_ordered(v.get()).to_be_bytes());
            Ok(())
        }
        (FieldType::Double, FieldValue::Double(v)) => {
            buf.extend_from_slice(&f64_to_ordered(v.get()).to_be_bytes());
            Ok(())
        }
        (FieldType::Number, FieldValue::Number(v)) => encode_decimal(buf, *v),
        (FieldType::String, FieldValue::String(s)) => {
            if s.as_bytes().contains(&STRING_TERMINATOR) {
                return Err(IndexError::codec_unsupported(format!(
                    "field '{}': string values may not contain NUL",
                    field.name
                )));
            }
            buf.extend_from_slice(s.as_bytes());
            buf.push(STRING_TERMINATOR);
            Ok(())
        }
        (FieldType::Boolean, FieldValue::Boolean(b)) => {
            buf.push(u8::from(*b));
            Ok(())
        }
        (FieldType::Enum(def), FieldValue::Enum(symbol)) => {
            if def.symbol_at(symbol.position) != Some(symbol.symbol.as_str()) {
                return Err(IndexError::codec_invariant(format!(
                    "field '{}': symbol '{}' does not match enum '{}' at position {}",
                    field.name, symbol.symbol, def.name, symbol.position
                )));
            }
            let position = i64::try_from(symbol.position).map_err(|_| {
                IndexError::codec_invariant(format!(
                    "field '{}': enum position {} out of range",
                    field.name, symbol.position
                ))
            })?;
            encode_packed_int(buf, position);
            Ok(())
        }
        (FieldType::Timestamp(precision), FieldValue::Timestamp(ts)) => {
            let normalized = ts.rescale(*precision).map_err(|err| {
                IndexError::codec_invariant(format!("field '{}': {err}", field.name))
            })?;
            buf.extend_from_slice(
                &(normalized.units().cast_unsigned() ^ SIGN64).to_be_bytes(),
            );
            Ok(())
        }
        _ => Err(IndexError::codec_invariant(format!(
            "field '{}': expected a {} value, found {}",
            field.name,
            field.field_type.label(),
            value.label()
        ))),
    }
}

///
/// DECODING
///

/// Decode `bytes` back into an [`IndexKey`].
///
/// A clean stop at a column boundary yields a partial key and is legal only
/// with `partial_ok`; truncation mid-column or trailing bytes are always
/// corruption.
pub fn deserialize_key(
    definition: &IndexDefinition,
    bytes: &[u8],
    partial_ok: bool,
) -> Result<IndexKey, IndexError> {
    let mut key = IndexKey::new(definition);
    let mut pos = 0;

    for (position, field) in definition.fields().iter().enumerate() {
        if pos == bytes.len() {
            if partial_ok {
                return Ok(key);
            }
            return Err(IndexError::codec_corruption(format!(
                "key for index truncated at column '{}'",
                field.name
            )));
        }

        let value = if field.nullable {
            let indicator = bytes[pos];
            pos += 1;
            match indicator {
                NOT_NULL_INDICATOR => decode_value(bytes, &mut pos, field)?,
                NULL_INDICATOR => FieldValue::Null,
                JSON_NULL_INDICATOR => FieldValue::JsonNull,
                other => {
                    return Err(IndexError::codec_corruption(format!(
                        "column '{}': invalid null indicator 0x{other:02x}",
                        field.name
                    )));
                }
            }
        } else {
            decode_value(bytes, &mut pos, field)?
        };

        key.columns[position] = Some(value);
    }

    if pos != bytes.len() {
        return Err(IndexError::codec_corruption(format!(
            "{} trailing bytes after the last declared column",
            bytes.len() - pos
        )));
    }

    Ok(key)
}

/// Decode `bytes` and write each column's value into `row` at the field's
/// original (un-flattened) path. Used to reconstruct a sparse row purely
/// from an index entry.
pub fn extract_into_row(
    definition: &IndexDefinition,
    bytes: &[u8],
    row: &mut FieldValue,
) -> Result<(), IndexError> {
    let key = deserialize_key(definition, bytes, true)?;

    // The decoded map key, when the definition carries a keys() column.
    let mut map_key: Option<String> = None;
    for (position, field) in definition.fields().iter().enumerate() {
        if field.kind == PathKind::MapKey {
            if let Some(FieldValue::String(k)) = key.get(position) {
                map_key = Some(k.clone());
            }
        }
    }

    for (position, field) in definition.fields().iter().enumerate() {
        let Some(value) = key.get(position) else {
            continue;
        };

        // A NULL at a multi-key column is the degenerate absent-locus entry;
        // projecting it would fabricate container structure.
        if value.is_null() && field.is_multikey() {
            continue;
        }

        let locus = field.locus;
        match field.kind {
            PathKind::Value => put_at_path(row, field.path.steps(), value.clone())?,
            PathKind::MapKey => {
                let Some(locus) = locus else {
                    return Err(IndexError::codec_invariant(format!(
                        "column '{}' is a map key without a locus",
                        field.name
                    )));
                };
                let FieldValue::String(k) = value else {
                    return Err(IndexError::codec_invariant(format!(
                        "column '{}': map key decoded as {}",
                        field.name,
                        value.label()
                    )));
                };
                let prefix = &field.path.steps()[..locus];
                let present = find_at_path(row, prefix)
                    .and_then(FieldValue::try_as_map)
                    .is_some_and(|entries| entries.iter().any(|(name, _)| name == k));
                if !present {
                    put_map_entry(row, prefix, k, &[], FieldValue::Null)?;
                }
            }
            PathKind::MapValue => {
                let Some(locus) = locus else {
                    return Err(IndexError::codec_invariant(format!(
                        "column '{}' is a map value without a locus",
                        field.name
                    )));
                };
                let Some(k) = map_key.as_deref() else {
                    return Err(IndexError::codec_unsupported(format!(
                        "column '{}': cannot project a map value without its key column",
                        field.name
                    )));
                };
                let steps = field.path.steps();
                put_map_entry(row, &steps[..locus], k, &steps[locus + 1..], value.clone())?;
            }
        }
    }

    Ok(())
}

/// Re-encode a null-indicator-bearing key in the legacy (indicator-free)
/// layout for readers that predate null support. One-way and lossy: a NULL
/// column fails unless `fallback` supplies a concrete value for it.
pub fn reserialize_to_legacy(
    definition: &IndexDefinition,
    bytes: &[u8],
    fallback: Option<&IndexKey>,
) -> Result<Vec<u8>, IndexError> {
    let key = deserialize_key(definition, bytes, true)?;
    let mut buf = Vec::new();

    for (position, field) in definition.fields().iter().enumerate() {
        let Some(value) = key.get(position) else {
            break;
        };
        let value = if value.is_null() {
            match fallback.and_then(|f| f.get(position)) {
                Some(substitute) if !substitute.is_null() => substitute,
                _ => {
                    return Err(IndexError::codec_unsupported(format!(
                        "legacy key format cannot represent NULL in column '{}'",
                        field.name
                    )));
                }
            }
        } else {
            value
        };
        encode_value(&mut buf, field, value)?;
    }

    Ok(buf)
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], IndexError> {
    let end = pos
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| IndexError::codec_corruption("unexpected end of key bytes"))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn decode_value(
    bytes: &[u8],
    pos: &mut usize,
    field: &IndexField,
) -> Result<FieldValue, IndexError> {
    match &field.field_type {
        FieldType::Integer => {
            let wide = decode_packed_int(bytes, pos)?;
            let narrow = i32::try_from(wide).map_err(|_| {
                IndexError::codec_corruption(format!(
                    "column '{}': integer {wide} out of 32-bit range",
                    field.name
                ))
            })?;
            Ok(FieldValue::Integer(narrow))
        }
        FieldType::Long => Ok(FieldValue::Long(decode_packed_int(bytes, pos)?)),
        FieldType::Float => {
            let raw = take(bytes, pos, 4)?;
            let ordered = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
            let value = Float32::try_new(f32_from_ordered(ordered)).map_err(|_| {
                IndexError::codec_corruption(format!(
                    "column '{}': decoded float is NaN",
                    field.name
                ))
            })?;
            Ok(FieldValue::Float(value))
        }
        FieldType::Double => {
            let raw = take(bytes, pos, 8)?;
            let mut be = [0u8; 8];
            be.copy_from_slice(raw);
            let value = Float64::try_new(f64_from_ordered(u64::from_be_bytes(be)))
                .map_err(|_| {
                    IndexError::codec_corruption(format!(
                        "column '{}': decoded double is NaN",
                        field.name
                    ))
                })?;
            Ok(FieldValue::Double(value))
        }
        FieldType::Number => Ok(FieldValue::Number(decode_decimal(bytes, pos)?)),
        FieldType::String => {
            let start = *pos;
            let terminator = bytes[start..]
                .iter()
                .position(|b| *b == STRING_TERMINATOR)
                .ok_or_else(|| {
                    IndexError::codec_corruption(format!(
                        "column '{}': unterminated string",
                        field.name
                    ))
                })?;
            let raw = &bytes[start..start + terminator];
            *pos = start + terminator + 1;
            let s = std::str::from_utf8(raw).map_err(|_| {
                IndexError::codec_corruption(format!(
                    "column '{}': string is not valid UTF-8",
                    field.name
                ))
            })?;
            Ok(FieldValue::String(s.to_string()))
        }
        FieldType::Boolean => match take(bytes, pos, 1)?[0] {
            0 => Ok(FieldValue::Boolean(false)),
            1 => Ok(FieldValue::Boolean(true)),
            other => Err(IndexError::codec_corruption(format!(
                "column '{}': invalid boolean byte 0x{other:02x}",
                field.name
            ))),
        },
        FieldType::Enum(def) => {
            let wide = decode_packed_int(bytes, pos)?;
            let position = usize::try_from(wide).ok().filter(|p| *p < def.symbols.len());
            let Some(position) = position else {
                return Err(IndexError::codec_corruption(format!(
                    "column '{}': enum position {wide} not declared by '{}'",
                    field.name, def.name
                )));
            };
            Ok(FieldValue::Enum(EnumSymbol {
                position,
                symbol: def.symbols[position].clone(),
            }))
        }
        FieldType::Timestamp(precision) => {
            let raw = take(bytes, pos, 8)?;
            let mut be = [0u8; 8];
            be.copy_from_slice(raw);
            let units = (u64::from_be_bytes(be) ^ SIGN64).cast_signed();
            let ts = TimestampValue::new(units, *precision).map_err(|err| {
                IndexError::codec_corruption(format!("column '{}': {err}", field.name))
            })?;
            Ok(FieldValue::Timestamp(ts))
        }
        other => Err(IndexError::codec_unsupported(format!(
            "column '{}': type {} has no binary key encoding",
            field.name,
            other.label()
        ))),
    }
}

///
/// PRIMITIVES
///

// Variable-length order-preserving integer. The prefix byte alone separates
// sign and length buckets; within a bucket, the payload bytes are monotone.
fn encode_packed_int(buf: &mut Vec<u8>, value: i64) {
    if value >= 0 {
        let magnitude = value.cast_unsigned();
        let len = usize::try_from(u64::BITS - magnitude.leading_zeros())
            .unwrap_or(0)
            .div_ceil(8);
        #[expect(clippy::cast_possible_truncation)]
        buf.push(PACKED_POSITIVE_BASE + len as u8);
        buf.extend_from_slice(&magnitude.to_be_bytes()[8 - len..]);
    } else {
        // Minimal two's-complement width including the sign bit.
        let significant = 65 - usize::try_from(value.leading_ones()).unwrap_or(0);
        let len = significant.div_ceil(8);
        #[expect(clippy::cast_possible_truncation)]
        buf.push(PACKED_NEGATIVE_BASE - len as u8);
        buf.extend_from_slice(&value.to_be_bytes()[8 - len..]);
    }
}

fn decode_packed_int(bytes: &[u8], pos: &mut usize) -> Result<i64, IndexError> {
    let prefix = take(bytes, pos, 1)?[0];

    if prefix >= PACKED_POSITIVE_BASE {
        let len = usize::from(prefix - PACKED_POSITIVE_BASE);
        if len > 8 {
            return Err(IndexError::codec_corruption(format!(
                "packed integer length {len} exceeds 8"
            )));
        }
        let payload = take(bytes, pos, len)?;
        if payload.first() == Some(&0) {
            return Err(IndexError::codec_corruption(
                "non-canonical packed integer (leading zero byte)",
            ));
        }
        let mut magnitude: u64 = 0;
        for byte in payload {
            magnitude = magnitude << 8 | u64::from(*byte);
        }
        if magnitude > i64::MAX.cast_unsigned() {
            return Err(IndexError::codec_corruption(
                "packed integer magnitude exceeds i64::MAX",
            ));
        }
        Ok(magnitude.cast_signed())
    } else {
        let len = usize::from(PACKED_NEGATIVE_BASE - prefix);
        if len == 0 || len > 8 {
            return Err(IndexError::codec_corruption(format!(
                "invalid packed integer prefix 0x{prefix:02x}"
            )));
        }
        let payload = take(bytes, pos, len)?;
        if payload[0] & 0x80 == 0 {
            return Err(IndexError::codec_corruption(
                "packed negative integer missing its sign bit",
            ));
        }
        if len > 1 && payload[0] == 0xFF && payload[1] & 0x80 != 0 {
            return Err(IndexError::codec_corruption(
                "non-canonical packed integer (redundant sign byte)",
            ));
        }
        let mut value: i64 = -1;
        for byte in payload {
            value = value << 8 | i64::from(*byte);
        }
        Ok(value)
    }
}

const fn f32_to_ordered(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & SIGN32 == 0 { bits ^ SIGN32 } else { !bits }
}

const fn f32_from_ordered(ordered: u32) -> f32 {
    let bits = if ordered & SIGN32 != 0 {
        ordered ^ SIGN32
    } else {
        !ordered
    };
    f32::from_bits(bits)
}

const fn f64_to_ordered(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & SIGN64 == 0 { bits ^ SIGN64 } else { !bits }
}

const fn f64_from_ordered(ordered: u64) -> f64 {
    let bits = if ordered & SIGN64 != 0 {
        ordered ^ SIGN64
    } else {
        !ordered
    };
    f64::from_bits(bits)
}

// Sign bucket, biased decimal exponent, then the significant digits in
// scientific form (0.d1..dn * 10^exponent). Negatives invert the exponent
// and digit bytes and close with 0xFF so shorter digit strings sort later.
fn encode_decimal(buf: &mut Vec<u8>, value: Decimal) -> Result<(), IndexError> {
    let normalized = value.normalize();
    if normalized.is_zero() {
        buf.push(DECIMAL_ZERO);
        return Ok(());
    }

    let digits = normalized.mantissa().unsigned_abs().to_string();
    let scale = i32::try_from(normalized.scale())
        .map_err(|_| IndexError::codec_invariant("decimal scale out of range"))?;
    let exponent = i32::try_from(digits.len())
        .map_err(|_| IndexError::codec_invariant("decimal width out of range"))?
        - scale;
    let biased = u8::try_from(exponent + DECIMAL_EXPONENT_BIAS)
        .map_err(|_| IndexError::codec_invariant("decimal exponent out of range"))?;

    // Trailing zeros move into the exponent so equal values share one
    // canonical byte form.
    let digits = digits.trim_end_matches('0').as_bytes();

    if normalized.is_sign_positive() {
        buf.push(DECIMAL_POSITIVE);
        buf.push(biased);
        buf.extend_from_slice(digits);
        buf.push(DECIMAL_POSITIVE_TERMINATOR);
    } else {
        buf.push(DECIMAL_NEGATIVE);
        buf.push(!biased);
        buf.extend(digits.iter().map(|b| !b));
        buf.push(DECIMAL_NEGATIVE_TERMINATOR);
    }
    Ok(())
}

fn decode_decimal(bytes: &[u8], pos: &mut usize) -> Result<Decimal, IndexError> {
    let bucket = take(bytes, pos, 1)?[0];
    match bucket {
        DECIMAL_ZERO => Ok(Decimal::ZERO),
        DECIMAL_POSITIVE => {
            let biased = take(bytes, pos, 1)?[0];
            let exponent = i32::from(biased) - DECIMAL_EXPONENT_BIAS;
            let start = *pos;
            let end = bytes[start..]
                .iter()
                .position(|b| *b == DECIMAL_POSITIVE_TERMINATOR)
                .ok_or_else(|| IndexError::codec_corruption("unterminated decimal digits"))?;
            let digits = bytes[start..start + end].to_vec();
            *pos = start + end + 1;
            rebuild_decimal(&digits, exponent, false)
        }
        DECIMAL_NEGATIVE => {
            let biased = !take(bytes, pos, 1)?[0];
            let exponent = i32::from(biased) - DECIMAL_EXPONENT_BIAS;
            let start = *pos;
            let end = bytes[start..]
                .iter()
                .position(|b| *b == DECIMAL_NEGATIVE_TERMINATOR)
                .ok_or_else(|| IndexError::codec_corruption("unterminated decimal digits"))?;
            let digits: Vec<u8> = bytes[start..start + end].iter().map(|b| !b).collect();
            *pos = start + end + 1;
            rebuild_decimal(&digits, exponent, true)
        }
        other => Err(IndexError::codec_corruption(format!(
            "invalid decimal sign bucket 0x{other:02x}"
        ))),
    }
}

fn rebuild_decimal(digits: &[u8], exponent: i32, negative: bool) -> Result<Decimal, IndexError> {
    if digits.is_empty() || digits[0] == b'0' || digits[digits.len() - 1] == b'0' {
        return Err(IndexError::codec_corruption(
            "non-canonical decimal digit string",
        ));
    }

    let mut mantissa: u128 = 0;
    for digit in digits {
        if !digit.is_ascii_digit() {
            return Err(IndexError::codec_corruption(format!(
                "invalid decimal digit byte 0x{digit:02x}"
            )));
        }
        mantissa = mantissa
            .checked_mul(10)
            .and_then(|m| m.checked_add(u128::from(digit - b'0')))
            .ok_or_else(|| IndexError::codec_corruption("decimal mantissa overflows"))?;
    }

    let digit_count = i32::try_from(digits.len())
        .map_err(|_| IndexError::codec_corruption("decimal digit string too long"))?;
    let mut scale = digit_count - exponent;
    while scale < 0 {
        mantissa = mantissa
            .checked_mul(10)
            .ok_or_else(|| IndexError::codec_corruption("decimal mantissa overflows"))?;
        scale += 1;
    }

    let scale = u32::try_from(scale)
        .ok()
        .filter(|s| *s <= 28)
        .ok_or_else(|| IndexError::codec_corruption("decimal scale exceeds 28"))?;
    if mantissa >= 1 << 96 {
        return Err(IndexError::codec_corruption(
            "decimal mantissa exceeds 96 bits",
        ));
    }

    #[expect(clippy::cast_possible_wrap)]
    let mut value = Decimal::from_i128_with_scale(mantissa as i128, scale);
    value.set_sign_negative(negative);
    Ok(value)
}
