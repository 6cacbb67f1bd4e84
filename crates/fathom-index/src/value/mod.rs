mod compare;
mod float;
mod navigate;

#[cfg(test)]
mod tests;

pub use compare::cmp_index_values;
pub use float::{Float32, Float64, FloatError};
pub use navigate::{find_at_path, put_at_path, put_map_entry};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// FieldType
///
/// Closed tag over every type a table column can carry. Complex types own
/// their element/field definitions; ownership is a tree, never a cycle.
/// `Any` and `Json` are dynamic-schema markers and never appear as an
/// indexed column's resolved type.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FieldType {
    Integer,
    Long,
    Float,
    Double,
    Number,
    String,
    Boolean,
    Binary,
    FixedBinary(usize),
    Enum(EnumDef),
    /// Timestamp with `precision` fractional-second digits (0..=9).
    Timestamp(u8),
    Array(Box<FieldType>),
    /// Map element type; map keys are always strings.
    Map(Box<FieldType>),
    Record(RecordDef),
    Any,
    Json,
}

impl FieldType {
    /// True for the atomic types an index column may terminate in.
    /// Binary/FixedBinary/Record/Array/Map/Any/Json are not indexable leaves.
    #[must_use]
    pub const fn is_indexable_leaf(&self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::Number
                | Self::String
                | Self::Boolean
                | Self::Enum(_)
                | Self::Timestamp(_)
        )
    }

    #[must_use]
    pub const fn is_complex(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Map(_) | Self::Record(_))
    }

    /// Stable lower-case label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
            Self::FixedBinary(_) => "fixed_binary",
            Self::Enum(_) => "enum",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Any => "any",
            Self::Json => "json",
        }
    }

    /// True when `value` is a well-typed instance of this type.
    /// Null flavors are accepted for every type; nullability is a column
    /// property, not a type property.
    #[must_use]
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (_, FieldValue::Null | FieldValue::JsonNull) => true,
            (Self::Integer, FieldValue::Integer(_))
            | (Self::Long, FieldValue::Long(_))
            | (Self::Float, FieldValue::Float(_))
            | (Self::Double, FieldValue::Double(_))
            | (Self::Number, FieldValue::Number(_))
            | (Self::String, FieldValue::String(_))
            | (Self::Boolean, FieldValue::Boolean(_))
            | (Self::Binary, FieldValue::Binary(_))
            | (Self::Record(_), FieldValue::Record(_))
            | (Self::Any | Self::Json, _) => true,
            (Self::FixedBinary(size), FieldValue::FixedBinary(bytes)) => bytes.len() == *size,
            (Self::Enum(def), FieldValue::Enum(symbol)) => {
                def.symbol_at(symbol.position) == Some(symbol.symbol.as_str())
            }
            (Self::Timestamp(_), FieldValue::Timestamp(_)) => true,
            (Self::Array(element), FieldValue::Array(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (Self::Map(element), FieldValue::Map(entries)) => {
                entries.iter().all(|(_, item)| element.accepts(item))
            }
            _ => false,
        }
    }
}

///
/// EnumDef
///
/// Declaration-ordered symbol list. Index ordering of enum values follows
/// declaration order, never lexical order.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EnumDef {
    pub name: String,
    pub symbols: Vec<String>,
}

impl EnumDef {
    #[must_use]
    pub fn new(name: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            name: name.into(),
            symbols: symbols.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn position_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    #[must_use]
    pub fn symbol_at(&self, position: usize) -> Option<&str> {
        self.symbols.get(position).map(String::as_str)
    }

    /// Build the value for `symbol`, if declared.
    #[must_use]
    pub fn value_of(&self, symbol: &str) -> Option<EnumSymbol> {
        self.position_of(symbol).map(|position| EnumSymbol {
            position,
            symbol: symbol.to_string(),
        })
    }
}

///
/// RecordDef
///
/// Ordered named fields of a record type (or of a table row shape).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordDef {
    pub fields: Vec<FieldDef>,
}

impl RecordDef {
    #[must_use]
    pub const fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Case-insensitive field lookup.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }
}

///
/// FieldDef
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub default: Option<FieldValue>,
}

impl FieldDef {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
            default: None,
        }
    }
}

///
/// EnumSymbol
///
/// One declared enum symbol plus its declaration position. Ordering is by
/// position so comparison matches the packed index encoding.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct EnumSymbol {
    pub position: usize,
    pub symbol: String,
}

impl PartialOrd for EnumSymbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnumSymbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position.cmp(&other.position)
    }
}

///
/// TimestampError
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum TimestampError {
    #[error("timestamp precision {0} exceeds the supported maximum of 9")]
    PrecisionOutOfRange(u8),

    #[error("timestamp overflows at the requested precision")]
    Overflow,

    #[error("timestamp has sub-unit digits that precision {0} cannot carry")]
    PrecisionLoss(u8),
}

/// Maximum fractional-second digits a timestamp column may declare.
pub const MAX_TIMESTAMP_PRECISION: u8 = 9;

const POW10: [i64; 10] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

///
/// TimestampValue
///
/// Signed count of 10^-precision-second units since the epoch. Two values at
/// different precisions compare semantically (1s@p0 == 1000ms@p3); encoding
/// normalizes to the column's declared precision so mixed-precision writes
/// stay byte-comparable.
///

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct TimestampValue {
    units: i64,
    precision: u8,
}

impl TimestampValue {
    pub const fn new(units: i64, precision: u8) -> Result<Self, TimestampError> {
        if precision > MAX_TIMESTAMP_PRECISION {
            return Err(TimestampError::PrecisionOutOfRange(precision));
        }
        Ok(Self { units, precision })
    }

    #[must_use]
    pub const fn units(self) -> i64 {
        self.units
    }

    #[must_use]
    pub const fn precision(self) -> u8 {
        self.precision
    }

    /// Re-express this timestamp at `target` precision.
    /// Scaling up is exact (checked for overflow); scaling down requires the
    /// dropped digits to be zero.
    pub fn rescale(self, target: u8) -> Result<Self, TimestampError> {
        if target > MAX_TIMESTAMP_PRECISION {
            return Err(TimestampError::PrecisionOutOfRange(target));
        }

        let units = if target >= self.precision {
            let factor = POW10[usize::from(target - self.precision)];
            self.units
                .checked_mul(factor)
                .ok_or(TimestampError::Overflow)?
        } else {
            let factor = POW10[usize::from(self.precision - target)];
            if self.units % factor != 0 {
                return Err(TimestampError::PrecisionLoss(target));
            }
            self.units / factor
        };

        Ok(Self {
            units,
            precision: target,
        })
    }

    fn normalized_pair(self, other: Self) -> (i128, i128) {
        let precision = self.precision.max(other.precision);
        let left = i128::from(self.units)
            * i128::from(POW10[usize::from(precision - self.precision)]);
        let right = i128::from(other.units)
            * i128::from(POW10[usize::from(precision - other.precision)]);
        (left, right)
    }
}

impl PartialEq for TimestampValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimestampValue {}

impl PartialOrd for TimestampValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimestampValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let (left, right) = self.normalized_pair(*other);
        left.cmp(&right)
    }
}

///
/// MapValueError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MapValueError {
    #[error("map contains duplicate key '{key}'")]
    DuplicateKey { key: String },
}

///
/// FieldValue
///
/// A value tagged by [`FieldType`]. `Null` is SQL NULL; `JsonNull` is the
/// distinct JSON null. Both sort after every non-null value, with
/// Null < JsonNull fixed so value order and indicator-byte order agree.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FieldValue {
    Integer(i32),
    Long(i64),
    Float(Float32),
    Double(Float64),
    Number(Decimal),
    String(String),
    Boolean(bool),
    Binary(Vec<u8>),
    FixedBinary(Vec<u8>),
    Enum(EnumSymbol),
    Timestamp(TimestampValue),
    /// Ordered element list.
    Array(Vec<FieldValue>),
    /// Map entries sorted by key; keys are unique.
    Map(Vec<(String, FieldValue)>),
    /// Ordered named fields, matching the owning RecordDef's order.
    Record(Vec<(String, FieldValue)>),
    JsonNull,
    Null,
}

impl FieldValue {
    ///
    /// CONSTRUCTION
    ///

    /// Build a canonical `Map`: entries sorted by key, duplicates rejected.
    pub fn from_map(
        mut entries: Vec<(String, FieldValue)>,
    ) -> Result<Self, MapValueError> {
        entries.sort_by(|(left, _), (right, _)| left.cmp(right));

        for window in entries.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(MapValueError::DuplicateKey {
                    key: window[0].0.clone(),
                });
            }
        }

        Ok(Self::Map(entries))
    }

    /// Build a `Double`, rejecting NaN.
    pub const fn double(value: f64) -> Result<Self, FloatError> {
        match Float64::try_new(value) {
            Ok(v) => Ok(Self::Double(v)),
            Err(err) => Err(err),
        }
    }

    /// Build a `Float`, rejecting NaN.
    pub const fn float(value: f32) -> Result<Self, FloatError> {
        match Float32::try_new(value) {
            Ok(v) => Ok(Self::Float(v)),
            Err(err) => Err(err),
        }
    }

    ///
    /// TYPES
    ///

    /// True for either null flavor.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::JsonNull)
    }

    #[must_use]
    pub const fn is_complex(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Map(_) | Self::Record(_))
    }

    /// Stable lower-case label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Binary(_) => "binary",
            Self::FixedBinary(_) => "fixed_binary",
            Self::Enum(_) => "enum",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::JsonNull => "json_null",
            Self::Null => "null",
        }
    }

    ///
    /// CONVERSION
    ///

    #[must_use]
    pub const fn try_as_str(&self) -> Option<&str> {
        if let Self::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    #[must_use]
    pub const fn try_as_array(&self) -> Option<&[Self]> {
        if let Self::Array(items) = self {
            Some(items.as_slice())
        } else {
            None
        }
    }

    #[must_use]
    pub const fn try_as_map(&self) -> Option<&[(String, Self)]> {
        if let Self::Map(entries) = self {
            Some(entries.as_slice())
        } else {
            None
        }
    }

    #[must_use]
    pub const fn try_as_record(&self) -> Option<&[(String, Self)]> {
        if let Self::Record(fields) = self {
            Some(fields.as_slice())
        } else {
            None
        }
    }

    /// Case-insensitive record field lookup.
    #[must_use]
    pub fn record_field(&self, name: &str) -> Option<&Self> {
        self.try_as_record()?
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Cross-numeric promotion target; `None` for non-numeric variants.
    pub(crate) fn to_decimal(&self) -> Option<Decimal> {
        use rust_decimal::prelude::FromPrimitive;

        match self {
            Self::Integer(v) => Some(Decimal::from(*v)),
            Self::Long(v) => Some(Decimal::from(*v)),
            Self::Number(v) => Some(*v),
            Self::Float(v) => Decimal::from_f32(v.get()),
            Self::Double(v) => Decimal::from_f64(v.get()),
            _ => None,
        }
    }

    /// Lossy f64 view used only when decimal promotion fails (infinities).
    #[expect(clippy::cast_precision_loss)]
    pub(crate) const fn to_f64_wide(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Long(v) => Some(*v as f64),
            Self::Float(v) => Some(v.get() as f64),
            Self::Double(v) => Some(v.get()),
            _ => None,
        }
    }

    pub(crate) const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Integer(_) | Self::Long(_) | Self::Float(_) | Self::Double(_) | Self::Number(_)
        )
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        Self::Number(v)
    }
}
