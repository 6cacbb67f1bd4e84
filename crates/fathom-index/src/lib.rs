//! Secondary-index core for a sharded table store: schema-aware sortable
//! key codec, multi-key (array/map) extraction, range descriptors, and the
//! scatter-gather merge iterator, plus the ergonomics exported via the
//! `prelude`.
#![warn(unreachable_pub)]

pub mod direction;
pub mod error;
pub mod index;
pub mod obs;
pub mod path;
pub mod scan;
pub mod schema;
pub mod value;

///
/// CONSTANTS
///

/// Null-indicator byte for a present (non-null) value in a nullable column.
pub const NOT_NULL_INDICATOR: u8 = 0x00;

/// Null-indicator byte for SQL NULL in a nullable column.
/// Sorts after every non-null value ("null sorts last").
pub const NULL_INDICATOR: u8 = 0x01;

/// Null-indicator byte for a JSON null in a nullable column.
/// Sorts after SQL NULL; both null flavors sort after all non-null values.
pub const JSON_NULL_INDICATOR: u8 = 0x02;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, codecs, scanners, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        direction::Direction,
        index::{FieldRange, IndexDefinition, IndexKey, IndexOptions, IndexStatus},
        path::TablePath,
        schema::TableSchema,
        value::{FieldType, FieldValue},
    };
}
