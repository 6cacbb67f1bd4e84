//! Module: schema
//! Responsibility: the table-schema surface index definitions resolve
//! against. Only the narrow slice the index subsystem needs lives here.

use crate::path::{PathStep, TablePath};
use crate::value::{FieldType, RecordDef};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// SchemaError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("field '{field}' not found while resolving path '{path}'")]
    FieldNotFound { path: String, field: String },

    #[error("path '{path}': array must be accessed via its element marker")]
    ArrayAccess { path: String },

    #[error("path '{path}': map must be accessed via keys() or its element marker")]
    MapAccess { path: String },

    #[error("path '{path}': marker step does not match the traversed type")]
    MarkerMismatch { path: String },

    #[error("path '{path}' continues past an atomic field")]
    OverSpecified { path: String },
}

///
/// PathKind
///
/// How a resolved path relates to a map it traverses: a plain value, the
/// map's key, or the map's value.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum PathKind {
    #[default]
    Value,
    MapKey,
    MapValue,
}

///
/// ResolvedPath
///
/// Everything the definition builder needs to know about one path after
/// walking it against the schema tree.
///

#[derive(Clone, Debug)]
pub struct ResolvedPath {
    /// Type at the end of the path. `Keys` paths terminate in `String`.
    pub terminal: FieldType,

    /// Nullability of the last named schema field on the path.
    pub field_nullable: bool,

    /// True when the path traverses any nested structure.
    pub passes_complex: bool,

    /// Step count of the prefix ending at the first array/map the path
    /// traverses; `None` for single-key paths.
    pub locus: Option<usize>,

    pub kind: PathKind,
}

impl ResolvedPath {
    #[must_use]
    pub const fn is_multikey(&self) -> bool {
        self.locus.is_some()
    }
}

///
/// TableSchema
///
/// Generation-tagged row shape plus the primary-key column names. An
/// `IndexDefinition` pins the generation it was built against; schema
/// evolution bumps the generation and invalidates dependent definitions.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub generation: u64,
    pub row: RecordDef,
    pub primary_key: Vec<String>,
}

enum Cursor<'a> {
    Row(&'a RecordDef),
    Typed(&'a FieldType),
}

const STRING_TYPE: FieldType = FieldType::String;

impl TableSchema {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        generation: u64,
        row: RecordDef,
        primary_key: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            generation,
            row,
            primary_key,
        }
    }

    /// True when `field` names a primary-key column. Only top-level fields
    /// can be part of the primary key.
    #[must_use]
    pub fn primary_key_contains(&self, field: &str) -> bool {
        self.primary_key
            .iter()
            .any(|pk| pk.eq_ignore_ascii_case(field))
    }

    /// Walk `path` against the schema tree.
    pub fn resolve_path(&self, path: &TablePath) -> Result<ResolvedPath, SchemaError> {
        let steps = path.steps();
        let spelled = path.to_string();

        let mut cursor = Cursor::Row(&self.row);
        let mut field_nullable = false;
        let mut locus = None;
        let mut kind = PathKind::Value;

        for (position, step) in steps.iter().enumerate() {
            match step {
                PathStep::Field(name) => {
                    let record = match cursor {
                        Cursor::Row(record) => record,
                        Cursor::Typed(FieldType::Record(record)) => record,
                        Cursor::Typed(FieldType::Array(_)) => {
                            return Err(SchemaError::ArrayAccess { path: spelled });
                        }
                        Cursor::Typed(FieldType::Map(_)) => {
                            return Err(SchemaError::MapAccess { path: spelled });
                        }
                        Cursor::Typed(_) => {
                            return Err(SchemaError::OverSpecified { path: spelled });
                        }
                    };
                    let def =
                        record
                            .field(name)
                            .ok_or_else(|| SchemaError::FieldNotFound {
                                path: spelled.clone(),
                                field: name.clone(),
                            })?;
                    field_nullable = def.nullable;
                    cursor = Cursor::Typed(&def.field_type);
                }

                PathStep::Element => match cursor {
                    Cursor::Typed(FieldType::Array(element)) => {
                        locus.get_or_insert(position);
                        cursor = Cursor::Typed(element);
                    }
                    Cursor::Typed(FieldType::Map(element)) => {
                        if locus.is_none() {
                            locus = Some(position);
                            kind = PathKind::MapValue;
                        }
                        cursor = Cursor::Typed(element);
                    }
                    _ => return Err(SchemaError::MarkerMismatch { path: spelled }),
                },

                PathStep::Keys => match cursor {
                    Cursor::Typed(FieldType::Map(_)) => {
                        if position + 1 != steps.len() {
                            return Err(SchemaError::OverSpecified { path: spelled });
                        }
                        if locus.is_none() {
                            locus = Some(position);
                            kind = PathKind::MapKey;
                        }
                        cursor = Cursor::Typed(&STRING_TYPE);
                    }
                    _ => return Err(SchemaError::MarkerMismatch { path: spelled }),
                },
            }
        }

        let terminal = match cursor {
            Cursor::Typed(ty) => ty.clone(),
            Cursor::Row(record) => FieldType::Record(record.clone()),
        };

        Ok(ResolvedPath {
            terminal,
            field_nullable,
            passes_complex: steps.len() > 1,
            locus,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldDef;

    fn schema() -> TableSchema {
        let address = RecordDef::new(vec![
            FieldDef::new("city", FieldType::String, false),
            FieldDef::new("zip", FieldType::String, true),
        ]);
        let row = RecordDef::new(vec![
            FieldDef::new("id", FieldType::Long, false),
            FieldDef::new("name", FieldType::String, true),
            FieldDef::new("age", FieldType::Integer, true),
            FieldDef::new(
                "addresses",
                FieldType::Array(Box::new(FieldType::Record(address))),
                true,
            ),
            FieldDef::new("tags", FieldType::Map(Box::new(FieldType::String)), true),
        ]);
        TableSchema::new("users", 3, row, vec!["id".to_string()])
    }

    fn path(s: &str) -> TablePath {
        s.parse().unwrap()
    }

    #[test]
    fn resolves_top_level_field() {
        let resolved = schema().resolve_path(&path("name")).unwrap();
        assert_eq!(resolved.terminal, FieldType::String);
        assert!(resolved.field_nullable);
        assert!(!resolved.passes_complex);
        assert_eq!(resolved.locus, None);
        assert_eq!(resolved.kind, PathKind::Value);
    }

    #[test]
    fn resolves_array_element_field() {
        let resolved = schema().resolve_path(&path("addresses[].city")).unwrap();
        assert_eq!(resolved.terminal, FieldType::String);
        assert!(resolved.passes_complex);
        assert_eq!(resolved.locus, Some(1));
        assert_eq!(resolved.kind, PathKind::Value);
    }

    #[test]
    fn resolves_map_keys_and_values() {
        let keys = schema().resolve_path(&path("tags.keys()")).unwrap();
        assert_eq!(keys.terminal, FieldType::String);
        assert_eq!(keys.locus, Some(1));
        assert_eq!(keys.kind, PathKind::MapKey);

        let values = schema().resolve_path(&path("tags[]")).unwrap();
        assert_eq!(values.terminal, FieldType::String);
        assert_eq!(values.locus, Some(1));
        assert_eq!(values.kind, PathKind::MapValue);
    }

    #[test]
    fn array_requires_its_element_marker() {
        let err = schema().resolve_path(&path("addresses.city")).unwrap_err();
        assert!(matches!(err, SchemaError::ArrayAccess { .. }));
    }

    #[test]
    fn atomic_terminal_rejects_leftover_steps() {
        let err = schema().resolve_path(&path("name.inner")).unwrap_err();
        assert!(matches!(err, SchemaError::OverSpecified { .. }));

        let err = schema().resolve_path(&path("tags.keys().x")).unwrap_err();
        assert!(matches!(err, SchemaError::OverSpecified { .. }));
    }

    #[test]
    fn missing_field_is_reported_with_path() {
        let err = schema().resolve_path(&path("nope")).unwrap_err();
        assert_eq!(
            err,
            SchemaError::FieldNotFound {
                path: "nope".to_string(),
                field: "nope".to_string(),
            }
        );
    }

    #[test]
    fn marker_on_non_container_fails() {
        let err = schema().resolve_path(&path("name[]")).unwrap_err();
        assert!(matches!(err, SchemaError::MarkerMismatch { .. }));

        let err = schema().resolve_path(&path("addresses.keys()")).unwrap_err();
        assert!(matches!(err, SchemaError::MarkerMismatch { .. }));
    }
}
