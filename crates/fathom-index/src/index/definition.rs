//! Module: index::definition
//! Responsibility: validate declared field paths against a table schema and
//! build the immutable definition the codec, extraction, and scan layers
//! share.

use crate::path::TablePath;
use crate::schema::{PathKind, SchemaError, TableSchema};
use crate::value::{FieldDef, FieldType, RecordDef};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// DefinitionError
///
/// Raised at index-create time only, never at scan or write time. A failed
/// build registers no partial index.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DefinitionError {
    #[error("index requires at least one field")]
    EmptyFieldList,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("duplicate index field '{name}'")]
    DuplicateField { name: String },

    #[error("index may contain only one multi-key locus: '{first}' and '{second}' are independent")]
    MultipleMultiKeyLoci { first: String, second: String },

    #[error("path '{path}' indexes a whole {label} value; complex types are only valid as intermediate steps")]
    ComplexValueIndexed { path: String, label: String },

    #[error("path '{path}' terminates in un-indexable type {label}")]
    UnindexableType { path: String, label: String },

    #[error("index status cannot move from {from} to {to}")]
    InvalidStatusTransition { from: IndexStatus, to: IndexStatus },
}

///
/// IndexStatus
///
/// Build lifecycle. Transitions are strictly forward and driven externally
/// as the index is backfilled.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, derive_more::Display,
)]
pub enum IndexStatus {
    #[default]
    #[display("transient")]
    Transient,
    #[display("populating")]
    Populating,
    #[display("ready")]
    Ready,
}

///
/// IndexOptions
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexOptions {
    /// Enables the null-indicator byte on nullable columns. Disabled keeps
    /// the legacy encoding, where rows missing a column simply contribute
    /// no entry.
    pub supports_null: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            supports_null: true,
        }
    }
}

///
/// IndexField
///
/// One declared column: its path, the type the path resolves to, encoded-key
/// nullability, and where (if anywhere) the path crosses the index's
/// multi-key locus.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IndexField {
    pub path: TablePath,
    /// Canonical external spelling; doubles as the flattened key field name.
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    /// Step count of the prefix ending at the array/map this path traverses.
    pub locus: Option<usize>,
    pub kind: PathKind,
}

impl IndexField {
    #[must_use]
    pub const fn is_multikey(&self) -> bool {
        self.locus.is_some()
    }
}

///
/// IndexDefinition
///
/// Immutable once built, except for status transitions. Owned by exactly one
/// table schema generation; evolving the table invalidates it and callers
/// must rebuild against the new generation.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IndexDefinition {
    pub name: String,
    pub table: String,
    pub schema_generation: u64,
    fields: Vec<IndexField>,
    status: IndexStatus,
    pub supports_null: bool,
    key_shape: RecordDef,
    /// Shared multi-key locus prefix, when any field is multi-key.
    multikey_locus: Option<TablePath>,
}

impl IndexDefinition {
    /// Validate `paths` against `schema` and build the definition.
    pub fn build(
        schema: &TableSchema,
        name: impl Into<String>,
        paths: Vec<TablePath>,
        options: IndexOptions,
    ) -> Result<Self, DefinitionError> {
        if paths.is_empty() {
            return Err(DefinitionError::EmptyFieldList);
        }

        let mut fields: Vec<IndexField> = Vec::with_capacity(paths.len());
        let mut multikey_locus: Option<TablePath> = None;

        for path in paths {
            let spelled = path.to_string();
            let resolved = schema.resolve_path(&path)?;

            if fields.iter().any(|f| f.path == path) {
                return Err(DefinitionError::DuplicateField { name: spelled });
            }

            if resolved.terminal.is_complex() {
                return Err(DefinitionError::ComplexValueIndexed {
                    path: spelled,
                    label: resolved.terminal.label().to_string(),
                });
            }
            if !resolved.terminal.is_indexable_leaf() {
                return Err(DefinitionError::UnindexableType {
                    path: spelled,
                    label: resolved.terminal.label().to_string(),
                });
            }

            if let Some(locus_len) = resolved.locus {
                let locus = path.prefix(locus_len);
                match &multikey_locus {
                    None => multikey_locus = Some(locus),
                    Some(existing) if *existing == locus => {}
                    Some(existing) => {
                        return Err(DefinitionError::MultipleMultiKeyLoci {
                            first: existing.to_string(),
                            second: locus.to_string(),
                        });
                    }
                }
            }

            // A primary-key column can never be missing, so it never needs
            // the indicator byte.
            let on_primary_key = path.len() == 1
                && matches!(path.steps().first(),
                    Some(crate::path::PathStep::Field(f)) if schema.primary_key_contains(f));
            let nullable = options.supports_null
                && (resolved.passes_complex
                    || resolved.locus.is_some()
                    || (resolved.field_nullable && !on_primary_key));

            fields.push(IndexField {
                path,
                name: spelled,
                field_type: resolved.terminal,
                nullable,
                locus: resolved.locus,
                kind: resolved.kind,
            });
        }

        let key_shape = RecordDef::new(
            fields
                .iter()
                .map(|f| FieldDef::new(f.name.clone(), f.field_type.clone(), f.nullable))
                .collect(),
        );

        Ok(Self {
            name: name.into(),
            table: schema.name.clone(),
            schema_generation: schema.generation,
            fields,
            status: IndexStatus::Transient,
            supports_null: options.supports_null,
            key_shape,
            multikey_locus,
        })
    }

    #[must_use]
    pub fn fields(&self) -> &[IndexField] {
        &self.fields
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.fields.len()
    }

    /// Flattened record shape of a fully-specified key, in column order.
    #[must_use]
    pub const fn key_shape(&self) -> &RecordDef {
        &self.key_shape
    }

    #[must_use]
    pub const fn status(&self) -> IndexStatus {
        self.status
    }

    /// Move the build lifecycle forward. Only Transient -> Populating and
    /// Populating -> Ready are legal.
    pub fn advance_status(&mut self, to: IndexStatus) -> Result<(), DefinitionError> {
        let legal = matches!(
            (self.status, to),
            (IndexStatus::Transient, IndexStatus::Populating)
                | (IndexStatus::Populating, IndexStatus::Ready)
        );
        if !legal {
            return Err(DefinitionError::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    #[must_use]
    pub const fn multikey_locus(&self) -> Option<&TablePath> {
        self.multikey_locus.as_ref()
    }

    #[must_use]
    pub const fn is_multikey(&self) -> bool {
        self.multikey_locus.is_some()
    }

    /// True when a scan with the first `equality_columns` columns pinned to
    /// equality can still see one logical row through several physical
    /// entries, so the merge layer must deduplicate by primary key.
    #[must_use]
    pub fn requires_scan_dedup(&self, equality_columns: usize) -> bool {
        self.fields
            .iter()
            .enumerate()
            .any(|(position, field)| field.is_multikey() && position >= equality_columns)
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
            FieldDef::new("age", FieldType::Integer, true),
            FieldDef::new("photo", FieldType::Binary, true),
            FieldDef::new(
                "addresses",
                FieldType::Array(Box::new(FieldType::Record(address))),
                true,
            ),
            FieldDef::new("tags", FieldType::Map(Box::new(FieldType::String)), true),
            FieldDef::new(
                "scores",
                FieldType::Array(Box::new(FieldType::Integer)),
                true,
            ),
        ]);
        TableSchema::new("users", 1, row, vec!["id".to_string()])
    }

    fn paths(specs: &[&str]) -> Vec<TablePath> {
        specs.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn builds_single_column_definition() {
        let def = IndexDefinition::build(
            &schema(),
            "users_age",
            paths(&["age"]),
            IndexOptions::default(),
        )
        .unwrap();

        assert_eq!(def.table, "users");
        assert_eq!(def.schema_generation, 1);
        assert_eq!(def.status(), IndexStatus::Transient);
        assert_eq!(def.column_count(), 1);
        assert!(!def.is_multikey());

        let field = &def.fields()[0];
        assert_eq!(field.name, "age");
        assert_eq!(field.field_type, FieldType::Integer);
        assert!(field.nullable);
    }

    #[test]
    fn primary_key_column_is_never_nullable() {
        let def = IndexDefinition::build(
            &schema(),
            "users_id",
            paths(&["id"]),
            IndexOptions::default(),
        )
        .unwrap();
        assert!(!def.fields()[0].nullable);
    }

    #[test]
    fn legacy_mode_disables_all_nullability() {
        let def = IndexDefinition::build(
            &schema(),
            "users_age_legacy",
            paths(&["age"]),
            IndexOptions {
                supports_null: false,
            },
        )
        .unwrap();
        assert!(!def.fields()[0].nullable);
    }

    #[test]
    fn map_key_and_value_share_one_locus() {
        let def = IndexDefinition::build(
            &schema(),
            "users_tags",
            paths(&["tags.keys()", "tags[]"]),
            IndexOptions::default(),
        )
        .unwrap();

        assert!(def.is_multikey());
        assert_eq!(def.multikey_locus().unwrap().to_string(), "tags");
        assert_eq!(def.fields()[0].kind, PathKind::MapKey);
        assert_eq!(def.fields()[1].kind, PathKind::MapValue);
    }

    #[test]
    fn independent_loci_are_rejected() {
        let err = IndexDefinition::build(
            &schema(),
            "users_bad",
            paths(&["tags.keys()", "scores[]"]),
            IndexOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::MultipleMultiKeyLoci { .. }));
    }

    #[test]
    fn rejects_unindexable_and_complex_terminals() {
        let err = IndexDefinition::build(
            &schema(),
            "users_photo",
            paths(&["photo"]),
            IndexOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::UnindexableType { .. }));

        let err = IndexDefinition::build(
            &schema(),
            "users_addr",
            paths(&["addresses[]"]),
            IndexOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::ComplexValueIndexed { .. }));
    }

    #[test]
    fn rejects_duplicates_and_empty_lists() {
        let err = IndexDefinition::build(
            &schema(),
            "users_dup",
            paths(&["age", "Age"]),
            IndexOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DuplicateField {
                name: "Age".to_string()
            }
        );

        let err =
            IndexDefinition::build(&schema(), "users_none", vec![], IndexOptions::default())
                .unwrap_err();
        assert_eq!(err, DefinitionError::EmptyFieldList);
    }

    #[test]
    fn array_without_marker_surfaces_schema_error() {
        let err = IndexDefinition::build(
            &schema(),
            "users_addr_city",
            paths(&["addresses.city"]),
            IndexOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::Schema(SchemaError::ArrayAccess { .. })
        ));
    }

    #[test]
    fn status_transitions_are_strictly_forward() {
        let mut def = IndexDefinition::build(
            &schema(),
            "users_age",
            paths(&["age"]),
            IndexOptions::default(),
        )
        .unwrap();

        def.advance_status(IndexStatus::Populating).unwrap();
        def.advance_status(IndexStatus::Ready).unwrap();

        let err = def.advance_status(IndexStatus::Transient).unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::InvalidStatusTransition { .. }
        ));
    }

    #[test]
    fn definitions_survive_json_persistence() {
        let def = IndexDefinition::build(
            &schema(),
            "users_tags",
            paths(&["tags.keys()", "tags[]"]),
            IndexOptions::default(),
        )
        .unwrap();

        let json = serde_json::to_string(&def).unwrap();
        let back: IndexDefinition = serde_json::from_str(&json).unwrap();

        assert_eq!(back.name, def.name);
        assert_eq!(back.table, def.table);
        assert_eq!(back.schema_generation, def.schema_generation);
        assert_eq!(back.status(), def.status());
        assert_eq!(back.column_count(), def.column_count());
        assert_eq!(
            back.multikey_locus().map(ToString::to_string),
            def.multikey_locus().map(ToString::to_string)
        );
        assert_eq!(back.fields()[1].kind, def.fields()[1].kind);
    }

    #[test]
    fn dedup_needed_only_when_multikey_column_unpinned() {
        let def = IndexDefinition::build(
            &schema(),
            "users_tags_age",
            paths(&["age", "tags[]"]),
            IndexOptions::default(),
        )
        .unwrap();

        assert!(def.requires_scan_dedup(0));
        assert!(def.requires_scan_dedup(1));
        assert!(!def.requires_scan_dedup(2));

        let single = IndexDefinition::build(
            &schema(),
            "users_age",
            paths(&["age"]),
            IndexOptions::default(),
        )
        .unwrap();
        assert!(!single.requires_scan_dedup(0));
    }
}
