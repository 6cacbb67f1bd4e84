//! Module: index::multikey
//! Responsibility: expand one row into the set of binary index entries it
//! contributes when the index traverses an array or map.

use crate::error::IndexError;
use crate::index::codec::{self, serialize_resolved};
use crate::index::definition::IndexDefinition;
use crate::obs::{self, MetricsEvent};
use crate::schema::PathKind;
use crate::value::{FieldValue, find_at_path};

/// Derive every binary index entry `row` contributes under `definition`.
///
/// An empty result means the row does not participate in this index.
/// Entries are not deduplicated: a true duplicate value inside one array
/// legitimately yields identical byte sequences, and callers must not assume
/// uniqueness.
pub fn derive_binary_keys(
    definition: &IndexDefinition,
    row: &FieldValue,
) -> Result<Vec<Vec<u8>>, IndexError> {
    let keys = extract_keys(definition, row)?;
    obs::emit(MetricsEvent::KeysDerived {
        produced: keys.len(),
    });
    Ok(keys)
}

fn extract_keys(
    definition: &IndexDefinition,
    row: &FieldValue,
) -> Result<Vec<Vec<u8>>, IndexError> {
    // Single-key index: one entry or none, straight through the codec.
    let Some(locus) = definition.multikey_locus() else {
        return Ok(codec::serialize_row(definition, row)?
            .into_iter()
            .collect());
    };

    let locus_len = locus.len();
    let locus_value = find_at_path(row, locus.steps());

    // Absent locus, NULL locus, empty array, empty map: the row degenerates
    // to a single NULL-at-locus entry, or to nothing in legacy mode.
    let degenerate = match locus_value {
        None => true,
        Some(value) if value.is_null() => true,
        Some(FieldValue::Array(items)) => items.is_empty(),
        Some(FieldValue::Map(entries)) => entries.is_empty(),
        Some(_) => false,
    };

    if degenerate {
        if !definition.supports_null {
            return Ok(Vec::new());
        }
        let entry = serialize_resolved(definition, |field| {
            if field.is_multikey() {
                Some(FieldValue::Null)
            } else {
                find_at_path(row, field.path.steps()).cloned()
            }
        })?;
        return Ok(entry.into_iter().collect());
    }

    let mut keys = Vec::new();

    match locus_value {
        Some(FieldValue::Array(items)) => {
            for element in items {
                // Elements that cannot fill a required column are skipped;
                // one inconsistent element must not abort the whole row.
                let entry = serialize_resolved(definition, |field| {
                    if field.is_multikey() {
                        find_at_path(element, &field.path.steps()[locus_len + 1..]).cloned()
                    } else {
                        find_at_path(row, field.path.steps()).cloned()
                    }
                })?;
                if let Some(entry) = entry {
                    keys.push(entry);
                }
            }
        }
        Some(FieldValue::Map(entries)) => {
            for (name, element) in entries {
                let entry = serialize_resolved(definition, |field| match field.kind {
                    PathKind::MapKey => Some(FieldValue::String(name.clone())),
                    PathKind::MapValue => {
                        find_at_path(element, &field.path.steps()[locus_len + 1..]).cloned()
                    }
                    PathKind::Value => find_at_path(row, field.path.steps()).cloned(),
                })?;
                if let Some(entry) = entry {
                    keys.push(entry);
                }
            }
        }
        Some(other) => {
            return Err(IndexError::codec_invariant(format!(
                "multi-key locus '{locus}' resolved to a {} value",
                other.label()
            )));
        }
        // Covered by the degenerate branch above.
        None => {}
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::codec::{IndexKey, deserialize_key, serialize_key};
    use crate::index::definition::IndexOptions;
    use crate::schema::TableSchema;
    use crate::value::{FieldDef, FieldType, RecordDef};
    use crate::{NOT_NULL_INDICATOR, NULL_INDICATOR};

    fn schema() -> TableSchema {
        let address = RecordDef::new(vec![
            FieldDef::new("city", FieldType::String, false),
            FieldDef::new("zip", FieldType::String, true),
        ]);
        let row = RecordDef::new(vec![
            FieldDef::new("pk", FieldType::Long, false),
            FieldDef::new("age", FieldType::Integer, true),
            FieldDef::new(
                "tags",
                FieldType::Array(Box::new(FieldType::String)),
                true,
            ),
            FieldDef::new("labels", FieldType::Map(Box::new(FieldType::Long)), true),
            FieldDef::new(
                "addresses",
                FieldType::Array(Box::new(FieldType::Record(address))),
                true,
            ),
        ]);
        TableSchema::new("users", 1, row, vec!["pk".to_string()])
    }

    fn definition(paths: &[&str], supports_null: bool) -> IndexDefinition {
        IndexDefinition::build(
            &schema(),
            "ix",
            paths.iter().map(|p| p.parse().unwrap()).collect(),
            IndexOptions { supports_null },
        )
        .unwrap()
    }

    fn record(fields: Vec<(&str, FieldValue)>) -> FieldValue {
        FieldValue::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    #[test]
    fn single_key_index_delegates_to_the_codec() {
        let def = definition(&["age"], true);
        let row = record(vec![
            ("pk", FieldValue::Long(1)),
            ("age", FieldValue::Integer(30)),
        ]);

        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys.len(), 1);

        let decoded = deserialize_key(&def, &keys[0], false).unwrap();
        assert_eq!(decoded.get(0), Some(&FieldValue::Integer(30)));
    }

    #[test]
    fn array_of_n_elements_yields_n_entries_with_duplicates_kept() {
        let def = definition(&["tags[]"], true);
        let row = record(vec![
            ("pk", FieldValue::Long(7)),
            (
                "tags",
                FieldValue::Array(vec![
                    FieldValue::from("a"),
                    FieldValue::from("b"),
                    FieldValue::from("a"),
                ]),
            ),
        ]);

        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], keys[2]);
        assert_ne!(keys[0], keys[1]);
    }

    #[test]
    fn map_key_index_yields_one_entry_per_key() {
        let def = definition(&["labels.keys()"], true);
        let row = record(vec![(
            "labels",
            FieldValue::from_map(vec![
                ("env".to_string(), FieldValue::Long(1)),
                ("team".to_string(), FieldValue::Long(2)),
            ])
            .unwrap(),
        )]);

        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys.len(), 2);

        let decoded: Vec<_> = keys
            .iter()
            .map(|k| {
                deserialize_key(&def, k, false)
                    .unwrap()
                    .get(0)
                    .cloned()
                    .unwrap()
            })
            .collect();
        assert_eq!(
            decoded,
            vec![FieldValue::from("env"), FieldValue::from("team")]
        );
    }

    #[test]
    fn map_key_and_value_columns_fill_from_the_same_entry() {
        let def = definition(&["labels.keys()", "labels[]"], true);
        let row = record(vec![(
            "labels",
            FieldValue::from_map(vec![("env".to_string(), FieldValue::Long(9))]).unwrap(),
        )]);

        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys.len(), 1);

        let decoded = deserialize_key(&def, &keys[0], false).unwrap();
        assert_eq!(decoded.get(0), Some(&FieldValue::from("env")));
        assert_eq!(decoded.get(1), Some(&FieldValue::Long(9)));
    }

    #[test]
    fn columns_outside_the_locus_repeat_in_every_entry() {
        let def = definition(&["age", "tags[]"], true);
        let row = record(vec![
            ("age", FieldValue::Integer(30)),
            (
                "tags",
                FieldValue::Array(vec![FieldValue::from("a"), FieldValue::from("b")]),
            ),
        ]);

        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys.len(), 2);
        for key in &keys {
            let decoded = deserialize_key(&def, key, false).unwrap();
            assert_eq!(decoded.get(0), Some(&FieldValue::Integer(30)));
        }
    }

    #[test]
    fn absent_field_produces_one_null_entry_or_nothing() {
        let row = record(vec![("pk", FieldValue::Long(1))]);

        // Null support: one entry carrying the NULL indicator.
        let def = definition(&["tags[]"], true);
        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0], vec![NULL_INDICATOR]);

        // Legacy: the row silently does not participate.
        let legacy = definition(&["tags[]"], false);
        assert!(derive_binary_keys(&legacy, &row).unwrap().is_empty());
    }

    #[test]
    fn empty_array_degenerates_like_an_absent_one() {
        let row = record(vec![("tags", FieldValue::Array(vec![]))]);

        let def = definition(&["tags[]"], true);
        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys, vec![vec![NULL_INDICATOR]]);
    }

    #[test]
    fn inconsistent_elements_are_skipped_not_fatal() {
        // Legacy mode keeps the column non-nullable, so an element missing
        // the nested field cannot fill it and drops out.
        let def = definition(&["addresses[].city"], false);
        let row = record(vec![(
            "addresses",
            FieldValue::Array(vec![
                record(vec![("city", FieldValue::from("oslo"))]),
                record(vec![("zip", FieldValue::from("0150"))]),
                record(vec![("city", FieldValue::from("bergen"))]),
            ]),
        )]);

        let keys = derive_binary_keys(&def, &row).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], vec![b'o', b's', b'l', b'o', 0x00]);
        assert_eq!(keys[1], vec![b'b', b'e', b'r', b'g', b'e', b'n', 0x00]);
    }

    #[test]
    fn locus_of_the_wrong_shape_is_an_invariant_violation() {
        let def = definition(&["tags[]"], true);
        let row = record(vec![("tags", FieldValue::from("not-an-array"))]);

        let err = derive_binary_keys(&def, &row).unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::InvariantViolation);
    }

    #[test]
    fn entries_agree_with_directly_serialized_keys() {
        let def = definition(&["tags[]"], true);
        let row = record(vec![(
            "tags",
            FieldValue::Array(vec![FieldValue::from("x")]),
        )]);

        let keys = derive_binary_keys(&def, &row).unwrap();

        let mut key = IndexKey::new(&def);
        key.set(0, FieldValue::from("x")).unwrap();
        let direct = serialize_key(&def, &key, false).unwrap().unwrap();
        assert_eq!(keys, vec![direct.clone()]);
        assert_eq!(direct[0], NOT_NULL_INDICATOR);
    }
}
