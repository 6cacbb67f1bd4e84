//! Structural navigation over row values.
//!
//! `find_at_path` is the read side used by key extraction; the `put_*`
//! functions are the write side used when a decoded index key is projected
//! back into a row shape.

use crate::error::IndexError;
use crate::path::PathStep;
use crate::value::FieldValue;

/// Follow `steps` through `root`, stopping at the first step that cannot be
/// taken. `Element` and `Keys` steps are not resolvable without an element
/// context and always stop navigation; multi-key extraction expands them.
#[must_use]
pub fn find_at_path<'a>(root: &'a FieldValue, steps: &[PathStep]) -> Option<&'a FieldValue> {
    let mut current = root;

    for step in steps {
        match step {
            PathStep::Field(name) => {
                current = current.record_field(name)?;
            }
            PathStep::Element | PathStep::Keys => return None,
        }
    }

    Some(current)
}

fn descend_or_create<'a>(
    current: &'a mut FieldValue,
    step: &PathStep,
) -> Result<&'a mut FieldValue, IndexError> {
    match step {
        PathStep::Field(name) => {
            if current.is_null() {
                *current = FieldValue::Record(Vec::new());
            }
            let FieldValue::Record(fields) = current else {
                return Err(IndexError::codec_invariant(format!(
                    "cannot project field '{name}' into a {} value",
                    current.label()
                )));
            };
            let position = fields
                .iter()
                .position(|(field, _)| field.eq_ignore_ascii_case(name));
            let position = match position {
                Some(p) => p,
                None => {
                    fields.push((name.clone(), FieldValue::Null));
                    fields.len() - 1
                }
            };
            Ok(&mut fields[position].1)
        }
        PathStep::Element => {
            if current.is_null() {
                *current = FieldValue::Array(Vec::new());
            }
            let FieldValue::Array(items) = current else {
                return Err(IndexError::codec_invariant(format!(
                    "cannot project an element into a {} value",
                    current.label()
                )));
            };
            // A projected row carries one element per derived key.
            if items.is_empty() {
                items.push(FieldValue::Null);
            }
            Ok(&mut items[0])
        }
        PathStep::Keys => Err(IndexError::codec_invariant(
            "map key steps must be projected through put_map_entry",
        )),
    }
}

/// Write `value` into `root` at `steps`, creating intermediate records and
/// single-element arrays as needed.
pub fn put_at_path(
    root: &mut FieldValue,
    steps: &[PathStep],
    value: FieldValue,
) -> Result<(), IndexError> {
    let mut current = root;

    for step in steps {
        current = descend_or_create(current, step)?;
    }

    *current = value;
    Ok(())
}

/// Write `value` under map entry `key`: navigate to the map at `map_steps`
/// (creating it if absent), select or insert the entry, then continue with
/// `rest` inside the entry's value.
pub fn put_map_entry(
    root: &mut FieldValue,
    map_steps: &[PathStep],
    key: &str,
    rest: &[PathStep],
    value: FieldValue,
) -> Result<(), IndexError> {
    let mut current = root;

    for step in map_steps {
        current = descend_or_create(current, step)?;
    }

    if current.is_null() {
        *current = FieldValue::Map(Vec::new());
    }
    let FieldValue::Map(entries) = current else {
        return Err(IndexError::codec_invariant(format!(
            "cannot project map entry '{key}' into a {} value",
            current.label()
        )));
    };

    // Entries stay sorted by key.
    let position = match entries.binary_search_by(|(k, _)| k.as_str().cmp(key)) {
        Ok(p) => p,
        Err(p) => {
            entries.insert(p, (key.to_string(), FieldValue::Null));
            p
        }
    };

    let entry_value = &mut entries[position].1;
    if rest.is_empty() {
        *entry_value = value;
        Ok(())
    } else {
        put_at_path(entry_value, rest, value)
    }
}
