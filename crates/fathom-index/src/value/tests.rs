use super::*;
use crate::path::TablePath;
use rust_decimal::Decimal;
use std::cmp::Ordering;

fn ord(left: &FieldValue, right: &FieldValue) -> Option<Ordering> {
    cmp_index_values(left, right)
}

#[test]
fn nulls_sort_after_every_value_and_null_before_json_null() {
    let values = [
        FieldValue::Long(i64::MAX),
        FieldValue::String("zzz".to_string()),
        FieldValue::Boolean(true),
    ];
    for value in &values {
        assert_eq!(ord(value, &FieldValue::Null), Some(Ordering::Less));
        assert_eq!(ord(value, &FieldValue::JsonNull), Some(Ordering::Less));
    }
    assert_eq!(
        ord(&FieldValue::Null, &FieldValue::JsonNull),
        Some(Ordering::Less)
    );
    assert_eq!(
        ord(&FieldValue::Null, &FieldValue::Null),
        Some(Ordering::Equal)
    );
}

#[test]
fn numeric_comparison_crosses_representations() {
    let five_i = FieldValue::Integer(5);
    let five_l = FieldValue::Long(5);
    let five_n = FieldValue::Number(Decimal::new(500, 2));
    let five_d = FieldValue::double(5.0).unwrap();

    assert_eq!(ord(&five_i, &five_l), Some(Ordering::Equal));
    assert_eq!(ord(&five_i, &five_n), Some(Ordering::Equal));
    assert_eq!(ord(&five_n, &five_d), Some(Ordering::Equal));

    assert_eq!(
        ord(&FieldValue::Integer(2), &FieldValue::double(2.5).unwrap()),
        Some(Ordering::Less)
    );
    assert_eq!(
        ord(&FieldValue::double(2.5).unwrap(), &FieldValue::Long(3)),
        Some(Ordering::Less)
    );
}

#[test]
fn infinities_compare_against_decimals() {
    let top = FieldValue::Number(Decimal::MAX);
    let bottom = FieldValue::Number(Decimal::MIN);
    let pos = FieldValue::double(f64::INFINITY).unwrap();
    let neg = FieldValue::double(f64::NEG_INFINITY).unwrap();

    assert_eq!(ord(&pos, &top), Some(Ordering::Greater));
    assert_eq!(ord(&neg, &bottom), Some(Ordering::Less));
    assert_eq!(ord(&top, &neg), Some(Ordering::Greater));
    assert_eq!(ord(&neg, &pos), Some(Ordering::Less));
}

#[test]
fn mismatched_and_complex_values_are_incomparable() {
    assert_eq!(
        ord(&FieldValue::String("1".to_string()), &FieldValue::Integer(1)),
        None
    );
    assert_eq!(
        ord(
            &FieldValue::Array(vec![FieldValue::Integer(1)]),
            &FieldValue::Array(vec![FieldValue::Integer(1)]),
        ),
        None
    );
    assert_eq!(
        ord(&FieldValue::Boolean(true), &FieldValue::Long(1)),
        None
    );
}

#[test]
fn enums_order_by_declaration_position_not_spelling() {
    let def = EnumDef::new("size", &["small", "medium", "large"]);
    let small = FieldValue::Enum(def.value_of("small").unwrap());
    let large = FieldValue::Enum(def.value_of("large").unwrap());

    // Lexically "large" < "small"; declaration order says otherwise.
    assert_eq!(ord(&small, &large), Some(Ordering::Less));
    assert_eq!(def.position_of("zzz"), None);
    assert_eq!(def.symbol_at(1), Some("medium"));
}

#[test]
fn timestamps_compare_semantically_across_precisions() {
    let seconds = TimestampValue::new(1, 0).unwrap();
    let millis = TimestampValue::new(1000, 3).unwrap();
    let nanos = TimestampValue::new(1_000_000_001, 9).unwrap();

    assert_eq!(seconds, millis);
    assert!(millis < nanos);
    assert_eq!(
        ord(
            &FieldValue::Timestamp(seconds),
            &FieldValue::Timestamp(millis)
        ),
        Some(Ordering::Equal)
    );
}

#[test]
fn timestamp_rescale_is_exact_or_rejected() {
    let millis = TimestampValue::new(1500, 3).unwrap();

    let micros = millis.rescale(6).unwrap();
    assert_eq!(micros.units(), 1_500_000);
    assert_eq!(micros.precision(), 6);

    // 1.5s has a non-zero sub-second digit at precision 0.
    assert_eq!(millis.rescale(0), Err(TimestampError::PrecisionLoss(0)));

    let exact = TimestampValue::new(2000, 3).unwrap();
    assert_eq!(exact.rescale(0).unwrap().units(), 2);

    assert_eq!(
        TimestampValue::new(i64::MAX, 0).unwrap().rescale(9),
        Err(TimestampError::Overflow)
    );
    assert_eq!(
        TimestampValue::new(0, 10),
        Err(TimestampError::PrecisionOutOfRange(10))
    );
}

#[test]
fn map_construction_sorts_entries_and_rejects_duplicates() {
    let map = FieldValue::from_map(vec![
        ("b".to_string(), FieldValue::Integer(2)),
        ("a".to_string(), FieldValue::Integer(1)),
    ])
    .unwrap();
    let entries = map.try_as_map().unwrap();
    assert_eq!(entries[0].0, "a");
    assert_eq!(entries[1].0, "b");

    let err = FieldValue::from_map(vec![
        ("k".to_string(), FieldValue::Integer(1)),
        ("k".to_string(), FieldValue::Integer(2)),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        MapValueError::DuplicateKey {
            key: "k".to_string()
        }
    );
}

#[test]
fn floats_reject_nan_and_order_totally() {
    assert!(FieldValue::double(f64::NAN).is_err());
    assert!(FieldValue::float(f32::NAN).is_err());

    let neg_zero = Float64::try_new(-0.0).unwrap();
    let pos_zero = Float64::try_new(0.0).unwrap();
    assert!(neg_zero < pos_zero);
}

#[test]
fn type_acceptance_checks_shape_and_symbols() {
    assert!(FieldType::Integer.accepts(&FieldValue::Integer(1)));
    assert!(!FieldType::Integer.accepts(&FieldValue::Long(1)));
    // Nullability is a column property; every type accepts the null flavors.
    assert!(FieldType::Integer.accepts(&FieldValue::Null));
    assert!(FieldType::String.accepts(&FieldValue::JsonNull));

    assert!(FieldType::FixedBinary(2).accepts(&FieldValue::FixedBinary(vec![1, 2])));
    assert!(!FieldType::FixedBinary(2).accepts(&FieldValue::FixedBinary(vec![1])));

    let def = EnumDef::new("size", &["small", "large"]);
    let foreign = EnumSymbol {
        position: 0,
        symbol: "large".to_string(),
    };
    assert!(!FieldType::Enum(def.clone()).accepts(&FieldValue::Enum(foreign)));
    assert!(FieldType::Enum(def.clone()).accepts(&FieldValue::Enum(def.value_of("large").unwrap())));

    let ints = FieldType::Array(Box::new(FieldType::Integer));
    assert!(ints.accepts(&FieldValue::Array(vec![
        FieldValue::Integer(1),
        FieldValue::Null
    ])));
    assert!(!ints.accepts(&FieldValue::Array(vec![FieldValue::Boolean(true)])));
}

fn steps(path: &str) -> Vec<crate::path::PathStep> {
    path.parse::<TablePath>().unwrap().steps().to_vec()
}

#[test]
fn find_at_path_walks_records_and_stops_at_markers() {
    let row = FieldValue::Record(vec![(
        "address".to_string(),
        FieldValue::Record(vec![("city".to_string(), FieldValue::from("fathom"))]),
    )]);

    assert_eq!(
        find_at_path(&row, &steps("address.city")),
        Some(&FieldValue::from("fathom"))
    );
    // Lookup is case-insensitive like the schema resolver.
    assert_eq!(
        find_at_path(&row, &steps("Address.CITY")),
        Some(&FieldValue::from("fathom"))
    );
    assert_eq!(find_at_path(&row, &steps("address.zip")), None);
    // Markers need an element context; plain navigation stops.
    assert_eq!(find_at_path(&row, &steps("address[]")), None);
}

#[test]
fn put_at_path_creates_the_missing_structure() {
    let mut row = FieldValue::Null;
    put_at_path(&mut row, &steps("a.b"), FieldValue::Integer(7)).unwrap();

    assert_eq!(
        find_at_path(&row, &steps("a.b")),
        Some(&FieldValue::Integer(7))
    );

    // Writing a sibling keeps the existing field.
    put_at_path(&mut row, &steps("a.c"), FieldValue::Integer(8)).unwrap();
    assert_eq!(
        find_at_path(&row, &steps("a.b")),
        Some(&FieldValue::Integer(7))
    );

    // A scalar in the way is a structural violation.
    let err = put_at_path(&mut row, &steps("a.b.d"), FieldValue::Null).unwrap_err();
    assert!(err.display_with_class().contains("invariant"));
}

#[test]
fn put_map_entry_keeps_entries_sorted_and_projects_rest_steps() {
    let mut row = FieldValue::Null;
    put_map_entry(&mut row, &steps("attrs"), "b", &[], FieldValue::Integer(2)).unwrap();
    put_map_entry(&mut row, &steps("attrs"), "a", &[], FieldValue::Integer(1)).unwrap();

    let attrs = find_at_path(&row, &steps("attrs")).unwrap();
    let entries = attrs.try_as_map().unwrap();
    assert_eq!(entries[0], ("a".to_string(), FieldValue::Integer(1)));
    assert_eq!(entries[1], ("b".to_string(), FieldValue::Integer(2)));

    // Rest steps write inside the entry's value.
    let mut row = FieldValue::Null;
    put_map_entry(
        &mut row,
        &steps("attrs"),
        "home",
        &steps("city"),
        FieldValue::from("fathom"),
    )
    .unwrap();
    let city = find_at_path(&row, &steps("attrs"))
        .and_then(|attrs| attrs.try_as_map())
        .and_then(|entries| entries.first())
        .and_then(|(_, value)| value.record_field("city"));
    assert_eq!(city, Some(&FieldValue::from("fathom")));
}

#[test]
fn record_field_lookup_is_case_insensitive() {
    let row = FieldValue::Record(vec![("Name".to_string(), FieldValue::from("ada"))]);
    assert_eq!(row.record_field("name"), Some(&FieldValue::from("ada")));
    assert_eq!(row.record_field("missing"), None);
    assert_eq!(FieldValue::Integer(1).record_field("name"), None);
}
