use std::collections::BTreeMap;

use formscrape_core::{
    ConfigError, FieldDescriptor, FormDescriptor, InputRow, InputSpace, RangeValue, RawRangeSpec,
    SubmitControl,
};
use pretty_assertions::assert_eq;

const URL: &str = "https://example.com/search";

fn form() -> FormDescriptor {
    let mut inputs = BTreeMap::new();
    inputs.insert("q".to_string(), FieldDescriptor::Text { name: Some("q".into()) });
    inputs.insert(
        "sort".to_string(),
        FieldDescriptor::Select {
            name: Some("sort".into()),
            values: vec![Some("1".into()), Some("2".into()), Some("3".into())],
            texts: vec!["a".into(), "b".into(), "c".into()],
        },
    );
    inputs.insert(
        "side".to_string(),
        FieldDescriptor::Radio {
            name: Some("side".into()),
            radio_ids: vec!["home".into(), "away".into()],
            label_ids: vec![None, None],
            label_texts: vec!["Home".into(), "Away".into()],
        },
    );
    FormDescriptor {
        id: "search".into(),
        inputs,
        buttons: BTreeMap::new(),
    }
}

fn spec(kind: &str, value: RangeValue) -> RawRangeSpec {
    RawRangeSpec {
        kind: kind.to_string(),
        value,
    }
}

fn submit() -> SubmitControl {
    SubmitControl::Id("go".into())
}

fn row(pairs: &[(&str, &str)]) -> InputRow {
    InputRow {
        fields: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        url: URL.to_string(),
        subkey: "id".into(),
        subval: "go".into(),
    }
}

#[test]
fn const_times_all_yields_one_row_per_option() {
    let mut ranges = BTreeMap::new();
    ranges.insert("q".to_string(), spec("const", RangeValue::One("hello".into())));
    ranges.insert("sort".to_string(), spec("all", RangeValue::default()));

    let space = InputSpace::new(&form(), &ranges, URL, &submit()).unwrap();
    assert_eq!(space.len_hint(), 3);
    let rows: Vec<_> = space.collect();
    assert_eq!(
        rows,
        vec![
            row(&[("q", "hello"), ("sort", "a")]),
            row(&[("q", "hello"), ("sort", "b")]),
            row(&[("q", "hello"), ("sort", "c")]),
        ]
    );
}

#[test]
fn product_size_is_product_of_expansions() {
    let mut ranges = BTreeMap::new();
    ranges.insert("q".to_string(), spec("slice", RangeValue::One("0 10 3".into())));
    ranges.insert(
        "sort".to_string(),
        spec("all-but", RangeValue::Many(vec!["c".into()])),
    );
    ranges.insert("side".to_string(), spec("all", RangeValue::default()));

    let space = InputSpace::new(&form(), &ranges, URL, &submit()).unwrap();
    assert_eq!(space.len_hint(), 4 * 2 * 2);
    let rows: Vec<_> = space.collect();
    assert_eq!(rows.len(), 16);

    // Fields are ordered by id and the last one varies fastest.
    assert_eq!(rows[0], row(&[("q", "0"), ("side", "home"), ("sort", "a")]));
    assert_eq!(rows[1], row(&[("q", "0"), ("side", "home"), ("sort", "b")]));
    assert_eq!(rows[2], row(&[("q", "0"), ("side", "away"), ("sort", "a")]));
    assert_eq!(rows[15], row(&[("q", "9"), ("side", "away"), ("sort", "b")]));
}

#[test]
fn generation_is_deterministic() {
    let mut ranges = BTreeMap::new();
    ranges.insert(
        "q".to_string(),
        spec("list", RangeValue::Many(vec!["x".into(), "y".into()])),
    );
    ranges.insert("side".to_string(), spec("all", RangeValue::default()));

    let first: Vec<_> = InputSpace::new(&form(), &ranges, URL, &submit())
        .unwrap()
        .collect();
    let second: Vec<_> = InputSpace::new(&form(), &ranges, URL, &submit())
        .unwrap()
        .collect();
    assert_eq!(first, second);
}

#[test]
fn empty_expansion_yields_empty_space() {
    let mut ranges = BTreeMap::new();
    ranges.insert("q".to_string(), spec("list", RangeValue::Many(Vec::new())));
    ranges.insert("sort".to_string(), spec("all", RangeValue::default()));

    let space = InputSpace::new(&form(), &ranges, URL, &submit()).unwrap();
    assert_eq!(space.len_hint(), 0);
    assert_eq!(space.count(), 0);
}

#[test]
fn unknown_field_and_kind_fail_before_generation() {
    let mut ranges = BTreeMap::new();
    ranges.insert("nope".to_string(), spec("const", RangeValue::One("x".into())));
    let err = InputSpace::new(&form(), &ranges, URL, &submit()).err().unwrap();
    assert_eq!(err, ConfigError::UnknownField("nope".into()));

    let mut ranges = BTreeMap::new();
    ranges.insert("q".to_string(), spec("every", RangeValue::default()));
    let err = InputSpace::new(&form(), &ranges, URL, &submit()).err().unwrap();
    assert!(matches!(err, ConfigError::UnknownRangeType { .. }));
}

#[test]
fn rows_carry_their_submit_control() {
    let mut ranges = BTreeMap::new();
    ranges.insert("q".to_string(), spec("const", RangeValue::One("x".into())));
    let submit = SubmitControl::Name("search_button".into());
    let rows: Vec<_> = InputSpace::new(&form(), &ranges, URL, &submit)
        .unwrap()
        .collect();
    assert_eq!(rows[0].subkey, "name");
    assert_eq!(rows[0].submit_control().unwrap(), submit);
}
