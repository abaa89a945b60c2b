use formscrape_core::{
    ConfigError, OutputTableSpec, Table, TableError, TablePositions, TableSelection,
};
use pretty_assertions::assert_eq;

fn table(tag: &str) -> Table {
    Table::new(
        vec!["k".into(), "v".into()],
        vec![
            vec![format!("{tag}1"), "x".into()],
            vec![format!("{tag}2"), "y".into()],
        ],
    )
}

fn spec(select: &str, which: Option<TablePositions>, names: &[&str]) -> OutputTableSpec {
    OutputTableSpec {
        select: select.to_string(),
        which,
        table_name: None,
        table_names: Some(names.iter().map(|s| s.to_string()).collect()),
    }
}

#[test]
fn by_position_is_one_based() {
    let selection =
        TableSelection::from_spec(&spec("by position", Some(TablePositions::One(2)), &["odds"]))
            .unwrap();
    let picked = selection.apply(vec![table("a"), table("b")]).unwrap();
    assert_eq!(picked, vec![("odds".to_string(), table("b"))]);
}

#[test]
fn by_positions_preserves_configured_order() {
    let selection = TableSelection::from_spec(&spec(
        "by positions",
        Some(TablePositions::Many(vec![3, 1])),
        &["third", "first"],
    ))
    .unwrap();
    let picked = selection
        .apply(vec![table("a"), table("b"), table("c")])
        .unwrap();
    let names: Vec<_> = picked.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["third", "first"]);
    assert_eq!(picked[0].1, table("c"));
    assert_eq!(picked[1].1, table("a"));
}

#[test]
fn missing_table_is_reported() {
    let selection =
        TableSelection::from_spec(&spec("by position", Some(TablePositions::One(4)), &["t"]))
            .unwrap();
    let err = selection.apply(vec![table("a")]).unwrap_err();
    assert_eq!(err, TableError::MissingTable { position: 4, found: 1 });
}

#[test]
fn flatten_turns_each_table_into_one_row() {
    let selection = TableSelection::from_spec(&OutputTableSpec {
        select: "flatten".into(),
        which: None,
        table_name: Some("wide".into()),
        table_names: None,
    })
    .unwrap();
    let small = Table::new(vec!["h".into()], vec![vec!["only".into()]]);
    let picked = selection.apply(vec![table("a"), small]).unwrap();
    let (name, wide) = &picked[0];
    assert_eq!(name, "wide");
    assert_eq!(wide.columns, vec!["0", "1", "2", "3", "4", "5"]);
    assert_eq!(
        wide.rows,
        vec![
            vec!["k", "v", "a1", "x", "a2", "y"],
            vec!["h", "only", "", "", "", ""],
        ]
    );
}

#[test]
fn unknown_mode_and_name_mismatch_are_config_errors() {
    let err = TableSelection::from_spec(&spec("by magic", None, &["t"])).unwrap_err();
    assert_eq!(err, ConfigError::UnknownSelectionMode("by magic".into()));

    let err = TableSelection::from_spec(&spec(
        "by positions",
        Some(TablePositions::Many(vec![1, 2])),
        &["only_one"],
    ))
    .unwrap_err();
    assert_eq!(err, ConfigError::TableNameCount { names: 1, tables: 2 });

    let err = TableSelection::from_spec(&spec("by position", Some(TablePositions::One(0)), &["t"]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}
