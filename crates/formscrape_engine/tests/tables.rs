use formscrape_core::{Table, TableError, TableSelection};
use formscrape_engine::{extract_result_tables, parse_tables};
use pretty_assertions::assert_eq;

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

const RESULTS_PAGE: &str = r#"
<html><body>
  <table id="odds">
    <thead><tr><th>Team</th><th>Odds</th></tr></thead>
    <tbody>
      <tr><td>Lions</td><td>1.5</td></tr>
      <tr><td>Tigers</td><td> 2.75
      </td></tr>
    </tbody>
  </table>
  <table id="meta">
    <tr><th>Updated</th></tr>
    <tr><td>today <table><tr><td>nested</td></tr></table></td></tr>
  </table>
  <table id="plain">
    <tr><td colspan="2">wide</td><td>x</td></tr>
    <tr><td>a</td></tr>
  </table>
</body></html>
"#;

#[test]
fn parses_headers_bodies_and_nested_tables_in_document_order() {
    let tables = parse_tables(RESULTS_PAGE);
    assert_eq!(tables.len(), 4);

    assert_eq!(tables[0].columns, strings(&["Team", "Odds"]));
    assert_eq!(
        tables[0].rows,
        vec![strings(&["Lions", "1.5"]), strings(&["Tigers", "2.75"])]
    );

    // Rows of the nested table are not part of the outer one.
    assert_eq!(tables[1].columns, strings(&["Updated"]));
    assert_eq!(tables[1].rows.len(), 1);
    assert_eq!(tables[2].rows, vec![strings(&["nested"])]);
}

#[test]
fn headerless_table_gets_numbered_columns_and_padded_rows() {
    let tables = parse_tables(RESULTS_PAGE);
    assert_eq!(
        tables[3],
        Table {
            columns: strings(&["0", "1", "2"]),
            rows: vec![strings(&["wide", "wide", "x"]), strings(&["a", "", ""])],
        }
    );
}

#[test]
fn selection_by_position_names_the_table() {
    let selection = TableSelection::ByPosition {
        which: 1,
        name: "odds".into(),
    };
    let picked = extract_result_tables(RESULTS_PAGE, &selection).unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].0, "odds");
    assert_eq!(picked[0].1.rows.len(), 2);
}

#[test]
fn selection_past_the_last_table_fails() {
    let selection = TableSelection::ByPositions {
        which: vec![1, 9],
        names: vec!["odds".into(), "ghost".into()],
    };
    assert_eq!(
        extract_result_tables(RESULTS_PAGE, &selection).unwrap_err(),
        TableError::MissingTable {
            position: 9,
            found: 4
        }
    );
}

#[test]
fn page_without_tables_flattens_to_an_empty_table() {
    let selection = TableSelection::Flatten {
        name: "wide".into(),
    };
    let picked = extract_result_tables("<p>nothing</p>", &selection).unwrap();
    assert_eq!(picked[0].1.rows.len(), 0);
}
