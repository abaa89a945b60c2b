use ego_tree::{NodeId, NodeRef};
use formscrape_core::{Table, TableError, TableSelection};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::schema::text_of;

/// Upper bound on `colspan`, matching what browsers honour.
const MAX_COLSPAN: usize = 1000;

/// Reads every `<table>` on a page, in document order.
///
/// Nested tables are reported separately and their rows are not folded into
/// the enclosing table. The header row is the first `<thead>` row, or else a
/// leading row made only of `<th>` cells; without either, columns are numbered.
pub fn parse_tables(html: &str) -> Vec<Table> {
    let document = Html::parse_document(html);
    let (Ok(table_sel), Ok(row_sel)) = (Selector::parse("table"), Selector::parse("tr")) else {
        return Vec::new();
    };

    document
        .select(&table_sel)
        .map(|table| {
            let rows: Vec<ElementRef<'_>> = table
                .select(&row_sel)
                .filter(|row| owning_table(**row) == Some(table.id()))
                .collect();
            read_table(&rows)
        })
        .collect()
}

/// Extracts the configured result tables from a rendered page.
pub fn extract_result_tables(
    html: &str,
    selection: &TableSelection,
) -> Result<Vec<(String, Table)>, TableError> {
    selection.apply(parse_tables(html))
}

fn read_table(rows: &[ElementRef<'_>]) -> Table {
    let header_index = rows
        .iter()
        .position(|row| in_thead(*row))
        .or_else(|| rows.first().filter(|row| is_header_row(**row)).map(|_| 0));

    let columns = header_index.map(|i| cells(rows[i])).unwrap_or_default();
    let body = rows
        .iter()
        .enumerate()
        .filter(|(i, row)| Some(*i) != header_index && !in_thead(**row))
        .map(|(_, row)| cells(*row))
        .filter(|cells| !cells.is_empty())
        .collect();
    Table::new(columns, body)
}

fn cells(row: ElementRef<'_>) -> Vec<String> {
    let mut out = Vec::new();
    for cell in row.children().filter_map(ElementRef::wrap) {
        let name = cell.value().name();
        if name != "td" && name != "th" {
            continue;
        }
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        let text = text_of(cell);
        out.extend(std::iter::repeat(text).take(span));
    }
    out
}

fn is_header_row(row: ElementRef<'_>) -> bool {
    let mut cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .map(|cell| cell.value().name().to_string())
        .filter(|name| name == "td" || name == "th")
        .peekable();
    cells.peek().is_some() && cells.all(|name| name == "th")
}

fn in_thead(row: ElementRef<'_>) -> bool {
    row.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "thead")
}

fn owning_table(node: NodeRef<'_, Node>) -> Option<NodeId> {
    node.ancestors()
        .find(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| element.name() == "table")
        })
        .map(|table| table.id())
}
