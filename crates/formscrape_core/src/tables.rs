use serde::{Deserialize, Serialize};

use crate::{ConfigError, TableError};

/// A table read off a result page. Every row has `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).fold(columns.len(), usize::max);
        let mut columns = columns;
        columns.extend((columns.len()..width).map(|i| i.to_string()));
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Header tuple followed by every cell, row-major.
    fn flattened(&self) -> Vec<String> {
        self.columns
            .iter()
            .chain(self.rows.iter().flatten())
            .cloned()
            .collect()
    }
}

/// Output-table section of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTableSpec {
    pub select: String,
    #[serde(default)]
    pub which: Option<TablePositions>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub table_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TablePositions {
    One(usize),
    Many(Vec<usize>),
}

/// How result tables are picked from a page. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    ByPosition { which: usize, name: String },
    ByPositions { which: Vec<usize>, names: Vec<String> },
    Flatten { name: String },
}

impl TableSelection {
    pub fn from_spec(spec: &OutputTableSpec) -> Result<Self, ConfigError> {
        let names = match (&spec.table_names, &spec.table_name) {
            (Some(names), _) if !names.is_empty() => names.clone(),
            (_, Some(name)) => vec![name.clone()],
            _ => return Err(ConfigError::MissingKey("output_table.table_name".into())),
        };
        let single_name = |names: Vec<String>| match <[String; 1]>::try_from(names) {
            Ok([name]) => Ok(name),
            Err(names) => Err(ConfigError::TableNameCount {
                names: names.len(),
                tables: 1,
            }),
        };

        match spec.select.as_str() {
            "by position" => {
                let which = match spec.which {
                    Some(TablePositions::One(which)) => which,
                    Some(TablePositions::Many(_)) => {
                        return Err(ConfigError::invalid(
                            "output_table.which",
                            "by position takes a single position",
                        ))
                    }
                    None => return Err(ConfigError::MissingKey("output_table.which".into())),
                };
                check_position(which)?;
                Ok(TableSelection::ByPosition {
                    which,
                    name: single_name(names)?,
                })
            }
            "by positions" => {
                let which = match &spec.which {
                    Some(TablePositions::Many(which)) => which.clone(),
                    Some(TablePositions::One(which)) => vec![*which],
                    None => return Err(ConfigError::MissingKey("output_table.which".into())),
                };
                which.iter().copied().try_for_each(check_position)?;
                if which.len() != names.len() {
                    return Err(ConfigError::TableNameCount {
                        names: names.len(),
                        tables: which.len(),
                    });
                }
                Ok(TableSelection::ByPositions { which, names })
            }
            "flatten" => Ok(TableSelection::Flatten {
                name: single_name(names)?,
            }),
            other => Err(ConfigError::UnknownSelectionMode(other.to_string())),
        }
    }

    /// Picks the configured tables out of everything found on a page and
    /// names them. Output order follows the configuration.
    pub fn apply(&self, tables: Vec<Table>) -> Result<Vec<(String, Table)>, TableError> {
        match self {
            TableSelection::ByPosition { which, name } => {
                Ok(vec![(name.clone(), pick(&tables, *which)?)])
            }
            TableSelection::ByPositions { which, names } => which
                .iter()
                .zip(names)
                .map(|(position, name)| Ok((name.clone(), pick(&tables, *position)?)))
                .collect(),
            TableSelection::Flatten { name } => {
                let rows: Vec<Vec<String>> = tables.iter().map(Table::flattened).collect();
                Ok(vec![(name.clone(), Table::new(Vec::new(), rows))])
            }
        }
    }
}

fn check_position(position: usize) -> Result<(), ConfigError> {
    if position == 0 {
        return Err(ConfigError::invalid(
            "output_table.which",
            "table positions are 1-based",
        ));
    }
    Ok(())
}

fn pick(tables: &[Table], position: usize) -> Result<Table, TableError> {
    position
        .checked_sub(1)
        .and_then(|index| tables.get(index))
        .cloned()
        .ok_or(TableError::MissingTable {
            position,
            found: tables.len(),
        })
}
