use crate::InputRow;

/// Where a result record came from. Reattached as columns to every record
/// posted for a row so each one traces back to its submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub row: InputRow,
    pub input_form_id: String,
    pub input_index: i64,
}

impl Provenance {
    /// Column name/value pairs, field values first.
    pub fn columns(&self) -> Vec<(String, String)> {
        let mut columns: Vec<(String, String)> = self
            .row
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        columns.push(("url".into(), self.row.url.clone()));
        columns.push(("subkey".into(), self.row.subkey.clone()));
        columns.push(("subval".into(), self.row.subval.clone()));
        columns.push(("input_form_id".into(), self.input_form_id.clone()));
        columns.push(("input_index".into(), self.input_index.to_string()));
        columns
    }
}
