use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, FieldValues, FormDescriptor, RangeSpec, RawRangeSpec, SubmitControl};

/// One concrete submission: a value per configured field plus the fixed
/// target/submit columns. Identity is full-content equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputRow {
    pub fields: BTreeMap<String, String>,
    pub url: String,
    pub subkey: String,
    pub subval: String,
}

impl InputRow {
    pub fn submit_control(&self) -> Result<SubmitControl, ConfigError> {
        SubmitControl::from_parts(&self.subkey, &self.subval)
    }
}

struct Axis {
    field: String,
    start: FieldValues,
    current: FieldValues,
    value: String,
}

/// Lazy cartesian product of every configured field's expansion.
///
/// Fields are ordered by id and the last one varies fastest, so the same
/// configuration always yields the same sequence.
pub struct InputSpace {
    axes: Vec<Axis>,
    url: String,
    submit: SubmitControl,
    started: bool,
    exhausted: bool,
    hint: usize,
}

impl InputSpace {
    pub fn new(
        form: &FormDescriptor,
        ranges: &BTreeMap<String, RawRangeSpec>,
        url: &str,
        submit: &SubmitControl,
    ) -> Result<Self, ConfigError> {
        let mut axes = Vec::with_capacity(ranges.len());
        let mut hint = 1usize;
        for (field, raw) in ranges {
            let descriptor = form
                .inputs
                .get(field)
                .ok_or_else(|| ConfigError::UnknownField(field.clone()))?;
            let spec = RangeSpec::parse(field, raw)?;
            let start = spec.expand(descriptor);
            hint = hint.saturating_mul(start.remaining());
            axes.push(Axis {
                field: field.clone(),
                current: start.clone(),
                start,
                value: String::new(),
            });
        }
        Ok(Self {
            axes,
            url: url.to_string(),
            submit: submit.clone(),
            started: false,
            exhausted: false,
            hint,
        })
    }

    /// Total number of rows this space produces: the product of every
    /// field's expansion size.
    pub fn len_hint(&self) -> usize {
        self.hint
    }

    fn first(&mut self) -> bool {
        for axis in &mut self.axes {
            match axis.current.next() {
                Some(value) => axis.value = value,
                None => return false,
            }
        }
        true
    }

    fn advance(&mut self) -> bool {
        for axis in self.axes.iter_mut().rev() {
            if let Some(value) = axis.current.next() {
                axis.value = value;
                return true;
            }
            // Rewind this axis and carry into the next slower one.
            axis.current = axis.start.clone();
            match axis.current.next() {
                Some(value) => axis.value = value,
                None => return false,
            }
        }
        false
    }

    fn row(&self) -> InputRow {
        InputRow {
            fields: self
                .axes
                .iter()
                .map(|axis| (axis.field.clone(), axis.value.clone()))
                .collect(),
            url: self.url.clone(),
            subkey: self.submit.key().to_string(),
            subval: self.submit.value().to_string(),
        }
    }
}

impl Iterator for InputSpace {
    type Item = InputRow;

    fn next(&mut self) -> Option<InputRow> {
        if self.exhausted {
            return None;
        }
        let produced = if self.started {
            self.advance()
        } else {
            self.started = true;
            self.first()
        };
        if produced {
            Some(self.row())
        } else {
            self.exhausted = true;
            None
        }
    }
}
