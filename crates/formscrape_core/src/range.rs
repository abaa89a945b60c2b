use serde::{Deserialize, Serialize};

use crate::{ConfigError, FieldDescriptor};

/// A range as written in the configuration document: `(kind: "list", value: [..])`.
///
/// `kind` stays a free string here so that a typo surfaces as
/// [`ConfigError::UnknownRangeType`] instead of a generic parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRangeSpec {
    pub kind: String,
    #[serde(default)]
    pub value: RangeValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeValue {
    One(String),
    Many(Vec<String>),
}

impl Default for RangeValue {
    fn default() -> Self {
        RangeValue::Many(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    Const(String),
    List(Vec<String>),
    All,
    AllBut(Vec<String>),
    Slice { start: i64, stop: i64, step: i64 },
}

impl RangeSpec {
    pub fn parse(field: &str, raw: &RawRangeSpec) -> Result<Self, ConfigError> {
        match (raw.kind.as_str(), &raw.value) {
            ("const", RangeValue::One(v)) => Ok(RangeSpec::Const(v.clone())),
            ("const", RangeValue::Many(_)) => Err(ConfigError::invalid(
                field,
                "range type const must have a single string value",
            )),
            ("list", RangeValue::Many(vs)) => Ok(RangeSpec::List(vs.clone())),
            ("list", RangeValue::One(_)) => Err(ConfigError::invalid(
                field,
                "range type list must have a list value",
            )),
            ("all", _) => Ok(RangeSpec::All),
            ("all-but", RangeValue::Many(vs)) => Ok(RangeSpec::AllBut(vs.clone())),
            ("all-but", RangeValue::One(_)) => Err(ConfigError::invalid(
                field,
                "range type all-but must have a list value",
            )),
            ("slice", RangeValue::One(v)) => parse_slice(field, v),
            ("slice", RangeValue::Many(_)) => Err(ConfigError::BadSlice {
                field: field.to_string(),
                value: String::new(),
                message: "expected \"start stop step\"".into(),
            }),
            (other, _) => Err(ConfigError::UnknownRangeType {
                field: field.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    /// Candidate values for one field, in a stable order.
    pub fn expand(&self, field: &FieldDescriptor) -> FieldValues {
        match self {
            RangeSpec::Const(v) => FieldValues::listed(vec![v.clone()]),
            RangeSpec::List(vs) => FieldValues::listed(vs.clone()),
            RangeSpec::All => FieldValues::listed(field.options().to_vec()),
            RangeSpec::AllBut(excluded) => FieldValues::listed(
                field
                    .options()
                    .iter()
                    .filter(|option| !excluded.contains(option))
                    .cloned()
                    .collect(),
            ),
            RangeSpec::Slice { start, stop, step } => FieldValues::Slice {
                next: *start,
                stop: *stop,
                step: *step,
            },
        }
    }
}

fn parse_slice(field: &str, value: &str) -> Result<RangeSpec, ConfigError> {
    let bad = |message: &str| ConfigError::BadSlice {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    };
    let parts = value
        .split_whitespace()
        .map(str::parse::<i64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| bad(&err.to_string()))?;
    match parts.as_slice() {
        [_, _, 0] => Err(bad("step must not be zero")),
        [start, stop, step] => Ok(RangeSpec::Slice {
            start: *start,
            stop: *stop,
            step: *step,
        }),
        _ => Err(bad("expected \"start stop step\"")),
    }
}

/// Lazily produced values of one field. Cloning restarts from the same point,
/// which the product iterator relies on to rewind an axis.
#[derive(Debug, Clone)]
pub enum FieldValues {
    Listed(std::vec::IntoIter<String>),
    /// Half-open `start..stop` by `step`; `step` may be negative.
    Slice { next: i64, stop: i64, step: i64 },
}

impl FieldValues {
    fn listed(values: Vec<String>) -> Self {
        FieldValues::Listed(values.into_iter())
    }

    /// Exact number of remaining values.
    pub fn remaining(&self) -> usize {
        match self {
            FieldValues::Listed(it) => it.len(),
            FieldValues::Slice { next, stop, step } => {
                let (next, stop) = (i128::from(*next), i128::from(*stop));
                let span = if *step > 0 { stop - next } else { next - stop };
                if span <= 0 {
                    0
                } else {
                    let step = i128::from(step.unsigned_abs());
                    ((span + step - 1) / step) as usize
                }
            }
        }
    }
}

impl Iterator for FieldValues {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            FieldValues::Listed(it) => it.next(),
            FieldValues::Slice { next, stop, step } => {
                let in_range = if *step > 0 { *next < *stop } else { *next > *stop };
                if !in_range {
                    return None;
                }
                let current = *next;
                *next = next.saturating_add(*step);
                Some(current.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RangeSpec, RangeValue, RawRangeSpec};
    use crate::{ConfigError, FieldDescriptor};

    fn raw(kind: &str, value: RangeValue) -> RawRangeSpec {
        RawRangeSpec {
            kind: kind.to_string(),
            value,
        }
    }

    #[test]
    fn slice_is_half_open_and_supports_negative_steps() {
        let spec = RangeSpec::parse("n", &raw("slice", RangeValue::One("0 7 3".into()))).unwrap();
        let field = FieldDescriptor::Text { name: None };
        let values: Vec<_> = spec.expand(&field).collect();
        assert_eq!(values, vec!["0", "3", "6"]);
        assert_eq!(spec.expand(&field).remaining(), 3);

        let spec = RangeSpec::parse("n", &raw("slice", RangeValue::One("5 0 -2".into()))).unwrap();
        let values: Vec<_> = spec.expand(&field).collect();
        assert_eq!(values, vec!["5", "3", "1"]);
        assert_eq!(spec.expand(&field).remaining(), 3);
    }

    #[test]
    fn zero_step_and_garbage_are_rejected() {
        let err = RangeSpec::parse("n", &raw("slice", RangeValue::One("0 5 0".into()))).unwrap_err();
        assert!(matches!(err, ConfigError::BadSlice { .. }));
        let err = RangeSpec::parse("n", &raw("slice", RangeValue::One("a b".into()))).unwrap_err();
        assert!(matches!(err, ConfigError::BadSlice { .. }));
    }

    #[test]
    fn unknown_kind_is_reported_by_name() {
        let err = RangeSpec::parse("q", &raw("some", RangeValue::default())).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownRangeType {
                field: "q".into(),
                kind: "some".into()
            }
        );
    }

    #[test]
    fn all_but_keeps_option_order() {
        let field = FieldDescriptor::Select {
            name: None,
            values: vec![None, None, None],
            texts: vec!["a".into(), "b".into(), "c".into()],
        };
        let spec = RangeSpec::parse(
            "sort",
            &raw("all-but", RangeValue::Many(vec!["b".into()])),
        )
        .unwrap();
        let values: Vec<_> = spec.expand(&field).collect();
        assert_eq!(values, vec!["a", "c"]);
    }
}
