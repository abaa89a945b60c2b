use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// All forms found on one page, keyed by form id. This is the form schema
/// document written by `scan` and read back by `scrape`.
pub type FormSet = BTreeMap<String, FormDescriptor>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub id: String,
    /// Element id -> field. Radio groups are keyed by their shared name.
    pub inputs: BTreeMap<String, FieldDescriptor>,
    /// Button id -> label text.
    pub buttons: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldDescriptor {
    Text {
        name: Option<String>,
    },
    /// One entry per option; the three vectors are index-aligned.
    Radio {
        name: Option<String>,
        radio_ids: Vec<String>,
        label_ids: Vec<Option<String>>,
        label_texts: Vec<String>,
    },
    /// Option values and visible texts in document order.
    Select {
        name: Option<String>,
        values: Vec<Option<String>>,
        texts: Vec<String>,
    },
    Hidden {
        name: Option<String>,
    },
}

impl FieldDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldDescriptor::Text { .. } => "text",
            FieldDescriptor::Radio { .. } => "radio",
            FieldDescriptor::Select { .. } => "select",
            FieldDescriptor::Hidden { .. } => "hidden",
        }
    }

    /// The values an `all` range expands to.
    ///
    /// Selects are filled by visible text and radios by option id, so those are
    /// the option sets. Free-form fields have none.
    pub fn options(&self) -> &[String] {
        match self {
            FieldDescriptor::Select { texts, .. } => texts,
            FieldDescriptor::Radio { radio_ids, .. } => radio_ids,
            FieldDescriptor::Text { .. } | FieldDescriptor::Hidden { .. } => &[],
        }
    }
}

/// The control clicked to submit the form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmitControl {
    Id(String),
    Name(String),
}

impl SubmitControl {
    /// Column pair stored with every input row: `("id" | "name", value)`.
    pub fn key(&self) -> &'static str {
        match self {
            SubmitControl::Id(_) => "id",
            SubmitControl::Name(_) => "name",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            SubmitControl::Id(v) | SubmitControl::Name(v) => v,
        }
    }

    pub fn from_parts(key: &str, value: &str) -> Result<Self, ConfigError> {
        match key {
            "id" => Ok(SubmitControl::Id(value.to_string())),
            "name" => Ok(SubmitControl::Name(value.to_string())),
            other => Err(ConfigError::invalid(
                "submit_with",
                format!("submit control must be addressed by id or name, got {other:?}"),
            )),
        }
    }
}
