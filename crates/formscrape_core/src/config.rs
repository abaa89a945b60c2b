use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ConfigError, OutputTableSpec, RangeSpec, RawRangeSpec, SubmitControl, TableSelection};

const DEFAULT_WAIT_SECS: f64 = 10.0;

/// The configuration document of one scraping project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Page holding the form.
    pub url: String,
    /// Which form of the schema document to fill.
    pub input_form_id: String,
    /// Schema document produced by `scan`.
    pub form_schema: PathBuf,
    pub form_inputs: BTreeMap<String, RawRangeSpec>,
    pub submit_with: SubmitControl,
    pub output_table: OutputTableSpec,
    #[serde(default)]
    pub form_wait: Option<WaitSpec>,
    #[serde(default)]
    pub table_wait: Option<WaitSpec>,
    /// The results page carries the form too, so consecutive rows against the
    /// same target skip navigation entirely.
    #[serde(default)]
    pub form_on_table_page: bool,
    /// SQLite database path or `sqlite:` URL.
    pub output_db: String,
    #[serde(default)]
    pub screenshot_path: Option<PathBuf>,
    /// Tag the form was scanned with.
    #[serde(default = "default_form_tag")]
    pub form_tag: String,
}

fn default_form_tag() -> String {
    "form".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocatorKind {
    #[default]
    Id,
    Class,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub kind: LocatorKind,
    pub value: String,
}

impl Locator {
    /// CSS selector addressing this locator.
    pub fn css(&self) -> String {
        match self.kind {
            LocatorKind::Id => format!("[id=\"{}\"]", css_escape(&self.value)),
            LocatorKind::Class => format!("[class~=\"{}\"]", css_escape(&self.value)),
            LocatorKind::Tag => self.value.clone(),
        }
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Wait settings as written in the document. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitSpec {
    #[serde(default)]
    pub by: LocatorKind,
    pub value: String,
    #[serde(default = "default_delay")]
    pub delay: f64,
    #[serde(default)]
    pub throttle: f64,
    /// Page text that marks a legitimately empty result.
    #[serde(default)]
    pub absent_str: Option<String>,
}

fn default_delay() -> f64 {
    DEFAULT_WAIT_SECS
}

/// Resolved wait: what to wait for, for how long, and what to do after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wait {
    pub locator: Locator,
    pub timeout: Duration,
    pub throttle: Duration,
    pub absent_str: Option<String>,
}

impl Default for Wait {
    /// Waits for `<body>`, which every loaded page has.
    fn default() -> Self {
        Self {
            locator: Locator {
                kind: LocatorKind::Tag,
                value: "body".to_string(),
            },
            timeout: Duration::from_secs_f64(DEFAULT_WAIT_SECS),
            throttle: Duration::ZERO,
            absent_str: None,
        }
    }
}

impl WaitSpec {
    fn resolve(&self, key: &str) -> Result<Wait, ConfigError> {
        Ok(Wait {
            locator: Locator {
                kind: self.by,
                value: self.value.clone(),
            },
            timeout: seconds(&format!("{key}.delay"), self.delay)?,
            throttle: seconds(&format!("{key}.throttle"), self.throttle)?,
            absent_str: self.absent_str.clone(),
        })
    }
}

fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|err| ConfigError::invalid(key, format!("{value}: {err}")))
}

impl ScrapeConfig {
    /// Checks every key up front so misconfiguration fails before any browser
    /// work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.url).map_err(|err| ConfigError::invalid("url", err.to_string()))?;
        if self.input_form_id.is_empty() {
            return Err(ConfigError::MissingKey("input_form_id".into()));
        }
        if self.output_db.is_empty() {
            return Err(ConfigError::MissingKey("output_db".into()));
        }
        if self.submit_with.value().is_empty() {
            return Err(ConfigError::invalid("submit_with", "empty submit control"));
        }
        self.range_specs()?;
        self.table_selection()?;
        self.form_wait()?;
        self.table_wait()?;
        Ok(())
    }

    pub fn range_specs(&self) -> Result<BTreeMap<String, RangeSpec>, ConfigError> {
        self.form_inputs
            .iter()
            .map(|(field, raw)| Ok((field.clone(), RangeSpec::parse(field, raw)?)))
            .collect()
    }

    pub fn table_selection(&self) -> Result<TableSelection, ConfigError> {
        TableSelection::from_spec(&self.output_table)
    }

    pub fn form_wait(&self) -> Result<Wait, ConfigError> {
        self.form_wait
            .as_ref()
            .map_or_else(|| Ok(Wait::default()), |spec| spec.resolve("form_wait"))
    }

    pub fn table_wait(&self) -> Result<Wait, ConfigError> {
        self.table_wait
            .as_ref()
            .map_or_else(|| Ok(Wait::default()), |spec| spec.resolve("table_wait"))
    }
}
