//! Reading and writing the RON documents the binary works with: the scrape
//! configuration and the form schema produced by `scan`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use formscrape_core::{FormDescriptor, FormSet, ScrapeConfig};
use ron::extensions::Extensions;
use ron::ser::PrettyConfig;
use serde::de::DeserializeOwned;

fn ron_options() -> ron::Options {
    ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    ron_options()
        .from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))
}

/// Loads and validates a scrape configuration. Relative paths inside it are
/// resolved against the directory holding the configuration file.
pub fn load_config(path: &Path) -> Result<ScrapeConfig> {
    let mut config: ScrapeConfig = read_document(path)?;
    config
        .validate()
        .with_context(|| format!("invalid configuration {}", path.display()))?;

    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    config.form_schema = resolve(base, &config.form_schema);
    if let Some(screenshot) = config.screenshot_path.take() {
        config.screenshot_path = Some(resolve(base, &screenshot));
    }
    if !config.output_db.starts_with("sqlite:") {
        config.output_db = resolve(base, Path::new(&config.output_db))
            .to_string_lossy()
            .into_owned();
    }
    Ok(config)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Loads the schema document and picks the form `form_id` out of it.
pub fn load_form(path: &Path, form_id: &str) -> Result<FormDescriptor> {
    let mut forms: FormSet = read_document(path)?;
    forms.remove(form_id).ok_or_else(|| {
        anyhow!(
            "form {:?} is not in {} (found: {})",
            form_id,
            path.display(),
            forms.keys().cloned().collect::<Vec<_>>().join(", ")
        )
    })
}

pub fn render_forms(forms: &FormSet) -> Result<String> {
    ron::ser::to_string_pretty(forms, PrettyConfig::new()).context("serializing form schema")
}
