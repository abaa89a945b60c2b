//! The scrape loop: one browser session works through pending input rows in
//! id order, recording each row's progress in the ledger as it goes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use formscrape_core::{
    ConfigError, FieldDescriptor, FormDescriptor, InputRow, JobStatus, Partition, Provenance,
    ScrapeConfig, TableError, TableSelection, Wait,
};
use thiserror::Error;

use crate::browser::{Browser, BrowserError};
use crate::ledger::{Ledger, LedgerError, PendingRow};
use crate::persist::{write_file_atomically, PersistError};
use crate::schema::extract_forms;
use crate::tables::extract_result_tables;

pub const DEFAULT_SCREENSHOT: &str = "debug.png";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("row {row}: form did not load ({locator} not found within {timeout:?})")]
    FormLoadTimeout {
        row: i64,
        locator: String,
        timeout: Duration,
    },
    #[error("row {row}: field {field:?} is not part of the form schema")]
    UnexpectedFieldKey { row: i64, field: String },
    #[error("row {row}: results did not appear and the page does not say there are none")]
    ResultTimeout {
        row: i64,
        screenshot: Option<PathBuf>,
    },
    #[error("pending row {0} has no input row in the ledger")]
    MissingInputRow(i64),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Everything the loop needs to know about one scraping project.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub input_form_id: String,
    /// The form as scanned at configuration time.
    pub form: FormDescriptor,
    pub form_tag: String,
    pub form_wait: Wait,
    pub table_wait: Wait,
    pub form_on_results_page: bool,
    pub tables: TableSelection,
    pub partition: Partition,
    /// Rows to process in this run; 0 means all.
    pub max_rows: usize,
    pub screenshot_path: PathBuf,
}

impl ScrapeSettings {
    pub fn from_config(config: &ScrapeConfig, form: FormDescriptor) -> Result<Self, ConfigError> {
        Ok(Self {
            input_form_id: config.input_form_id.clone(),
            form,
            form_tag: config.form_tag.clone(),
            form_wait: config.form_wait()?,
            table_wait: config.table_wait()?,
            form_on_results_page: config.form_on_table_page,
            tables: config.table_selection()?,
            partition: Partition::whole(),
            max_rows: 0,
            screenshot_path: config
                .screenshot_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREENSHOT)),
        })
    }
}

/// How to reach the form for the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Stay on the current page; the form is right there.
    Reuse,
    /// Go back one history entry to the form page.
    Back,
    Load,
}

pub fn plan_navigation(
    previous_url: Option<&str>,
    next_url: &str,
    form_on_results_page: bool,
) -> Navigation {
    match previous_url {
        Some(prev) if prev == next_url && form_on_results_page => Navigation::Reuse,
        Some(prev) if prev == next_url => Navigation::Back,
        _ => Navigation::Load,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Pending rows in this worker's partition.
    pub partition_size: usize,
    pub attempted: usize,
    /// Rows done after reading their results page.
    pub done: usize,
    /// Rows done because the page reported no results.
    pub empty: usize,
    /// Rows whose live form differed from the scanned one.
    pub schema_mismatches: usize,
}

enum RowOutcome {
    Posted(usize),
    Empty,
}

/// Sets the logging row context for as long as it lives.
struct RowContext;

impl RowContext {
    fn enter(id: i64) -> Self {
        engine_logging::set_current_row(id);
        Self
    }
}

impl Drop for RowContext {
    fn drop(&mut self) {
        engine_logging::clear_current_row();
    }
}

pub struct Orchestrator<'a, B: Browser> {
    browser: B,
    ledger: &'a Ledger,
    settings: ScrapeSettings,
}

impl<'a, B: Browser> Orchestrator<'a, B> {
    pub fn new(browser: B, ledger: &'a Ledger, settings: ScrapeSettings) -> Self {
        Self {
            browser,
            ledger,
            settings,
        }
    }

    pub fn into_browser(self) -> B {
        self.browser
    }

    /// Processes this worker's share of `pending`, in order, until it is
    /// exhausted or the row cap is reached.
    ///
    /// Any fatal condition stops the run at once. Rows finished so far stay
    /// finished, so a later run picks up where this one stopped.
    pub async fn run(
        &mut self,
        inputs: &BTreeMap<i64, InputRow>,
        pending: Vec<PendingRow>,
    ) -> Result<RunSummary, RunError> {
        let mut work = self.settings.partition.select(pending, |row| row.id);
        let mut summary = RunSummary {
            partition_size: work.len(),
            ..RunSummary::default()
        };
        if self.settings.max_rows > 0 {
            work.truncate(self.settings.max_rows);
        }
        engine_info!(
            "Partition {} of {}: {} pending row(s), working on {}",
            self.settings.partition.k(),
            self.settings.partition.n(),
            summary.partition_size,
            work.len()
        );

        let mut previous_url: Option<String> = None;
        for (position, pending) in work.iter().enumerate() {
            let _context = RowContext::enter(pending.id);
            let row = inputs
                .get(&pending.id)
                .ok_or(RunError::MissingInputRow(pending.id))?;
            engine_info!("Working on input {} of {}", position + 1, work.len());
            if pending.status == JobStatus::Started {
                engine_warn!("Row was left started by an earlier run, retrying it");
            }

            summary.attempted += 1;
            let outcome = self
                .process_row(pending.id, row, previous_url.as_deref(), &mut summary)
                .await?;
            previous_url = Some(row.url.clone());
            match outcome {
                RowOutcome::Posted(records) => {
                    summary.done += 1;
                    engine_debug!("Posted {} record(s)", records);
                }
                RowOutcome::Empty => summary.empty += 1,
            }
        }

        engine_info!(
            "Run finished: {} attempted, {} done, {} empty",
            summary.attempted,
            summary.done,
            summary.empty
        );
        if summary.schema_mismatches > 0 {
            engine_warn!(
                "The live form differed from the scanned schema on {} row(s)",
                summary.schema_mismatches
            );
        }
        Ok(summary)
    }

    async fn process_row(
        &mut self,
        id: i64,
        row: &InputRow,
        previous_url: Option<&str>,
        summary: &mut RunSummary,
    ) -> Result<RowOutcome, RunError> {
        self.ledger.set_status(id, JobStatus::Started).await?;

        match plan_navigation(previous_url, &row.url, self.settings.form_on_results_page) {
            Navigation::Reuse => engine_debug!("Form is on the results page, staying put"),
            Navigation::Back => self.browser.back().await?,
            Navigation::Load => self.browser.goto(&row.url).await?,
        }
        let form_wait = &self.settings.form_wait;
        if !self
            .browser
            .wait_for(&form_wait.locator, form_wait.timeout)
            .await?
        {
            return Err(RunError::FormLoadTimeout {
                row: id,
                locator: form_wait.locator.css(),
                timeout: form_wait.timeout,
            });
        }
        pause(form_wait.throttle).await;

        if !self.check_live_form().await? {
            summary.schema_mismatches += 1;
        }
        self.fill_and_submit(id, row).await?;

        let table_wait = &self.settings.table_wait;
        if !self
            .browser
            .wait_for(&table_wait.locator, table_wait.timeout)
            .await?
        {
            let source = self.browser.page_source().await?;
            let sentinel = table_wait.absent_str.as_deref();
            if sentinel.is_some_and(|marker| source.contains(marker)) {
                engine_info!("No results for this input");
                self.ledger.set_status(id, JobStatus::Done).await?;
                return Ok(RowOutcome::Empty);
            }
            self.ledger.set_status(id, JobStatus::Error).await?;
            let screenshot = self.capture_screenshot().await;
            return Err(RunError::ResultTimeout { row: id, screenshot });
        }
        pause(table_wait.throttle).await;

        let source = self.browser.page_source().await?;
        let tables = extract_result_tables(&source, &self.settings.tables)?;

        let provenance = Provenance {
            row: row.clone(),
            input_form_id: self.settings.input_form_id.clone(),
            input_index: id,
        };
        let mut records = 0;
        for (name, table) in &tables {
            records += self.ledger.post_table(name, table, &provenance).await?;
        }

        self.ledger.set_status(id, JobStatus::Done).await?;
        Ok(RowOutcome::Posted(records))
    }

    /// Warns when the live form no longer matches the scanned one and
    /// returns whether it matched. The run continues with the scanned form
    /// either way.
    async fn check_live_form(&mut self) -> Result<bool, RunError> {
        let source = self.browser.page_source().await?;
        match extract_forms(&source, &self.settings.form_tag) {
            Ok(report) => {
                let matches =
                    report.forms.get(&self.settings.input_form_id) == Some(&self.settings.form);
                if !matches {
                    engine_warn!(
                        "Form {} on the page differs from the scanned schema",
                        self.settings.input_form_id
                    );
                }
                Ok(matches)
            }
            Err(err) => {
                engine_warn!("Could not re-read the live form: {}", err);
                Ok(false)
            }
        }
    }

    async fn fill_and_submit(&mut self, id: i64, row: &InputRow) -> Result<(), RunError> {
        for (field, value) in &row.fields {
            let descriptor =
                self.settings
                    .form
                    .inputs
                    .get(field)
                    .ok_or_else(|| RunError::UnexpectedFieldKey {
                        row: id,
                        field: field.clone(),
                    })?;
            match descriptor {
                FieldDescriptor::Text { .. } => self.browser.fill_text(field, value).await?,
                FieldDescriptor::Select { .. } => self.browser.select_by_text(field, value).await?,
                FieldDescriptor::Radio { .. } => self.browser.click_label_for(value).await?,
                FieldDescriptor::Hidden { .. } => {
                    engine_debug!("Skipping hidden field {}", field);
                }
            }
        }
        let submit = row.submit_control()?;
        self.browser.click_submit(&submit).await?;
        Ok(())
    }

    async fn capture_screenshot(&mut self) -> Option<PathBuf> {
        let png = match self.browser.screenshot_png().await {
            Ok(png) => png,
            Err(err) => {
                engine_warn!("Could not capture a screenshot: {}", err);
                return None;
            }
        };
        match write_file_atomically(&self.settings.screenshot_path, &png) {
            Ok(path) => {
                engine_info!("Saved screenshot to {}", path.display());
                Some(path)
            }
            Err(err) => {
                engine_warn!("Could not save screenshot: {}", err);
                None
            }
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_navigation, Navigation};

    #[test]
    fn first_row_always_loads() {
        assert_eq!(plan_navigation(None, "https://a", true), Navigation::Load);
        assert_eq!(plan_navigation(None, "https://a", false), Navigation::Load);
    }

    #[test]
    fn same_target_goes_back_unless_form_is_on_results_page() {
        assert_eq!(
            plan_navigation(Some("https://a"), "https://a", false),
            Navigation::Back
        );
        assert_eq!(
            plan_navigation(Some("https://a"), "https://a", true),
            Navigation::Reuse
        );
    }

    #[test]
    fn new_target_loads() {
        assert_eq!(
            plan_navigation(Some("https://a"), "https://b", true),
            Navigation::Load
        );
    }
}
