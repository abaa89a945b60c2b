//! Formscrape engine: page parsing, the job ledger, browser driving and the
//! scrape loop.
mod browser;
mod chromium;
mod decode;
mod fetch;
mod ledger;
mod orchestrator;
mod persist;
mod schema;
mod tables;

pub use browser::{Browser, BrowserError};
pub use chromium::ChromiumBrowser;
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use fetch::{FailureKind, FetchError, FetchSettings, FetchedPage, PageFetcher, ReqwestFetcher};
pub use ledger::{row_hash, GrowthReport, Ledger, LedgerError, LedgerSnapshot, PendingRow};
pub use orchestrator::{
    plan_navigation, Navigation, Orchestrator, RunError, RunSummary, ScrapeSettings,
    DEFAULT_SCREENSHOT,
};
pub use persist::{ensure_output_dir, write_file_atomically, AtomicFileWriter, PersistError};
pub use schema::{extract_forms, ScanReport, SchemaError, DEFAULT_FORM_TAG};
pub use tables::{extract_result_tables, parse_tables};
