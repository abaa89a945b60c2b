//! Formscrape core: pure domain types and the input-space/state rules of a
//! resumable form-scraping job. No IO happens in this crate.
mod config;
mod error;
mod form;
mod generate;
mod partition;
mod range;
mod record;
mod status;
mod tables;

pub use config::{Locator, LocatorKind, ScrapeConfig, Wait, WaitSpec};
pub use error::{ConfigError, TableError};
pub use form::{FieldDescriptor, FormDescriptor, FormSet, SubmitControl};
pub use generate::{InputRow, InputSpace};
pub use partition::Partition;
pub use range::{FieldValues, RangeSpec, RangeValue, RawRangeSpec};
pub use record::Provenance;
pub use status::{JobStatus, UnknownStatus};
pub use tables::{OutputTableSpec, Table, TablePositions, TableSelection};
