use std::time::Duration;

use async_trait::async_trait;
use formscrape_core::{Locator, SubmitControl};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("could not start browser: {0}")]
    Launch(String),
    #[error("browser driver error: {0}")]
    Driver(String),
    #[error("no element matches {0}")]
    ElementNotFound(String),
    #[error("expected exactly one label for option {option_id:?}, found {found}")]
    AmbiguousLabel { option_id: String, found: usize },
    #[error("select {select_id:?} has no option with text {text:?}")]
    OptionNotFound { select_id: String, text: String },
}

/// One live browser session, driven strictly sequentially.
///
/// Waits never fail: they report whether the element showed up in time.
#[async_trait]
pub trait Browser: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// History back, as the user's back button.
    async fn back(&mut self) -> Result<(), BrowserError>;

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<bool, BrowserError>;

    /// Serialized DOM of the current page, after scripts ran.
    async fn page_source(&mut self) -> Result<String, BrowserError>;

    /// Replaces the content of the text input `id`.
    async fn fill_text(&mut self, id: &str, value: &str) -> Result<(), BrowserError>;

    /// Picks the option of select `id` whose visible text is `text`.
    async fn select_by_text(&mut self, id: &str, text: &str) -> Result<(), BrowserError>;

    /// Activates a radio option by clicking the single label tied to it.
    async fn click_label_for(&mut self, option_id: &str) -> Result<(), BrowserError>;

    async fn click_submit(&mut self, control: &SubmitControl) -> Result<(), BrowserError>;

    async fn screenshot_png(&mut self) -> Result<Vec<u8>, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}
