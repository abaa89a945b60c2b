use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser as CdpBrowser, BrowserConfig, Handler, Page};
use engine_logging::{engine_debug, engine_warn};
use formscrape_core::{Locator, LocatorKind, SubmitControl};
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::browser::{Browser, BrowserError};

/// Interval between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// How long a back navigation may take to replace the current document.
const BACK_TIMEOUT: Duration = Duration::from_secs(30);
/// Set on a document before leaving it; absent on whatever replaces it.
const LEAVING_MARKER: &str = "window.__formscrapeLeaving";

/// A Chromium session over the DevTools protocol, with a single tab.
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub async fn launch(headless: bool) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder().arg("--ignore-certificate-errors");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;
        let (browser, handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let handler_task = spawn_handler_task(handler);
        let page = browser.new_page("about:blank").await.map_err(driver)?;
        engine_debug!("Chromium started (headless: {})", headless);

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    async fn run_script<T: serde::de::DeserializeOwned>(
        &self,
        script: String,
    ) -> Result<T, BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(driver)?
            .into_value()
            .map_err(|e| BrowserError::Driver(e.to_string()))
    }
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                engine_warn!("chromium handler event error: {}", e);
            }
        }
    })
}

fn driver(err: CdpError) -> BrowserError {
    BrowserError::Driver(err.to_string())
}

/// The browser answered that a node is missing or stale, as opposed to the
/// session itself failing.
fn is_missing_node(err: &CdpError) -> bool {
    matches!(err, CdpError::Chrome(_) | CdpError::NotFound)
}

fn lookup_error(selector: &str, err: CdpError) -> BrowserError {
    if is_missing_node(&err) {
        BrowserError::ElementNotFound(selector.to_string())
    } else {
        driver(err)
    }
}

/// JS string literal for `value`.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.page.goto(url).await.map_err(driver)?;
        Ok(())
    }

    async fn back(&mut self) -> Result<(), BrowserError> {
        let _: bool = self
            .run_script(format!("{LEAVING_MARKER} = true; history.back(); true"))
            .await?;

        // history.back() returns before the navigation starts.
        let deadline = tokio::time::Instant::now() + BACK_TIMEOUT;
        loop {
            match self.page.evaluate(format!("{LEAVING_MARKER} === true")).await {
                Ok(result) => {
                    if matches!(result.into_value::<bool>(), Ok(false)) {
                        break;
                    }
                }
                Err(err) if is_missing_node(&err) => {}
                Err(err) => return Err(driver(err)),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Driver(format!(
                    "going back did not leave the page within {BACK_TIMEOUT:?}"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        self.page.wait_for_navigation().await.map_err(driver)?;
        Ok(())
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<bool, BrowserError> {
        let selector = locator.css();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.page.find_element(selector.as_str()).await {
                Ok(_) => return Ok(true),
                Err(err) if is_missing_node(&err) => {}
                Err(err) => return Err(driver(err)),
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.page.content().await.map_err(driver)
    }

    async fn fill_text(&mut self, id: &str, value: &str) -> Result<(), BrowserError> {
        let cleared: bool = self
            .run_script(format!(
                "(() => {{ const el = document.getElementById({}); if (!el) return false; el.value = ''; return true; }})()",
                js_string(id)
            ))
            .await?;
        if !cleared {
            return Err(BrowserError::ElementNotFound(format!("#{id}")));
        }
        let selector = Locator {
            kind: LocatorKind::Id,
            value: id.to_string(),
        }
        .css();
        let element = self
            .page
            .find_element(selector.as_str())
            .await
            .map_err(|err| lookup_error(&selector, err))?;
        element.click().await.map_err(driver)?;
        element.type_str(value).await.map_err(driver)?;
        Ok(())
    }

    async fn select_by_text(&mut self, id: &str, text: &str) -> Result<(), BrowserError> {
        let script = format!(
            r#"(() => {{
                const select = document.getElementById({id});
                if (!select) return "missing";
                const wanted = {text};
                const norm = (s) => s.replace(/\s+/g, " ").trim();
                const option = Array.from(select.options).find((o) => norm(o.text) === wanted);
                if (!option) return "no-option";
                select.value = option.value;
                option.selected = true;
                select.dispatchEvent(new Event("change", {{ bubbles: true }}));
                return "ok";
            }})()"#,
            id = js_string(id),
            text = js_string(text),
        );
        let outcome: String = self.run_script(script).await?;
        match outcome.as_str() {
            "ok" => Ok(()),
            "missing" => Err(BrowserError::ElementNotFound(format!("#{id}"))),
            _ => Err(BrowserError::OptionNotFound {
                select_id: id.to_string(),
                text: text.to_string(),
            }),
        }
    }

    async fn click_label_for(&mut self, option_id: &str) -> Result<(), BrowserError> {
        let selector = format!("label[for={}]", js_string(option_id));
        let labels = self
            .page
            .find_elements(selector.as_str())
            .await
            .map_err(driver)?;
        match labels.as_slice() {
            [label] => {
                label.click().await.map_err(driver)?;
                Ok(())
            }
            other => Err(BrowserError::AmbiguousLabel {
                option_id: option_id.to_string(),
                found: other.len(),
            }),
        }
    }

    async fn click_submit(&mut self, control: &SubmitControl) -> Result<(), BrowserError> {
        let selector = match control {
            SubmitControl::Id(id) => format!("[id={}]", js_string(id)),
            SubmitControl::Name(name) => format!("[name={}]", js_string(name)),
        };
        let element = self
            .page
            .find_element(selector.as_str())
            .await
            .map_err(|err| lookup_error(&selector, err))?;
        element.click().await.map_err(driver)?;
        Ok(())
    }

    async fn screenshot_png(&mut self) -> Result<Vec<u8>, BrowserError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page.screenshot(params).await.map_err(driver)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let closed = self.browser.close().await.map_err(driver);
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        closed.map(|_| ())
    }
}
