use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use formscrape_core::{InputSpace, JobStatus, Partition, Wait};
use formscrape_engine::{
    extract_forms, write_file_atomically, Browser, ChromiumBrowser, FetchSettings, Ledger,
    Orchestrator, PageFetcher, ReqwestFetcher, RunSummary, ScrapeSettings,
};

use crate::documents::{load_config, load_form, render_forms};

pub struct ScanArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub form_tag: String,
    pub visible: bool,
    pub static_fetch: bool,
}

pub struct ScrapeArgs {
    pub config: PathBuf,
    pub kth: u64,
    pub n: u64,
    pub max_to_work: usize,
    pub visible: bool,
}

/// Loads a page, reads its forms and writes them out as a schema document.
pub async fn scan(args: ScanArgs) -> Result<()> {
    engine_info!("Accessing {}", args.url);
    let html = if args.static_fetch {
        ReqwestFetcher::new(FetchSettings::default())
            .fetch(&args.url)
            .await
            .with_context(|| format!("fetching {}", args.url))?
            .html
    } else {
        rendered_source(&args.url, args.visible).await?
    };

    let report = extract_forms(&html, &args.form_tag).context("reading forms")?;
    if report.forms.is_empty() {
        engine_warn!("No <{}> elements found on {}", args.form_tag, args.url);
    }
    let document = render_forms(&report.forms)?;

    match args.output.as_deref() {
        None => println!("{document}"),
        Some(path) if path == Path::new("stdout") => println!("{document}"),
        Some(path) => {
            write_file_atomically(path, document.as_bytes())
                .with_context(|| format!("writing {}", path.display()))?;
            engine_info!("Wrote {} form(s) to {}", report.forms.len(), path.display());
        }
    }
    Ok(())
}

async fn rendered_source(url: &str, visible: bool) -> Result<String> {
    let mut browser = ChromiumBrowser::launch(!visible).await?;
    let loaded = load_page(&mut browser, url).await;
    if let Err(err) = browser.close().await {
        engine_warn!("Browser did not close cleanly: {}", err);
    }
    loaded
}

async fn load_page(browser: &mut ChromiumBrowser, url: &str) -> Result<String> {
    browser.goto(url).await?;
    let wait = Wait::default();
    if !browser.wait_for(&wait.locator, wait.timeout).await? {
        engine_warn!("Page did not finish loading within {:?}", wait.timeout);
    }
    Ok(browser.page_source().await?)
}

/// Brings the ledger up to date with the configuration, then works through
/// this worker's pending rows.
pub async fn scrape(args: ScrapeArgs) -> Result<RunSummary> {
    let config = load_config(&args.config)?;
    let partition = Partition::new(args.kth, args.n)?;
    let form = load_form(&config.form_schema, &config.input_form_id)?;

    let space = InputSpace::new(&form, &config.form_inputs, &config.url, &config.submit_with)
        .context("expanding form inputs")?;
    engine_info!("Input space holds {} row(s)", space.len_hint());

    let ledger = Ledger::open(&config.output_db)
        .await
        .with_context(|| format!("opening {}", config.output_db))?;
    let snapshot = ledger.update_inputs(space).await?;
    let pending = ledger.sync_results().await?;

    let mut settings = ScrapeSettings::from_config(&config, form)?;
    settings.partition = partition;
    settings.max_rows = args.max_to_work;

    let browser = ChromiumBrowser::launch(!args.visible).await?;
    let mut orchestrator = Orchestrator::new(browser, &ledger, settings);
    let outcome = orchestrator.run(&snapshot.rows, pending).await;
    if let Err(err) = orchestrator.into_browser().close().await {
        engine_warn!("Browser did not close cleanly: {}", err);
    }

    let counts = ledger.status_counts().await?;
    engine_info!(
        "Ledger: {} not started, {} started, {} done, {} error",
        counts[&JobStatus::NotStarted],
        counts[&JobStatus::Started],
        counts[&JobStatus::Done],
        counts[&JobStatus::Error]
    );
    Ok(outcome?)
}
