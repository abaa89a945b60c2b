mod commands;
mod documents;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use engine_logging::{engine_error, engine_info};
use formscrape_engine::{RunError, DEFAULT_FORM_TAG};

use crate::commands::{ScanArgs, ScrapeArgs};
use crate::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "formscrape",
    version,
    about = "Fill a web form with every combination of inputs and collect the result tables"
)]
struct Cli {
    /// Where log output goes.
    #[arg(long, value_enum, global = true, default_value = "terminal")]
    log: LogDestination,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a page and write out the forms on it.
    Scan {
        /// Page with the form(s), including http(s)://.
        #[arg(long)]
        url: String,
        /// Schema file to write; "stdout" or nothing prints it.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Tag of the elements to treat as forms.
        #[arg(long, default_value = DEFAULT_FORM_TAG)]
        form_tag: String,
        /// Use a visible browser.
        #[arg(long)]
        debug: bool,
        /// Fetch the page over plain HTTP instead of rendering it.
        #[arg(long = "static")]
        static_fetch: bool,
    },
    /// Collect results for every input combination of a configuration.
    Scrape {
        /// Configuration document (RON).
        config: PathBuf,
        /// Process the kth input of every n.
        #[arg(long, default_value_t = 1)]
        kth: u64,
        /// Of every n inputs, process the kth.
        #[arg(long, default_value_t = 1)]
        n: u64,
        /// Maximum number of inputs to process; 0 for all.
        #[arg(long, default_value_t = 0)]
        max_to_work: usize,
        /// Use a visible browser.
        #[arg(long)]
        debug: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let destination = cli.log;
    logging::initialize(destination, cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            engine_error!("Could not start the async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Command::Scan {
                url,
                output,
                form_tag,
                debug,
                static_fetch,
            } => {
                commands::scan(ScanArgs {
                    url,
                    output,
                    form_tag,
                    visible: debug,
                    static_fetch,
                })
                .await
            }
            Command::Scrape {
                config,
                kth,
                n,
                max_to_work,
                debug,
            } => commands::scrape(ScrapeArgs {
                config,
                kth,
                n,
                max_to_work,
                visible: debug,
            })
            .await
            .map(|summary| {
                engine_info!(
                    "Worked {} of {} pending row(s): {} with results, {} empty",
                    summary.attempted,
                    summary.partition_size,
                    summary.done,
                    summary.empty
                );
            }),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(RunError::ResultTimeout {
                screenshot: Some(path),
                ..
            }) = err.downcast_ref::<RunError>()
            {
                engine_error!("Page at the time of failure saved to {}", path.display());
            }
            engine_error!("{:#}", err);
            if destination == LogDestination::File {
                eprintln!("formscrape: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, LogDestination};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scrape_takes_partition_and_cap() {
        let cli = Cli::parse_from([
            "formscrape", "--log", "both", "scrape", "job.ron", "--kth", "2", "--n", "3",
            "--max-to-work", "10",
        ]);
        assert_eq!(cli.log, LogDestination::Both);
        match cli.command {
            Command::Scrape {
                config,
                kth,
                n,
                max_to_work,
                debug,
            } => {
                assert_eq!(config.to_str(), Some("job.ron"));
                assert_eq!((kth, n, max_to_work, debug), (2, 3, 10, false));
            }
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn scan_defaults_to_form_tag_and_stdout() {
        let cli = Cli::parse_from(["formscrape", "scan", "--url", "https://example.com", "--static"]);
        match cli.command {
            Command::Scan {
                output,
                form_tag,
                static_fetch,
                ..
            } => {
                assert_eq!(output, None);
                assert_eq!(form_tag, "form");
                assert!(static_fetch);
            }
            other => panic!("parsed as {other:?}"),
        }
    }
}
