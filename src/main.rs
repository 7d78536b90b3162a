//! # Arbitration Case Checker Main Driver
//!
//! ## Purpose
//! Command-line entry point. Parses arguments, loads configuration, wires the
//! source connector and store into the coordinator, and renders status lines
//! and result tables to the console.
//!
//! ## Input/Output Specification
//! - **Input**: configuration file, command line arguments, environment
//!   variables
//! - **Output**: console status lines and result tables; CSV/JSON files for
//!   the export subcommands
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Build the source connector, store and coordinator
//! 4. Dispatch one subcommand through the coordinator

use chrono::NaiveDate;
use clap::{Arg, ArgMatches, Command};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use arbitr_checker::{
    app::{App, Presenter},
    config::Config,
    errors::{CheckerError, Result},
    scraper::ArbitrScraper,
    storage::{CaseFilter, CaseStore},
    CaseRecord,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let default_path = "config.toml".to_string();
    let config_path = matches
        .get_one::<String>("config")
        .unwrap_or(&default_path)
        .clone();
    let config = Config::from_file(&config_path)?;

    init_logging(&config)?;
    info!("Configuration loaded from: {}", config_path);

    let store = CaseStore::new(&config.storage.db_path);
    let scraper = ArbitrScraper::new(config.webdriver.clone(), config.source.clone())?;
    let app = App::new(scraper, store, config.source.max_results);
    let presenter = ConsolePresenter;

    let succeeded = match matches.subcommand() {
        Some(("search", sub)) => {
            let inn = required(sub, "inn")?;
            app.run_search(inn, &presenter).await;
            true
        }
        Some(("filter", sub)) => {
            let filter = CaseFilter {
                case_number: sub.get_one::<String>("case").cloned(),
                inn: sub.get_one::<String>("inn").cloned(),
                start_date: parse_date_arg(sub, "from")?,
                end_date: parse_date_arg(sub, "to")?,
            };
            app.run_filter(&filter, &presenter);
            true
        }
        Some(("export-csv", sub)) => {
            let path = required(sub, "path")?;
            app.export_csv(path.as_ref(), &presenter)
        }
        Some(("export-json", sub)) => {
            let path = required(sub, "path")?;
            app.export_json(path.as_ref(), &presenter)
        }
        _ => unreachable!("subcommand is required"),
    };

    // Scripts rely on the exit code to detect a failed or empty export.
    if !succeeded {
        std::process::exit(1);
    }

    Ok(())
}

fn build_cli() -> Command {
    Command::new("arbitr-checker")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Checks kad.arbitr.ru for arbitration cases by taxpayer ID")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .subcommand(
            Command::new("search")
                .about("Scrape cases for a taxpayer ID and persist them")
                .arg(
                    Arg::new("inn")
                        .value_name("INN")
                        .help("Taxpayer ID, 10 or 12 digits")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("filter")
                .about("List persisted cases matching the given filters")
                .arg(
                    Arg::new("case")
                        .long("case")
                        .value_name("SUBSTRING")
                        .help("Case number substring, case-insensitive"),
                )
                .arg(
                    Arg::new("inn")
                        .long("inn")
                        .value_name("SUBSTRING")
                        .help("Taxpayer ID substring"),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_name("YYYY-MM-DD")
                        .help("Earliest registration date, inclusive"),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .value_name("YYYY-MM-DD")
                        .help("Latest registration date, inclusive"),
                ),
        )
        .subcommand(
            Command::new("export-csv")
                .about("Export all persisted cases to a CSV file")
                .arg(Arg::new("path").value_name("PATH").required(true)),
        )
        .subcommand(
            Command::new("export-json")
                .about("Export all persisted cases to a JSON file")
                .arg(Arg::new("path").value_name("PATH").required(true)),
        )
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| CheckerError::Validation {
            field: name.to_string(),
            reason: format!("missing required argument '{name}'"),
        })
}

fn parse_date_arg(matches: &ArgMatches, name: &str) -> Result<Option<NaiveDate>> {
    match matches.get_one::<String>(name) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| CheckerError::Validation {
                field: name.to_string(),
                reason: format!("'{text}' is not a date in YYYY-MM-DD form"),
            }),
    }
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config
            .logging
            .level
            .parse()
            .map_err(|_| CheckerError::Config {
                message: format!("Invalid log level: {}", config.logging.level),
            })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);
    let fmt_layer = if config.logging.json_format {
        fmt_layer.json().with_filter(filter).boxed()
    } else {
        fmt_layer.with_filter(filter).boxed()
    };

    tracing_subscriber::registry().with(fmt_layer).init();
    Ok(())
}

/// Console presentation: status lines and a fixed-width result table on stdout
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn status(&self, text: &str) {
        println!("{text}");
    }

    fn results(&self, records: &[CaseRecord]) {
        if records.is_empty() {
            return;
        }
        println!("{:<24} {:<12} {:<12}", "Номер дела", "Дата", "ИНН");
        for record in records {
            println!(
                "{:<24} {:<12} {:<12}",
                record.case_number,
                record.date_iso(),
                record.inn
            );
        }
    }
}
