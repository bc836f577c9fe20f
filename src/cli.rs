// src/cli.rs
use std::path::PathBuf;

use crate::errors::ScrapeError;
use crate::settings::DEFAULT_CONFIG_FILE;

pub const USAGE: &str = "\
Usage: bookly_export [--config <path>] [--output <path>]

Logs into WordPress, exports Bookly appointments and writes them to a CSV file.

Options:
  -c, --config <path>   JSON config file (default: scraper_config.json)
  -o, --output <path>   output CSV, overrides output_path / WP_OUTPUT_PATH
  -h, --help            show this help

Environment: WP_BASE_URL, WP_USERNAME, WP_PASSWORD, WP_START_DATE, WP_END_DATE,
WP_STATUSES, WP_FILTER_MODE, WP_OUTPUT_PATH, WP_DEBUG_DIR,
WP_REQUEST_TIMEOUT_SECS, WP_MAX_ATTEMPTS, WP_CUSTOM_FIELDS (id:Label,...)
(override the config file).";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: PathBuf,
    /// True when `--config` was given, so a missing file is an error.
    pub config_explicit: bool,
    pub output: Option<PathBuf>,
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            config_explicit: false,
            output: None,
            help: false,
        }
    }
}

/// Parse arguments after the program name.
pub fn parse_args<I, S>(args: I) -> Result<Args, ScrapeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let v = args.next().ok_or_else(|| missing("--config"))?;
                parsed.config = PathBuf::from(v);
                parsed.config_explicit = true;
            }
            "-o" | "--output" => {
                let v = args.next().ok_or_else(|| missing("--output"))?;
                parsed.output = Some(PathBuf::from(v));
            }
            "-h" | "--help" => parsed.help = true,
            other => {
                return Err(ScrapeError::Configuration(format!(
                    "unknown argument '{other}'\n\n{USAGE}"
                )))
            }
        }
    }
    Ok(parsed)
}

fn missing(flag: &str) -> ScrapeError {
    ScrapeError::Configuration(format!("missing value for {flag}"))
}
