// src/pipeline.rs
//
// settings -> login -> token -> export windows -> merge -> CSV.
// Any stage error aborts the run before the output file is touched.

use tracing::info;

use crate::domain::merge::ClientFilter;
use crate::domain::{merge, FilterMode, MergeStats};
use crate::errors::ScrapeError;
use crate::scraper::{locate_token, login, plan_windows, ExportFetcher, RetryPolicy, Transport};
use crate::settings::Settings;
use crate::spreadsheets::{write_atomic, WriteOutcome};

#[derive(Debug)]
pub struct RunReport {
    pub windows: usize,
    pub token_found: bool,
    pub stats: MergeStats,
    pub outcome: WriteOutcome,
}

pub fn run(settings: &Settings, transport: Box<dyn Transport>) -> Result<RunReport, ScrapeError> {
    run_with_retry(settings, transport, &RetryPolicy::new(settings.max_attempts))
}

pub fn run_with_retry(
    settings: &Settings,
    transport: Box<dyn Transport>,
    retry: &RetryPolicy,
) -> Result<RunReport, ScrapeError> {
    info!("Starting Bookly appointments export for {}", settings.base_url);

    let session = login(transport, settings, retry)?;
    let token = locate_token(&session, settings.request_timeout)?;

    let windows = plan_windows(settings);
    let fetcher = ExportFetcher::new(
        &session,
        &token,
        retry,
        settings.request_timeout,
        &settings.debug_dir,
        &settings.custom_fields,
    );
    let payloads = fetcher.fetch_all(&windows)?;

    let filter = match settings.filter_mode {
        FilterMode::Client => Some(ClientFilter {
            date_range: settings.date_range,
            statuses: settings.statuses.clone(),
        }),
        FilterMode::Server => None,
    };
    let result = merge(&payloads, filter.as_ref());

    let outcome = write_atomic(&result, &settings.custom_fields, &settings.output_path)?;
    info!("Export completed successfully");

    Ok(RunReport {
        windows: windows.len(),
        token_found: token.is_present(),
        stats: result.stats,
        outcome,
    })
}
