use std::collections::HashMap;
use std::process::ExitCode;

use tracing::{error, info};

use crate::errors::ScrapeError;
use crate::scraper::ReqwestTransport;

mod cli;
mod domain;
mod errors;
mod logging;
mod pipeline;
mod scraper;
mod settings;
mod spreadsheets;

#[cfg(test)]
mod tests;

fn run() -> Result<(), ScrapeError> {
    let args = cli::parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    // 1️⃣ Settings: config file, then environment on top
    let file = settings::load_config_file(&args.config, args.config_explicit)?;
    let env: HashMap<String, String> = std::env::vars().collect();
    let mut settings = settings::resolve(file.as_ref(), &env)?;
    if let Some(output) = args.output {
        settings.output_path = output;
    }

    // 2️⃣ Login, token, export, merge, write
    let transport = ReqwestTransport::new()?;
    let report = pipeline::run(&settings, Box::new(transport))?;
    info!(
        "{} export request(s), token {}, {} duplicates removed, {} rows skipped, {} filtered out",
        report.windows,
        if report.token_found { "sent" } else { "absent" },
        report.stats.duplicates_removed,
        report.stats.rows_skipped,
        report.stats.filtered_out
    );

    println!(
        "Wrote {} appointments to {} ({} bytes, header v{})",
        report.outcome.rows,
        report.outcome.path.display(),
        report.outcome.bytes,
        report.outcome.header_version
    );
    Ok(())
}

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run aborted at {} stage: {e}", e.stage());
            ExitCode::FAILURE
        }
    }
}
