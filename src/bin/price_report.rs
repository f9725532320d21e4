//! Text dashboard: prints the price report for the configured product, or
//! for every product when none is configured.
//!
//! Settings come from the TOML file named by `PRICE_CONFIG` (default
//! `price-report.toml` when present) and `PRICE_*` environment variables.

use std::path::PathBuf;
use std::process::ExitCode;

use produce_price_sdk::{PriceError, ProducePriceSdk, Selection, Settings};

fn settings_path() -> Option<PathBuf> {
    match std::env::var_os("PRICE_CONFIG") {
        Some(p) => Some(PathBuf::from(p)),
        None => {
            let default = PathBuf::from("price-report.toml");
            default.exists().then_some(default)
        }
    }
}

fn print_report(sdk: &ProducePriceSdk, selection: &Selection) -> Result<(), PriceError> {
    match sdk.report(selection) {
        Ok(report) => {
            println!("{}", report);
            Ok(())
        }
        Err(PriceError::EmptyView { category }) => {
            println!("{}: 선택한 조건에 해당하는 데이터가 없습니다", category);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn run() -> Result<(), PriceError> {
    let path = settings_path();
    let settings = Settings::load(path.as_deref())?;
    let report_settings = settings.report.clone();

    log::info!("Loading price records");
    let sdk = settings.into_builder()?.build()?;
    log::info!("{}", sdk);

    let categories = match report_settings.category {
        Some(category) => vec![category],
        None => sdk.records().distinct_categories()?,
    };

    for category in categories {
        let mut selection = Selection::new(category);
        selection.start = report_settings.start;
        selection.end = report_settings.end;
        print_report(&sdk, &selection)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            if e.is_recoverable() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
