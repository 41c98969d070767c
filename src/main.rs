use std::process::ExitCode;

use anyhow::{Context, Result};

use track_eda::config::{DashboardConfig, ReportFormat};
use track_eda::data::loader;
use track_eda::report;
use track_eda::session::Session;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = DashboardConfig::load();
    let options = config.load_options()?;
    let report_config = config.report.clone();

    log::info!("{} starting, dataset {}", track_eda::APP_NAME, config.data_path.display());
    let table = loader::load_with(&config.data_path, options)
        .with_context(|| format!("Failed to load {}", config.data_path.display()))?;

    let session = Session::new(table, config);
    let snapshot = session.run();

    let rendered = match report_config.format {
        ReportFormat::Text => report::render_text(&session, &snapshot, report_config.preview_rows)?,
        ReportFormat::Json => report::render_json(&session, &snapshot, report_config.preview_rows)?,
    };
    println!("{rendered}");
    Ok(())
}
