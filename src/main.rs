mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use eframe::egui;

use app::RealtyLensApp;
use realty_lens::config::Settings;
use state::AppState;

/// Interactive property and plot dashboards.
#[derive(Parser, Debug)]
#[command(name = "realty-lens", version, about)]
struct Cli {
    /// Property listings file (CSV, Parquet or JSON)
    #[arg(long, env = "REALTY_LENS_PROPERTY")]
    property: Option<PathBuf>,

    /// Plot listings file (CSV, Parquet or JSON)
    #[arg(long, env = "REALTY_LENS_PLOT")]
    plot: Option<PathBuf>,

    /// TOML settings file
    #[arg(short, long, env = "REALTY_LENS_CONFIG")]
    config: Option<PathBuf>,

    /// Dashboard shown at start-up
    #[arg(short, long, default_value = "property")]
    dashboard: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(path) = cli.property {
        settings.set_source("property", path)?;
    }
    if let Some(path) = cli.plot {
        settings.set_source("plot", path)?;
    }
    let active = match settings.position(&cli.dashboard) {
        Some(i) => i,
        None => {
            log::warn!("Unknown dashboard '{}', showing the first one", cli.dashboard);
            0
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    let state = AppState::new(settings, active);
    eframe::run_native(
        "Realty Lens – Property & Plot Dashboards",
        options,
        Box::new(|_cc| Ok(Box::new(RealtyLensApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to start the UI: {e}"))
}
