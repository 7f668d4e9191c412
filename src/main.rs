//! Migration Charts - command line front end
//!
//! Loads the workbook once, renders the requested chart and writes the
//! encoded output to stdout or a file.

use anyhow::{Context, Result};
use clap::Parser;
use migration_charts::data::DEFAULT_SHEET;
use migration_charts::{
    BoundaryOverlay, ChartConfig, ChartSelector, DataLoader, ErrorReport,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "migration-charts")]
#[command(about = "Render Australian migration statistics as charts", long_about = None)]
struct Cli {
    /// timeline, continent, region, topten, Asia, Europe, Africa, America, map, country or histogram
    option: String,
    #[arg(short, long, default_value = "ozimmig.xlsx")]
    data: PathBuf,
    #[arg(short, long, default_value = DEFAULT_SHEET)]
    sheet: String,
    /// GeoJSON country boundaries for the map; skipped when the file is absent
    #[arg(long, default_value = "world.json")]
    overlay: PathBuf,
    /// JSON chart configuration; built-in defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    country1: Option<String>,
    #[arg(long)]
    country2: Option<String>,
    /// Write the encoded chart here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", ErrorReport::from(&err).to_json());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ChartConfig::from_json_file(path)?,
        None => ChartConfig::default(),
    };

    let table = DataLoader::new().with_sheet(&cli.sheet).load(&cli.data)?;

    let overlay = if cli.overlay.is_file() {
        Some(BoundaryOverlay::load(&cli.overlay)?)
    } else {
        warn!("Overlay {} not found, map charts are unavailable", cli.overlay.display());
        None
    };

    let selector = ChartSelector::new(config, overlay);
    let chart = selector.render(
        &cli.option,
        &table,
        cli.country1.as_deref(),
        cli.country2.as_deref(),
    )?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, chart.as_str())
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} chart to {}", cli.option, path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", chart).context("writing chart to stdout")?;
        }
    }

    Ok(())
}
