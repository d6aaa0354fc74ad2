mod config;
mod entsoe;
mod pipeline;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{CategoryKind, RunConfig, area_or};
use crate::entsoe::areas::{self, NETHERLANDS, TENNET_DE};
use crate::entsoe::grid::UnseenCells;

#[derive(Parser)]
#[command(name = "entsoe-grid")]
#[command(about = "Reshape ENTSO-E exports into day/slot grids and plot per-slot statistics", long_about = None)]
struct Cli {
    /// JSON run configuration (see --print-config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Categories to process, repeatable (default: all configured)
    #[arg(short = 'k', long = "category", value_enum)]
    categories: Vec<CategoryKind>,

    /// Directory holding the CSV exports
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Directory charts and the report are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// How grid cells without a row are treated
    #[arg(long, value_enum)]
    unseen_cells: Option<UnseenCells>,

    /// Abort on the first failing category
    #[arg(long, default_value_t = false)]
    fail_fast: bool,

    /// Area (EIC or country code) of the activation price columns
    #[arg(long, conflicts_with = "config")]
    activation_area: Option<String>,

    /// Area (EIC or country code) of the imbalance volume column
    #[arg(long, conflicts_with = "config")]
    imbalance_area: Option<String>,

    /// Print the effective configuration as JSON and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,

    /// List known areas and exit
    #[arg(long, default_value_t = false)]
    list_areas: bool,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = RunConfig::from_file(path)?;
                if !self.categories.is_empty() {
                    config.retain_kinds(&self.categories);
                }
                config
            }
            None => {
                let activation_area = area_or(self.activation_area.as_deref(), NETHERLANDS)?;
                let imbalance_area = area_or(self.imbalance_area.as_deref(), TENNET_DE)?;
                let kinds = if self.categories.is_empty() {
                    CategoryKind::ALL.to_vec()
                } else {
                    self.categories.clone()
                };
                RunConfig::with_presets(&kinds, activation_area, imbalance_area)
            }
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(unseen) = self.unseen_cells {
            config.unseen_cells = unseen;
        }
        config.fail_fast |= self.fail_fast;

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if cli.list_areas {
        for country in areas::list_countries() {
            for zone in areas::BIDDING_ZONES.get(country).into_iter().flatten() {
                println!("{:<18} {:<20} {}", zone.code, zone.column_suffix(), zone);
            }
        }
        return Ok(());
    }

    let config = cli.run_config()?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let stamp = chrono::Local::now().format("%b-%d-%Y_%H%M%S").to_string();
    let summary = pipeline::run(&config, &stamp)?;

    for chart in &summary.rendered.charts {
        info!(path = %chart.display(), "chart");
    }
    if let Some(report) = &summary.rendered.report {
        info!(path = %report.display(), "report");
    }

    if !summary.failed.is_empty() {
        let failed: Vec<String> = summary.failed.iter().map(ToString::to_string).collect();
        error!(categories = %failed.join(", "), "some categories failed");
        std::process::exit(1);
    }

    Ok(())
}
