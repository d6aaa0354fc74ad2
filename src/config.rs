use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::entsoe::areas::{self, BiddingZone};
use crate::entsoe::calendar::Resolution;
use crate::entsoe::grid::UnseenCells;

/// Dataset categories the tool knows how to reshape and plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryKind {
    DayAhead,
    ReservePrices,
    ActivationPrices,
    Imbalance,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 4] = [
        CategoryKind::DayAhead,
        CategoryKind::ReservePrices,
        CategoryKind::ActivationPrices,
        CategoryKind::Imbalance,
    ];
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CategoryKind::DayAhead => "day-ahead",
            CategoryKind::ReservePrices => "reserve-prices",
            CategoryKind::ActivationPrices => "activation-prices",
            CategoryKind::Imbalance => "imbalance",
        };
        f.write_str(name)
    }
}

/// One export file and the label it is plotted under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFile {
    pub label: String,
    pub year: i32,
    /// Relative to `RunConfig::data_dir` unless absolute
    pub file: PathBuf,
}

impl InputFile {
    fn yearly(year: i32, file: impl Into<PathBuf>) -> Self {
        Self {
            label: year.to_string(),
            year,
            file: file.into(),
        }
    }
}

/// Several files of the same layout compared slot by slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearComparison {
    pub inputs: Vec<InputFile>,
    pub timestamp_column: String,
    pub value_column: String,
    pub resolution: Resolution,
}

/// Up and down activation prices from a single export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationConfig {
    pub input: InputFile,
    pub timestamp_column: String,
    pub up_column: String,
    pub down_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveConfig {
    pub input: InputFile,
    pub period_column: String,
    pub direction_column: String,
    pub price_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CategoryConfig {
    DayAhead(YearComparison),
    ReservePrices(ReserveConfig),
    ActivationPrices(ActivationConfig),
    Imbalance(YearComparison),
}

impl CategoryConfig {
    pub fn kind(&self) -> CategoryKind {
        match self {
            CategoryConfig::DayAhead(_) => CategoryKind::DayAhead,
            CategoryConfig::ReservePrices(_) => CategoryKind::ReservePrices,
            CategoryConfig::ActivationPrices(_) => CategoryKind::ActivationPrices,
            CategoryConfig::Imbalance(_) => CategoryKind::Imbalance,
        }
    }

    /// Defaults matching the column headers of transparency platform exports
    pub fn preset(kind: CategoryKind, activation_area: &BiddingZone, imbalance_area: &BiddingZone) -> Self {
        match kind {
            CategoryKind::DayAhead => CategoryConfig::DayAhead(YearComparison {
                inputs: (2020..=2022)
                    .map(|year| {
                        InputFile::yearly(
                            year,
                            format!("Day-ahead Prices_{year}01010000-{}01010000.csv", year + 1),
                        )
                    })
                    .collect(),
                timestamp_column: "MTU (CET/CEST)".to_string(),
                value_column: "Day-ahead Price [EUR/MWh]".to_string(),
                resolution: Resolution::Hourly,
            }),
            CategoryKind::ReservePrices => CategoryConfig::ReservePrices(ReserveConfig {
                input: InputFile::yearly(2021, "Prices of Reserved Balancing Reserves 2021.csv"),
                period_column: "Contracted time period".to_string(),
                direction_column: "Direction".to_string(),
                price_column: "Regulation Price [EUR / MW / ISP]".to_string(),
            }),
            CategoryKind::ActivationPrices => {
                let suffix = activation_area.column_suffix();
                CategoryConfig::ActivationPrices(ActivationConfig {
                    input: InputFile::yearly(
                        2021,
                        "Prices of Activated Balancing Energy_202101010000-202201010000.csv",
                    ),
                    timestamp_column: "ISP (UTC)".to_string(),
                    up_column: format!("Not specified Up Price [EUR/MWh] - {suffix}"),
                    down_column: format!("Not specified Down Price [EUR/MWh] - {suffix}"),
                })
            }
            CategoryKind::Imbalance => CategoryConfig::Imbalance(YearComparison {
                inputs: (2020..=2022)
                    .map(|year| {
                        InputFile::yearly(
                            year,
                            format!("Imbalance_{year}01010000-{}01010000.csv", year + 1),
                        )
                    })
                    .collect(),
                timestamp_column: "Imbalance settlement period CET/CEST".to_string(),
                value_column: format!(
                    "Total Imbalance [MWh] - {}",
                    imbalance_area.column_suffix()
                ),
                resolution: Resolution::QuarterHour,
            }),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("CSVfiles")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("plots")
}

/// Everything a run needs: which categories to process and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Abort on the first failing category instead of moving on
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub unseen_cells: UnseenCells,
    pub categories: Vec<CategoryConfig>,
}

impl RunConfig {
    pub fn with_presets(
        kinds: &[CategoryKind],
        activation_area: &BiddingZone,
        imbalance_area: &BiddingZone,
    ) -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            fail_fast: false,
            unseen_cells: UnseenCells::default(),
            categories: kinds
                .iter()
                .map(|&kind| CategoryConfig::preset(kind, activation_area, imbalance_area))
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json).context("parsing run configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in config {}", path.display()))
    }

    /// Keep only the categories of the given kinds
    pub fn retain_kinds(&mut self, kinds: &[CategoryKind]) {
        self.categories.retain(|category| kinds.contains(&category.kind()));
    }

    pub fn validate(&self) -> Result<()> {
        for category in &self.categories {
            if let CategoryConfig::DayAhead(cmp) | CategoryConfig::Imbalance(cmp) = category {
                if cmp.inputs.is_empty() {
                    bail!("category {} has no inputs", category.kind());
                }
            }
        }
        Ok(())
    }

    pub fn resolve_input(&self, input: &InputFile) -> PathBuf {
        self.data_dir.join(&input.file)
    }
}

/// Resolve an area argument, falling back to `default` when not given
pub fn area_or(key: Option<&str>, default: &str) -> Result<&'static BiddingZone> {
    let key = key.unwrap_or(default);
    match areas::resolve(key) {
        Some(zone) => Ok(zone),
        None => bail!(
            "unknown area {key}, expected an EIC code or one of {}",
            areas::list_countries().join(", ")
        ),
    }
}
