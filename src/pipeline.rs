use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use crate::config::{ActivationConfig, CategoryConfig, CategoryKind, InputFile, ReserveConfig, RunConfig, YearComparison};
use crate::entsoe::EntsoeError;
use crate::entsoe::analysis::{Axis, ReserveSpec, aggregate, split_reserve_directions};
use crate::entsoe::calendar::Resolution;
use crate::entsoe::grid::{Grid, GridSpec, UnseenCells, build_grid};
use crate::entsoe::table::Table;
use crate::render::{self, Chart, ComparisonChart, LabelledSeries, Rendered, ReserveChart};

/// Filter a grid down to complete days and aggregate it per slot
pub fn slot_series(label: &str, grid: &Grid) -> LabelledSeries {
    let filtered = grid.drop_incomplete_days();
    let dropped = grid.days() - filtered.days();
    if dropped > 0 {
        info!(label, dropped, kept = filtered.days(), "dropped incomplete days");
    }
    if filtered.days() == 0 {
        warn!(label, "no complete days left, statistics will be NaN");
    } else {
        let daily = aggregate(&filtered, Axis::PerDay);
        let (low, high) = daily
            .mean
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| (lo.min(m), hi.max(m)));
        debug!(label, low, high, "range of daily means");
    }

    LabelledSeries {
        label: label.to_string(),
        stats: aggregate(&filtered, Axis::PerSlot),
    }
}

fn load(config: &RunConfig, input: &InputFile) -> Result<Table> {
    let path = config.resolve_input(input);
    Table::from_path(&path).with_context(|| format!("loading {}", path.display()))
}

/// Compare one value column across several yearly tables
pub fn compare_years<'a>(
    kind: CategoryKind,
    cmp: &YearComparison,
    unseen: UnseenCells,
    tables: impl IntoIterator<Item = (&'a InputFile, Table)>,
) -> Result<ComparisonChart, EntsoeError> {
    let spec = GridSpec {
        timestamp_column: &cmp.timestamp_column,
        value_column: &cmp.value_column,
        resolution: cmp.resolution,
        unseen,
    };

    let mut series = Vec::new();
    for (input, table) in tables {
        let grid = build_grid(&table, &spec, input.year)?;
        series.push(slot_series(&input.label, &grid));
    }

    ComparisonChart::new(kind, cmp.resolution, series)
}

/// Up, down and total activation prices of one export
pub fn compare_directions(
    activation: &ActivationConfig,
    unseen: UnseenCells,
    table: &Table,
) -> Result<ComparisonChart, EntsoeError> {
    let year = activation.input.year;
    let up_spec = GridSpec {
        timestamp_column: &activation.timestamp_column,
        value_column: &activation.up_column,
        resolution: Resolution::QuarterHour,
        unseen,
    };
    let down_spec = GridSpec {
        value_column: &activation.down_column,
        ..up_spec.clone()
    };

    let up = build_grid(table, &up_spec, year)?;
    let down = build_grid(table, &down_spec, year)?;
    let total = up.try_add(&down)?;

    ComparisonChart::new(
        CategoryKind::ActivationPrices,
        Resolution::QuarterHour,
        vec![
            slot_series("Direction: Up", &up),
            slot_series("Direction: Down", &down),
            slot_series("Total", &total),
        ],
    )
}

pub fn reserve_chart(reserve: &ReserveConfig, table: &Table) -> Result<ReserveChart, EntsoeError> {
    let spec = ReserveSpec {
        period_column: &reserve.period_column,
        direction_column: &reserve.direction_column,
        price_column: &reserve.price_column,
    };

    Ok(ReserveChart {
        year: reserve.input.year,
        prices: split_reserve_directions(table, &spec, reserve.input.year)?,
    })
}

/// Load, reshape and aggregate every input of one category
pub fn analyse_category(config: &RunConfig, category: &CategoryConfig) -> Result<Chart> {
    let chart = match category {
        CategoryConfig::DayAhead(cmp) | CategoryConfig::Imbalance(cmp) => {
            let tables = cmp
                .inputs
                .iter()
                .map(|input| load(config, input).map(|table| (input, table)))
                .collect::<Result<Vec<_>>>()?;
            Chart::Comparison(compare_years(category.kind(), cmp, config.unseen_cells, tables)?)
        }
        CategoryConfig::ActivationPrices(activation) => {
            let table = load(config, &activation.input)?;
            Chart::Comparison(compare_directions(activation, config.unseen_cells, &table)?)
        }
        CategoryConfig::ReservePrices(reserve) => {
            let table = load(config, &reserve.input)?;
            Chart::ReserveBars(reserve_chart(reserve, &table)?)
        }
    };
    Ok(chart)
}

#[derive(Debug)]
pub struct RunSummary {
    pub rendered: Rendered,
    pub failed: Vec<CategoryKind>,
}

/// Run every configured category, then render what succeeded.
///
/// With `fail_fast` the first failing category aborts the run; otherwise
/// the failure is logged and reported in the summary.
pub fn run(config: &RunConfig, stamp: &str) -> Result<RunSummary> {
    let mut charts = Vec::with_capacity(config.categories.len());
    let mut failed = Vec::new();

    for category in &config.categories {
        let kind = category.kind();
        info!(category = %kind, "processing");

        match analyse_category(config, category) {
            Ok(chart) => charts.push(chart),
            Err(e) if config.fail_fast => {
                return Err(e.context(format!("category {kind} failed")));
            }
            Err(e) => {
                error!(category = %kind, "{e:#}");
                failed.push(kind);
            }
        }
    }

    if charts.is_empty() && !config.categories.is_empty() {
        bail!("every category failed, nothing to render");
    }

    let rendered = render::write_outputs(&charts, &config.output_dir, stamp)?;
    Ok(RunSummary { rendered, failed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entsoe::calendar::days_in_year;
    use std::fmt::Write;
    use std::path::PathBuf;

    const PERIOD: &str = "Imbalance settlement period CET/CEST";
    const VOLUME: &str = "Total Imbalance [MWh]";

    /// One row per quarter hour of `year`, each slot holding `base + slot`
    fn quarter_hour_export(year: i32, base: f64) -> Table {
        let mut csv = format!("\"{PERIOD}\",\"{VOLUME}\"\n");
        let mut date = chrono::NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        for _ in 0..days_in_year(year) {
            let day = date.format("%d.%m.%Y");
            for slot in 0..96 {
                let (hour, minute) = (slot / 4, (slot % 4) * 15);
                writeln!(
                    csv,
                    "\"{day} {hour:02}:{minute:02} - {day} {hour:02}:{:02}\",\"{}\"",
                    minute + 14,
                    base + slot as f64
                )
                .unwrap();
            }
            date = date.succ_opt().unwrap();
        }
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn imbalance(years: &[i32]) -> YearComparison {
        YearComparison {
            inputs: years
                .iter()
                .map(|&year| InputFile {
                    label: year.to_string(),
                    year,
                    file: PathBuf::from(format!("Imbalance_{year}.csv")),
                })
                .collect(),
            timestamp_column: PERIOD.to_string(),
            value_column: VOLUME.to_string(),
            resolution: Resolution::QuarterHour,
        }
    }

    #[test]
    fn test_three_years_of_constant_slots() {
        let cmp = imbalance(&[2020, 2021, 2022]);
        let bases = [10.0, -20.0, 300.0];
        let tables = cmp
            .inputs
            .iter()
            .zip(bases)
            .map(|(input, base)| (input, quarter_hour_export(input.year, base)));

        let chart = compare_years(CategoryKind::Imbalance, &cmp, UnseenCells::Zero, tables).unwrap();

        assert_eq!(chart.series.len(), 3);
        for (series, base) in chart.series.iter().zip(bases) {
            assert_eq!(series.stats.len(), 96);
            for slot in 0..96 {
                assert_eq!(series.stats.mean[slot], base + slot as f64);
                assert_eq!(series.stats.std[slot], 0.0);
            }
        }
        let labels: Vec<_> = chart.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["2020", "2021", "2022"]);
    }

    #[test]
    fn test_unparsable_reading_drops_that_day() {
        let cmp = imbalance(&[2021]);
        let mut csv = format!("\"{PERIOD}\",\"{VOLUME}\"\n");
        for day in 1..=3 {
            for hour in 0..24 {
                for quarter in 0..4 {
                    let value = if day == 2 && hour == 5 && quarter == 0 {
                        "n/e".to_string()
                    } else {
                        day.to_string()
                    };
                    writeln!(
                        csv,
                        "\"0{day}.01.2021 {hour:02}:{:02} - 0{day}.01.2021 {hour:02}:{:02}\",\"{value}\"",
                        quarter * 15,
                        quarter * 15 + 14,
                    )
                    .unwrap();
                }
            }
        }
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        let grid = build_grid(
            &table,
            &GridSpec {
                timestamp_column: PERIOD,
                value_column: VOLUME,
                resolution: Resolution::QuarterHour,
                unseen: UnseenCells::Missing,
            },
            2021,
        )
        .unwrap();

        let series = slot_series("2021", &grid);
        // days 1 and 3 survive, the rest of the year is unseen
        assert_eq!(series.stats.mean[0], 2.0);
        assert_eq!(series.stats.std[0], 1.0);

        let chart = compare_years(
            CategoryKind::Imbalance,
            &cmp,
            UnseenCells::Zero,
            [(&cmp.inputs[0], table)],
        )
        .unwrap();
        assert_eq!(chart.series[0].stats.len(), 96);
    }

    #[test]
    fn test_compare_directions() {
        let activation = ActivationConfig {
            input: InputFile {
                label: "2021".to_string(),
                year: 2021,
                file: PathBuf::from("activation.csv"),
            },
            timestamp_column: "ISP (UTC)".to_string(),
            up_column: "Up".to_string(),
            down_column: "Down".to_string(),
        };

        let mut csv = String::from("ISP (UTC),Up,Down\n");
        let mut date = chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        for _ in 0..365 {
            let day = date.format("%d.%m.%Y");
            for slot in 0..96 {
                writeln!(
                    csv,
                    "{day} {:02}:{:02} - {day} {:02}:{:02},4,-1",
                    slot / 4,
                    (slot % 4) * 15,
                    slot / 4,
                    (slot % 4) * 15 + 14
                )
                .unwrap();
            }
            date = date.succ_opt().unwrap();
        }
        let table = Table::from_reader(csv.as_bytes()).unwrap();

        let chart = compare_directions(&activation, UnseenCells::Zero, &table).unwrap();
        let means: Vec<f64> = chart.series.iter().map(|s| s.stats.mean[17]).collect();
        assert_eq!(means, [4.0, -1.0, 3.0]);
        assert_eq!(chart.series[2].label, "Total");
    }

    #[test]
    fn test_missing_file_fails_category() {
        let config = RunConfig {
            data_dir: PathBuf::from("/nonexistent/entsoe-grid"),
            output_dir: PathBuf::from("/nonexistent/entsoe-grid/plots"),
            fail_fast: true,
            unseen_cells: UnseenCells::Zero,
            categories: vec![CategoryConfig::Imbalance(imbalance(&[2021]))],
        };
        let err = run(&config, "test").unwrap_err();
        assert!(format!("{err:#}").contains("category imbalance failed"));

        let lenient = RunConfig {
            fail_fast: false,
            ..config
        };
        assert!(run(&lenient, "test").is_err());
    }

    #[test]
    fn test_failed_category_does_not_block_others() {
        let root = std::env::temp_dir().join(format!("entsoe-grid-run-{}", std::process::id()));
        let data_dir = root.join("data");
        std::fs::create_dir_all(&data_dir).unwrap();

        let mut csv = String::from("\"MTU (CET/CEST)\",\"Day-ahead Price [EUR/MWh]\"\n");
        for hour in 0..24 {
            writeln!(
                csv,
                "\"01.01.2021 {hour:02}:00 - 01.01.2021 {:02}:00\",\"{}\"",
                (hour + 1) % 24,
                40 + hour
            )
            .unwrap();
        }
        std::fs::write(data_dir.join("day_ahead_2021.csv"), csv).unwrap();

        let day_ahead = YearComparison {
            inputs: vec![InputFile {
                label: "2021".to_string(),
                year: 2021,
                file: PathBuf::from("day_ahead_2021.csv"),
            }],
            timestamp_column: "MTU (CET/CEST)".to_string(),
            value_column: "Day-ahead Price [EUR/MWh]".to_string(),
            resolution: Resolution::Hourly,
        };
        let config = RunConfig {
            data_dir,
            output_dir: root.join("plots"),
            fail_fast: false,
            unseen_cells: UnseenCells::Zero,
            categories: vec![
                CategoryConfig::DayAhead(day_ahead),
                CategoryConfig::Imbalance(imbalance(&[2021])),
            ],
        };

        let summary = run(&config, "test").unwrap();
        assert_eq!(summary.failed, [CategoryKind::Imbalance]);
        assert_eq!(summary.rendered.charts.len(), 1);
        assert!(config.output_dir.join("summary.csv").exists());
        assert!(config.output_dir.join("index.html").exists());

        std::fs::remove_dir_all(&root).unwrap();
    }
}
