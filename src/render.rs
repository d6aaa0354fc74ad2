use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use askama::Template;
use plotly::common::{ErrorData, ErrorType, Mode, Title};
use plotly::layout::{Axis, BarMode};
use plotly::{Bar, Layout, Plot, Scatter};
use serde::Serialize;
use tracing::info;

use crate::config::CategoryKind;
use crate::entsoe::EntsoeError;
use crate::entsoe::analysis::{AggregateSeries, ReservePrices};
use crate::entsoe::calendar::Resolution;

/// Titles and file naming of one chart kind
#[derive(Debug, Clone, Copy)]
pub struct ChartStyle {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub file_prefix: &'static str,
}

pub fn style(kind: CategoryKind) -> ChartStyle {
    match kind {
        CategoryKind::DayAhead => ChartStyle {
            title: "Netherlands Market Day Ahead Prices",
            x_title: "Hour",
            y_title: "Eur/MWh",
            file_prefix: "DayAheadPrices",
        },
        CategoryKind::ReservePrices => ChartStyle {
            title: "Netherlands TSO Prices from Reserving Balancing for Automatic Frequency Restoration Reserve",
            x_title: "Day of year",
            y_title: "Regulation Price [Eur/MW/ISP]",
            file_prefix: "BalancingReservePrices",
        },
        CategoryKind::ActivationPrices => ChartStyle {
            title: "Netherlands TSO Costs for Balancing Activations",
            x_title: "Day Quarter",
            y_title: "Average Eur/MWh",
            file_prefix: "BalancingActivationPrices",
        },
        CategoryKind::Imbalance => ChartStyle {
            title: "TenneT Germany per Quarter Total Imbalance in MWh",
            x_title: "Quarter of day",
            y_title: "Average Total Imbalance [MWh]",
            file_prefix: "Imbalance",
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelledSeries {
    pub label: String,
    pub stats: AggregateSeries,
}

/// N equal-length per-slot series compared on one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonChart {
    pub kind: CategoryKind,
    pub resolution: Resolution,
    pub series: Vec<LabelledSeries>,
}

impl ComparisonChart {
    /// Every series must have exactly one entry per slot of `resolution`
    pub fn new(
        kind: CategoryKind,
        resolution: Resolution,
        series: Vec<LabelledSeries>,
    ) -> Result<Self, EntsoeError> {
        let expected = resolution.slots_per_day();
        if let Some(bad) = series.iter().find(|s| s.stats.len() != expected) {
            return Err(EntsoeError::SeriesLength {
                label: bad.label.clone(),
                expected,
                actual: bad.stats.len(),
            });
        }

        Ok(Self {
            kind,
            resolution,
            series,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReserveChart {
    pub year: i32,
    pub prices: ReservePrices,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Comparison(ComparisonChart),
    ReserveBars(ReserveChart),
}

impl Chart {
    pub fn kind(&self) -> CategoryKind {
        match self {
            Chart::Comparison(chart) => chart.kind,
            Chart::ReserveBars(_) => CategoryKind::ReservePrices,
        }
    }

    pub fn to_plot(&self) -> Plot {
        match self {
            Chart::Comparison(chart) => comparison_plot(chart),
            Chart::ReserveBars(chart) => reserve_plot(chart),
        }
    }
}

fn slot_axis(resolution: Resolution, x_title: &str) -> Axis {
    let axis = Axis::new().title(Title::with_text(x_title)).show_grid(true);
    match resolution {
        Resolution::Hourly => {
            let hours = 0..resolution.slots_per_day();
            axis.tick_values(hours.clone().map(|h| h as f64).collect())
                .tick_text(hours.map(|h| format!("{}-{}", h, h + 1)).collect())
                .tick_angle(45.0)
        }
        Resolution::QuarterHour => axis,
    }
}

fn comparison_plot(chart: &ComparisonChart) -> Plot {
    let style = style(chart.kind);
    let x: Vec<usize> = (0..chart.resolution.slots_per_day()).collect();

    let mut plot = Plot::new();
    for series in &chart.series {
        let trace = Scatter::new(x.clone(), series.stats.mean.clone())
            .name(&series.label)
            .mode(Mode::Markers)
            .error_y(ErrorData::new(ErrorType::Data).array(series.stats.std.clone()));
        plot.add_trace(trace);
    }

    plot.set_layout(
        Layout::new()
            .title(Title::with_text(style.title))
            .x_axis(slot_axis(chart.resolution, style.x_title))
            .y_axis(Axis::new().title(Title::with_text(style.y_title)).show_grid(true)),
    );
    plot
}

fn reserve_plot(chart: &ReserveChart) -> Plot {
    let style = style(CategoryKind::ReservePrices);
    let x: Vec<usize> = (1..=chart.prices.up.len()).collect();

    let mut plot = Plot::new();
    plot.add_trace(Bar::new(x.clone(), chart.prices.up.clone()).name("Direction=Up"));
    plot.add_trace(Bar::new(x, chart.prices.down.clone()).name("Total (Direction=Down+Up)"));

    plot.set_layout(
        Layout::new()
            .title(Title::with_text(style.title))
            .bar_mode(BarMode::Stack)
            .x_axis(Axis::new().title(Title::with_text(format!("Day of {}", chart.year))))
            .y_axis(Axis::new().title(Title::with_text(style.y_title)).show_grid(true)),
    );
    plot
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    chart: &'a str,
    series: &'a str,
    index: usize,
    mean: f64,
    std: Option<f64>,
}

/// Flatten every chart into `(chart, series, index, mean, std)` rows
pub fn write_summary<W: std::io::Write>(charts: &[Chart], out: W) -> Result<(), EntsoeError> {
    let mut writer = csv::Writer::from_writer(out);

    for chart in charts {
        let name = style(chart.kind()).file_prefix;
        match chart {
            Chart::Comparison(cmp) => {
                for series in &cmp.series {
                    for (index, (&mean, &std)) in
                        series.stats.mean.iter().zip(&series.stats.std).enumerate()
                    {
                        writer.serialize(SummaryRow {
                            chart: name,
                            series: &series.label,
                            index,
                            mean,
                            std: Some(std),
                        })?;
                    }
                }
            }
            Chart::ReserveBars(reserve) => {
                for (label, values) in [("Up", &reserve.prices.up), ("Down", &reserve.prices.down)] {
                    for (index, &mean) in values.iter().enumerate() {
                        writer.serialize(SummaryRow {
                            chart: name,
                            series: label,
                            index: index + 1,
                            mean,
                            std: None,
                        })?;
                    }
                }
            }
        }
    }

    writer.flush()?;
    Ok(())
}

struct ReportEntry {
    title: String,
    file: String,
    labels: String,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    generated: String,
    entries: Vec<ReportEntry>,
}

/// Output files of one run
#[derive(Debug, Default)]
pub struct Rendered {
    pub charts: Vec<PathBuf>,
    pub summary: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

/// Write one HTML file per chart, `summary.csv` and an `index.html` report.
/// Chart file names are `<prefix><stamp>.html`.
pub fn write_outputs(charts: &[Chart], output_dir: &Path, stamp: &str) -> Result<Rendered> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut rendered = Rendered::default();
    let mut entries = Vec::with_capacity(charts.len());

    for chart in charts {
        let style = style(chart.kind());
        let plot = chart.to_plot();

        let file = format!("{}{}.html", style.file_prefix, stamp);
        let path = output_dir.join(&file);
        std::fs::write(&path, plot.to_html())
            .with_context(|| format!("writing chart {}", path.display()))?;
        info!(chart = %chart.kind(), path = %path.display(), "wrote chart");

        let labels = match chart {
            Chart::Comparison(cmp) => cmp
                .series
                .iter()
                .map(|s| s.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Chart::ReserveBars(reserve) => reserve.year.to_string(),
        };
        entries.push(ReportEntry {
            title: style.title.to_string(),
            file,
            labels,
        });
        rendered.charts.push(path);
    }

    let summary_path = output_dir.join("summary.csv");
    let summary = std::fs::File::create(&summary_path)
        .with_context(|| format!("creating {}", summary_path.display()))?;
    write_summary(charts, summary).context("writing summary")?;
    rendered.summary = Some(summary_path);

    let report = ReportTemplate {
        generated: stamp.to_string(),
        entries,
    }
    .render()
    .context("rendering report")?;
    let report_path = output_dir.join("index.html");
    std::fs::write(&report_path, report)
        .with_context(|| format!("writing {}", report_path.display()))?;
    rendered.report = Some(report_path);

    Ok(rendered)
}
