use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entsoe::calendar::{Resolution, days_in_year, slot_index};
use crate::entsoe::table::{Table, field};
use crate::entsoe::{EntsoeError, parse_period_start};

/// Result of best-effort numeric parsing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f64),
    Missing,
}

impl Reading {
    /// The reading as a grid cell, NaN when missing
    pub fn value(self) -> f64 {
        match self {
            Reading::Value(v) => v,
            Reading::Missing => f64::NAN,
        }
    }
}

/// Parse a numeric cell. Blank cells, `n/e` markers and anything else that
/// is not a number become `Missing`.
pub fn parse_or_missing(raw: &str) -> Reading {
    match raw.trim().parse::<f64>() {
        Ok(v) if !v.is_nan() => Reading::Value(v),
        _ => Reading::Missing,
    }
}

/// What a `(day, slot)` cell holds when no row covers it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnseenCells {
    /// Indistinguishable from a genuine zero reading
    #[default]
    Zero,
    /// Marked missing, so the day is dropped by the row filter
    Missing,
}

impl UnseenCells {
    fn fill(self) -> f64 {
        match self {
            UnseenCells::Zero => 0.0,
            UnseenCells::Missing => f64::NAN,
        }
    }
}

/// Which columns of a table feed a grid, and at what resolution
#[derive(Debug, Clone)]
pub struct GridSpec<'a> {
    pub timestamp_column: &'a str,
    pub value_column: &'a str,
    pub resolution: Resolution,
    pub unseen: UnseenCells,
}

/// Dense `[day, slot]` grid stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    days: usize,
    slots: usize,
    cells: Vec<f64>,
}

impl Grid {
    pub fn filled(days: usize, slots: usize, value: f64) -> Self {
        Self {
            days,
            slots,
            cells: vec![value; days * slots],
        }
    }

    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let slots = rows.first().map_or(0, Vec::len);
        let days = rows.len();
        let cells: Vec<f64> = rows.into_iter().flatten().collect();
        assert_eq!(cells.len(), days * slots, "ragged grid rows");
        Self { days, slots, cells }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.days, self.slots)
    }

    #[cfg(test)]
    pub fn get(&self, day: usize, slot: usize) -> f64 {
        self.cells[day * self.slots + slot]
    }

    pub fn set(&mut self, day: usize, slot: usize, value: f64) {
        self.cells[day * self.slots + slot] = value;
    }

    #[cfg(test)]
    pub fn row(&self, day: usize) -> &[f64] {
        &self.cells[day * self.slots..(day + 1) * self.slots]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.cells.chunks_exact(self.slots.max(1)).take(self.days)
    }

    pub fn column(&self, slot: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows().map(move |row| row[slot])
    }

    #[cfg(test)]
    pub fn has_missing(&self) -> bool {
        self.cells.iter().any(|v| v.is_nan())
    }

    /// Drop every day with at least one missing slot
    pub fn drop_incomplete_days(&self) -> Grid {
        let cells: Vec<f64> = self
            .rows()
            .filter(|row| !row.iter().any(|v| v.is_nan()))
            .flatten()
            .copied()
            .collect();

        Grid {
            days: cells.len() / self.slots.max(1),
            slots: self.slots,
            cells,
        }
    }

    /// Elementwise sum of two grids of the same shape
    pub fn try_add(&self, other: &Grid) -> Result<Grid, EntsoeError> {
        if self.shape() != other.shape() {
            return Err(EntsoeError::ShapeMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }

        Ok(Grid {
            days: self.days,
            slots: self.slots,
            cells: self
                .cells
                .iter()
                .zip(&other.cells)
                .map(|(a, b)| a + b)
                .collect(),
        })
    }
}

/// Place one value column of `table` into a `[day, slot]` grid for `year`.
///
/// Unparsable values become NaN. Rows dated in another year are skipped.
/// A row whose period cannot be parsed, or that falls outside the grid,
/// fails the whole build.
pub fn build_grid(table: &Table, spec: &GridSpec<'_>, year: i32) -> Result<Grid, EntsoeError> {
    let timestamp_idx = table.column(spec.timestamp_column)?;
    let value_idx = table.column(spec.value_column)?;

    let days = days_in_year(year);
    let slots = spec.resolution.slots_per_day();
    let mut grid = Grid::filled(days, slots, spec.unseen.fill());

    let mut missing = 0usize;
    let mut foreign = 0usize;

    for record in table.rows() {
        let period = field(record, timestamp_idx);
        let start = parse_period_start(period)?;

        if start.date.year != year {
            foreign += 1;
            continue;
        }

        let day = start.date.ordinal();
        let slot = slot_index(start.hour, start.minute, spec.resolution);
        if day == 0 || day > days || slot >= slots {
            return Err(EntsoeError::OutOfGrid {
                timestamp: period.to_string(),
                days,
                slots,
            });
        }

        let reading = parse_or_missing(field(record, value_idx));
        if reading == Reading::Missing {
            missing += 1;
        }
        grid.set(day - 1, slot, reading.value());
    }

    if foreign > 0 {
        warn!(
            column = spec.value_column,
            year, foreign, "skipped rows dated outside the grid year"
        );
    }
    debug!(
        column = spec.value_column,
        rows = table.len(),
        missing,
        "built {days}x{slots} grid"
    );

    Ok(grid)
}
