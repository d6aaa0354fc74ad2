use tracing::{debug, warn};

use crate::entsoe::calendar::days_in_year;
use crate::entsoe::grid::{Grid, parse_or_missing};
use crate::entsoe::table::{Table, field};
use crate::entsoe::{EntsoeError, parse_period_date};

/// Direction of reduction when aggregating a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// One value per slot, reduced over days
    PerSlot,
    /// One value per day, reduced over slots
    PerDay,
}

/// Mean and population standard deviation per slot (or per day)
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSeries {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl AggregateSeries {
    pub fn len(&self) -> usize {
        self.mean.len()
    }
}

/// Population mean and standard deviation (divides by N). NaN when empty.
fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn aggregate(grid: &Grid, axis: Axis) -> AggregateSeries {
    let stats: Vec<(f64, f64)> = match axis {
        Axis::PerSlot => (0..grid.slots())
            .map(|slot| mean_std(grid.column(slot)))
            .collect(),
        Axis::PerDay => grid
            .rows()
            .map(|row| mean_std(row.iter().copied()))
            .collect(),
    };

    let (mean, std) = stats.into_iter().unzip();
    AggregateSeries { mean, std }
}

/// Columns of a reserved-balancing-reserve export
#[derive(Debug, Clone)]
pub struct ReserveSpec<'a> {
    pub period_column: &'a str,
    pub direction_column: &'a str,
    pub price_column: &'a str,
}

/// Per-day procured reserve prices, indexed by day of year - 1
#[derive(Debug, Clone, PartialEq)]
pub struct ReservePrices {
    pub up: Vec<f64>,
    pub down: Vec<f64>,
}

/// Split a reserve price export into per-day up and down series.
///
/// Rows with a direction other than `Up` or `Down` are logged and skipped.
/// Days without a row stay at zero.
pub fn split_reserve_directions(
    table: &Table,
    spec: &ReserveSpec<'_>,
    year: i32,
) -> Result<ReservePrices, EntsoeError> {
    let period_idx = table.column(spec.period_column)?;
    let direction_idx = table.column(spec.direction_column)?;
    let price_idx = table.column(spec.price_column)?;

    let days = days_in_year(year);
    let mut prices = ReservePrices {
        up: vec![0.0; days],
        down: vec![0.0; days],
    };

    for record in table.rows() {
        let period = field(record, period_idx);
        let date = parse_period_date(period)?;
        if date.year != year {
            debug!(period, year, "skipping reserve row outside year");
            continue;
        }

        let day = date.ordinal();
        if day == 0 || day > days {
            return Err(EntsoeError::OutOfGrid {
                timestamp: period.to_string(),
                days,
                slots: 1,
            });
        }

        let series = match field(record, direction_idx) {
            "Up" => &mut prices.up,
            "Down" => &mut prices.down,
            other => {
                warn!(period, direction = other, "unexpected reserve direction, skipping row");
                continue;
            }
        };
        series[day - 1] = parse_or_missing(field(record, price_idx)).value();
    }

    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_columns() {
        let grid = Grid::from_rows(vec![vec![4.0, -2.0, 0.5]; 10]);
        let series = aggregate(&grid, Axis::PerSlot);

        assert_eq!(series.mean, vec![4.0, -2.0, 0.5]);
        assert_eq!(series.std, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_population_std() {
        let grid = Grid::from_rows(vec![vec![2.0], vec![4.0], vec![4.0], vec![4.0], vec![5.0], vec![5.0], vec![7.0], vec![9.0]]);
        let series = aggregate(&grid, Axis::PerSlot);

        assert_eq!(series.mean, vec![5.0]);
        assert_eq!(series.std, vec![2.0]);
    }

    #[test]
    fn test_per_day_axis() {
        let grid = Grid::from_rows(vec![vec![1.0, 3.0], vec![2.0, 2.0]]);
        let series = aggregate(&grid, Axis::PerDay);

        assert_eq!(series.len(), 2);
        assert_eq!(series.mean, vec![2.0, 2.0]);
        assert_eq!(series.std, vec![1.0, 0.0]);
    }

    #[test]
    fn test_filter_then_aggregate() {
        let grid = Grid::from_rows(vec![vec![1.0, 1.0], vec![f64::NAN, 100.0], vec![3.0, 3.0]]);
        let filtered = grid.drop_incomplete_days();
        assert_eq!(filtered.days(), grid.days() - 1);

        let series = aggregate(&filtered, Axis::PerSlot);
        assert_eq!(series.mean, vec![2.0, 2.0]);
        assert_eq!(series.std, vec![1.0, 1.0]);
    }

    #[test]
    fn test_empty_grid_aggregates_to_nan() {
        let grid = Grid::filled(0, 4, 0.0);
        let series = aggregate(&grid, Axis::PerSlot);
        assert_eq!(series.len(), 4);
        assert!(series.mean.iter().all(|v| v.is_nan()));
    }

    fn reserve_table(rows: &[(&str, &str, &str)]) -> Table {
        let mut csv = String::from("Contracted time period,Direction,Regulation Price [EUR / MW / ISP]\n");
        for (period, direction, price) in rows {
            csv.push_str(&format!("{period},{direction},{price}\n"));
        }
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    const RESERVE: ReserveSpec<'static> = ReserveSpec {
        period_column: "Contracted time period",
        direction_column: "Direction",
        price_column: "Regulation Price [EUR / MW / ISP]",
    };

    #[test]
    fn test_split_reserve_directions() {
        let table = reserve_table(&[
            ("01.01.2021 00:00 - 02.01.2021 00:00", "Up", "12.5"),
            ("01.01.2021 00:00 - 02.01.2021 00:00", "Down", "8"),
            ("02.01.2021 00:00 - 03.01.2021 00:00", "Sideways", "99"),
            ("03.01.2021 00:00 - 04.01.2021 00:00", "Up", "n/e"),
        ]);
        let prices = split_reserve_directions(&table, &RESERVE, 2021).unwrap();

        assert_eq!(prices.up.len(), 365);
        assert_eq!(prices.up[0], 12.5);
        assert_eq!(prices.down[0], 8.0);
        assert_eq!(prices.up[1], 0.0);
        assert_eq!(prices.down[1], 0.0);
        assert!(prices.up[2].is_nan());
    }

    #[test]
    fn test_reserve_bad_period_is_fatal() {
        let table = reserve_table(&[("soon", "Up", "1")]);
        assert!(split_reserve_directions(&table, &RESERVE, 2021).is_err());
    }
}
