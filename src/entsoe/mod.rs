pub(crate) mod analysis;
pub(crate) mod areas;
pub(crate) mod calendar;
pub(crate) mod grid;
pub(crate) mod table;

use thiserror::Error;

use crate::entsoe::calendar::CalendarDate;

#[derive(Error, Debug)]
pub enum EntsoeError {
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing column: {0}")]
    MissingColumn(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Row {timestamp} does not fit a grid of {days} days x {slots} slots")]
    OutOfGrid {
        timestamp: String,
        days: usize,
        slots: usize,
    },
    #[error("Series {label} has {actual} entries, expected {expected}")]
    SeriesLength {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("Grid shapes differ: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
}

/// Start of a delivery period, e.g. the `01.01.2021 00:15` in
/// `01.01.2021 00:15 - 01.01.2021 00:30`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodStart {
    pub date: CalendarDate,
    pub hour: u32,
    pub minute: u32,
}

/// Parse the start of a `"<start> - <end>"` period column.
/// Trailing zone markers such as `(CET)` after the time are ignored.
pub fn parse_period_start(period: &str) -> Result<PeriodStart, EntsoeError> {
    let invalid = || EntsoeError::InvalidTimestamp(period.to_string());

    let start = period
        .split_once(" - ")
        .map_or(period, |(start, _)| start)
        .trim();

    let mut tokens = start.split_whitespace();
    let date = tokens.next().ok_or_else(invalid)?;
    let time = tokens.next().ok_or_else(invalid)?;

    let (hour, minute) = time.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute
        .get(..2)
        .unwrap_or(minute)
        .parse()
        .map_err(|_| invalid())?;

    if minute >= 60 {
        return Err(invalid());
    }

    Ok(PeriodStart {
        date: CalendarDate::parse(date)?,
        hour,
        minute,
    })
}

/// Parse the date at the start of a period column, ignoring any time of day
pub fn parse_period_date(period: &str) -> Result<CalendarDate, EntsoeError> {
    let date = period
        .split_whitespace()
        .next()
        .ok_or_else(|| EntsoeError::InvalidTimestamp(period.to_string()))?;
    CalendarDate::parse(date)
}
