use serde::{Deserialize, Serialize};

use crate::entsoe::EntsoeError;

const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Intraday resolution of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    Hourly,
    QuarterHour,
}

impl Resolution {
    pub fn slots_per_day(self) -> usize {
        match self {
            Resolution::Hourly => 24,
            Resolution::QuarterHour => 96,
        }
    }
}

/// Leap years are every fourth year, without the centurial exception.
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0
}

pub fn days_in_year(year: i32) -> usize {
    if is_leap_year(year) { 366 } else { 365 }
}

/// A parsed `DD.MM.YYYY` date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl CalendarDate {
    pub fn parse(date_str: &str) -> Result<Self, EntsoeError> {
        let invalid = || EntsoeError::InvalidDate(date_str.to_string());

        let mut parts = date_str.trim().split('.');
        let (Some(day), Some(month), Some(year), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;

        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self { day, month, year })
    }

    /// 1-based day of year. The day itself is not range checked, so the
    /// sum is done in `usize` to keep oversized days from wrapping.
    pub fn ordinal(&self) -> usize {
        let mut lengths = MONTH_LENGTHS;
        if is_leap_year(self.year) {
            lengths[1] = 29;
        }
        let preceding: u32 = lengths[..(self.month - 1) as usize].iter().sum();
        self.day as usize + preceding as usize
    }
}

/// Map a `DD.MM.YYYY` date to its 1-based day of year
#[cfg(test)]
pub fn day_of_year(date_str: &str) -> Result<usize, EntsoeError> {
    CalendarDate::parse(date_str).map(|date| date.ordinal())
}

/// Bucket a minute of the hour into one of four quarters
fn quarter_bucket(minute: u32) -> u32 {
    if minute < 10 {
        0
    } else if minute < 20 {
        1
    } else if minute < 40 {
        2
    } else {
        3
    }
}

/// Map an hour/minute pair onto the slot axis of a grid
pub fn slot_index(hour: u32, minute: u32, resolution: Resolution) -> usize {
    match resolution {
        Resolution::Hourly => hour as usize,
        Resolution::QuarterHour => hour as usize * 4 + quarter_bucket(minute) as usize,
    }
}
