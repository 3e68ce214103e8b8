use chrono::{Days, Months, NaiveDate};

use crate::errors::{Error, Result};
#[cfg(feature = "serde")]
use crate::frame::PriceBar;

/// An inclusive calendar date range.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Builds a range; start and end are swapped if given backwards.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Returns the first date of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Returns the last date of the range.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true when `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Iterates every calendar date of the range, weekends and holidays
    /// included.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(move |d| *d <= end)
    }
}

/// Parses a period expression into a [`DateRange`] ending today.
///
/// Accepts an explicit `start:end` pair of `%Y-%m-%d` dates, or a lookback
/// suffix form: `30d`, `6mo`, `2y`.
pub fn parse_period(input: &str, today: NaiveDate) -> Result<DateRange> {
    if let Some((start, end)) = input.split_once(':') {
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
            .map_err(|_| Error::InvalidPeriod(input.to_string()))?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
            .map_err(|_| Error::InvalidPeriod(input.to_string()))?;
        return Ok(DateRange::new(start, end));
    }

    let (digits, unit) = match input.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) if pos > 0 => input.split_at(pos),
        _ => return Err(Error::InvalidPeriod(input.to_string())),
    };
    let count: u32 = digits
        .parse()
        .map_err(|_| Error::InvalidPeriod(input.to_string()))?;
    let start = match unit {
        "d" => today.checked_sub_days(Days::new(count as u64)),
        "mo" => today.checked_sub_months(Months::new(count)),
        "y" => today.checked_sub_months(Months::new(count * 12)),
        _ => return Err(Error::InvalidPeriod(input.to_string())),
    }
    .ok_or_else(|| Error::InvalidPeriod(input.to_string()))?;
    Ok(DateRange::new(start, today))
}

#[cfg(feature = "serde")]
/// Reads daily bars from a JSON file: an array of objects with a `date`
/// field and numeric OHLCV fields.
pub fn bars_from_file(filepath: std::path::PathBuf) -> Result<Vec<PriceBar>> {
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Generates a random ID.
pub fn random_id() -> u32 {
    rand::random()
}
