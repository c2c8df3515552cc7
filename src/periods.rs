//! Billing periods.
//!
//! Every financial total is computed over a list of calendar quarters. The
//! list is derived from a building's financial start date and a named range
//! selector, and the quarter labels (`"Q1 2024"`) are the keys payments are
//! filed under.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::DomainError;

/// A calendar quarter. Ordering follows time: year first, then number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    year: i32,
    number: u8,
}

impl Quarter {
    pub fn new(year: i32, number: u8) -> Result<Self, DomainError> {
        if !(1..=4).contains(&number) {
            return Err(DomainError::InvalidQuarter(format!("Q{number} {year}")));
        }
        Ok(Quarter { year, number })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Quarter {
            year: date.year(),
            number: ((date.month0() / 3) + 1) as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    fn first_month(&self) -> u32 {
        (self.number as u32 - 1) * 3 + 1
    }

    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.first_month(), 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn end_date(&self) -> NaiveDate {
        self.next()
            .start_date()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn next(&self) -> Self {
        if self.number == 4 {
            Quarter {
                year: self.year + 1,
                number: 1,
            }
        } else {
            Quarter {
                year: self.year,
                number: self.number + 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Quarter::containing(date) == *self
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.number, self.year)
    }
}

/// `Some(s)` when `s` is non-empty plain ASCII digits (no sign).
fn digits(s: &str) -> Option<&str> {
    (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then_some(s)
}

impl FromStr for Quarter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidQuarter(s.to_string());
        let mut parts = s.split_whitespace();
        let (Some(q), Some(year), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let number = q
            .strip_prefix('Q')
            .or_else(|| q.strip_prefix('q'))
            .and_then(digits)
            .and_then(|n| n.parse::<u8>().ok())
            .ok_or_else(invalid)?;
        let year = digits(year)
            .filter(|y| y.len() == 4)
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        Quarter::new(year, number).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Quarter {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quarter> for String {
    fn from(q: Quarter) -> Self {
        q.to_string()
    }
}

/// Named window a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelector {
    CurrentQuarter,
    YearToDate,
    Year(i32),
    AllSinceStart,
}

impl RangeSelector {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        match value.to_lowercase().as_str() {
            "current_quarter" => Ok(RangeSelector::CurrentQuarter),
            "year_to_date" | "ytd" => Ok(RangeSelector::YearToDate),
            "all" | "all_time" => Ok(RangeSelector::AllSinceStart),
            other => other
                .strip_prefix("year_")
                .and_then(digits)
                .filter(|y| y.len() == 4)
                .and_then(|y| y.parse::<i32>().ok())
                .map(RangeSelector::Year)
                .ok_or_else(|| DomainError::InvalidRange(value.to_string())),
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            RangeSelector::CurrentQuarter => "current_quarter".into(),
            RangeSelector::YearToDate => "year_to_date".into(),
            RangeSelector::Year(y) => format!("year_{y}"),
            RangeSelector::AllSinceStart => "all".into(),
        }
    }

    /// Inclusive date window before clamping to the financial start.
    fn window(&self, financial_start: NaiveDate, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            RangeSelector::CurrentQuarter => {
                let q = Quarter::containing(today);
                (q.start_date(), q.end_date())
            }
            RangeSelector::YearToDate => (jan_first(today.year()), today),
            RangeSelector::Year(y) => (jan_first(*y), dec_last(*y)),
            RangeSelector::AllSinceStart => (financial_start, today),
        }
    }
}

impl Default for RangeSelector {
    fn default() -> Self {
        RangeSelector::YearToDate
    }
}

impl FromStr for RangeSelector {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RangeSelector::parse(s)
    }
}

fn jan_first(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn dec_last(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Ordered quarters covered by `selector`, never reaching before `financial_start`.
///
/// A window that ends before the financial start yields no quarters. A
/// partially covered last quarter is included.
pub fn quarters_in_range(
    financial_start: NaiveDate,
    selector: RangeSelector,
    today: NaiveDate,
) -> Vec<Quarter> {
    let (window_start, window_end) = selector.window(financial_start, today);
    let start = window_start.max(financial_start);
    if start > window_end {
        return Vec::new();
    }

    let last = Quarter::containing(window_end);
    let mut current = Quarter::containing(start);
    let mut quarters = Vec::new();
    while current <= last {
        quarters.push(current);
        current = current.next();
    }
    quarters
}

pub fn quarter_labels(quarters: &[Quarter]) -> Vec<String> {
    quarters.iter().map(Quarter::label).collect()
}
