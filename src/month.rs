//! Month tab names
//!
//! Monthly tabs are named with a 3-letter month and a 2-digit year ("Apr 25").
//! Input tags are normalized to that form before any sheet lookup.

use crate::error::{WipError, WipResult};
use chrono::{Datelike, Month, NaiveDate};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A month and two-digit year, displayed as "Apr 25"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthTag {
    pub month: Month,
    pub year: u32,
}

impl MonthTag {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = Month::try_from(date.month() as u8).unwrap_or(Month::January);
        Self {
            month,
            year: date.year().rem_euclid(100) as u32,
        }
    }

    /// Parse "April 2025", "Apr 25", "apr-25", "2025-04" or "04/2025"
    pub fn parse(input: &str) -> WipResult<Self> {
        let tag = input.trim();
        let invalid = || WipError::InvalidMonth(input.to_string());

        let [named, year_first, month_first] = month_patterns()?;

        let (month, year) = if let Some(caps) = named.captures(tag) {
            let month = Month::from_str(&caps[1]).map_err(|_| invalid())?;
            (month, caps[2].parse::<u32>())
        } else if let Some(caps) = year_first.captures(tag) {
            (numeric_month(&caps[2]).ok_or_else(invalid)?, caps[1].parse())
        } else if let Some(caps) = month_first.captures(tag) {
            (numeric_month(&caps[1]).ok_or_else(invalid)?, caps[2].parse())
        } else {
            return Err(invalid());
        };

        let year = year.map_err(|_| invalid())?;
        Ok(Self {
            month,
            year: year % 100,
        })
    }

    pub fn abbreviation(&self) -> &'static str {
        &self.month.name()[..3]
    }
}

impl fmt::Display for MonthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}", self.abbreviation(), self.year)
    }
}

/// Named ("Apr 25"), year-first ("2025-04") and month-first ("04/2025") forms
fn month_patterns() -> WipResult<&'static [Regex; 3]> {
    static PATTERNS: OnceLock<Result<[Regex; 3], regex::Error>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Ok([
                Regex::new(r"^(?i)([a-z]+)\.?[\s\-_/']*(\d{2}|\d{4})$")?,
                Regex::new(r"^(\d{4})[\-/](\d{1,2})$")?,
                Regex::new(r"^(\d{1,2})[\-/](\d{2}|\d{4})$")?,
            ])
        })
        .as_ref()
        .map_err(|e| WipError::Config(format!("Regex error: {}", e)))
}

fn numeric_month(digits: &str) -> Option<Month> {
    let n: u8 = digits.parse().ok()?;
    Month::try_from(n).ok()
}

/// Normalize a month tag to its canonical tab name
pub fn normalize_month_tag(input: &str) -> WipResult<String> {
    Ok(MonthTag::parse(input)?.to_string())
}

/// Find the existing tab for `tag` among `names`
///
/// Exact (case-insensitive) matches win; otherwise the first tab whose name
/// contains both the month abbreviation and the two-digit year is used
/// ("April 25", "Apr-25 WIP").
pub fn find_month_sheet<'a, S: AsRef<str>>(names: &'a [S], tag: &MonthTag) -> Option<&'a str> {
    let canonical = tag.to_string().to_lowercase();
    let abbreviation = tag.abbreviation().to_lowercase();
    let year = format!("{:02}", tag.year);

    names
        .iter()
        .map(name_of)
        .find(|name| name.trim().to_lowercase() == canonical)
        .or_else(|| {
            names.iter().map(name_of).find(|name| {
                let lower = name.to_lowercase();
                lower.contains(&abbreviation) && lower.contains(&year)
            })
        })
}

fn name_of<S: AsRef<str>>(name: &S) -> &str {
    name.as_ref()
}
