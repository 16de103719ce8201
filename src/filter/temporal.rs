//! Temporal filter values: year, quarter and month
//!
//! The date dimension is stored as a `YYYY-MM` (or longer ISO) value. Year and
//! month selections match its components; a quarter matches any of its three
//! months. Month selections accept either the two-digit code or the month name.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::FilterError;

/// Selection labels that mean "no temporal constraint"
pub const ALL_SENTINELS: &[&str] = &["", "Todas", "Todos", "all", "*"];

/// Parse a temporal choice, mapping the "all" sentinels to `None`
pub fn parse_temporal<T>(raw: &str) -> Result<Option<T>, FilterError>
where
    T: FromStr<Err = FilterError>,
{
    let trimmed = raw.trim();
    if ALL_SENTINELS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(trimmed))
    {
        Ok(None)
    } else {
        trimmed.parse().map(Some)
    }
}

/// Calendar year, always four digits
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Year(String);

impl Year {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Year {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
            Ok(Year(s.to_string()))
        } else {
            Err(FilterError::InvalidYear(s.to_string()))
        }
    }
}

impl TryFrom<String> for Year {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Year> for String {
    fn from(year: Year) -> Self {
        year.0
    }
}

impl From<i32> for Year {
    fn from(year: i32) -> Self {
        Year(format!("{:04}", year))
    }
}

impl std::fmt::Display for Year {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

const MONTHS: [(Month, &str, &str); 12] = [
    (Month::January, "01", "Janeiro"),
    (Month::February, "02", "Fevereiro"),
    (Month::March, "03", "Março"),
    (Month::April, "04", "Abril"),
    (Month::May, "05", "Maio"),
    (Month::June, "06", "Junho"),
    (Month::July, "07", "Julho"),
    (Month::August, "08", "Agosto"),
    (Month::September, "09", "Setembro"),
    (Month::October, "10", "Outubro"),
    (Month::November, "11", "Novembro"),
    (Month::December, "12", "Dezembro"),
];

impl Month {
    /// All months in calendar order
    pub fn all() -> impl Iterator<Item = Month> {
        MONTHS.iter().map(|(m, _, _)| *m)
    }

    fn entry(self) -> &'static (Month, &'static str, &'static str) {
        &MONTHS[self.number() as usize - 1]
    }

    /// 1-based month number
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// Two-digit code (`"01"`..`"12"`)
    pub fn code(self) -> &'static str {
        self.entry().1
    }

    /// Display label (`"Janeiro"`..`"Dezembro"`)
    pub fn label(self) -> &'static str {
        self.entry().2
    }

    pub fn from_number(number: u32) -> Option<Month> {
        MONTHS.get((number as usize).checked_sub(1)?).map(|(m, _, _)| *m)
    }

    pub fn from_code(code: &str) -> Option<Month> {
        code.trim()
            .parse::<u32>()
            .ok()
            .filter(|_| code.trim().len() <= 2)
            .and_then(Month::from_number)
    }

    pub fn from_label(label: &str) -> Option<Month> {
        let label = label.trim();
        MONTHS
            .iter()
            .find(|(_, _, l)| l.to_lowercase() == label.to_lowercase())
            .map(|(m, _, _)| *m)
    }

    /// Quarter containing this month
    pub fn quarter(self) -> Quarter {
        match self.number() {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }
}

impl FromStr for Month {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::from_label(s)
            .or_else(|| Month::from_code(s))
            .ok_or_else(|| FilterError::UnknownMonth(s.to_string()))
    }
}

impl TryFrom<String> for Month {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.code().to_string()
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Calendar quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn all() -> [Quarter; 4] {
        [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4]
    }

    /// The three months of this quarter
    pub fn months(self) -> [Month; 3] {
        match self {
            Quarter::Q1 => [Month::January, Month::February, Month::March],
            Quarter::Q2 => [Month::April, Month::May, Month::June],
            Quarter::Q3 => [Month::July, Month::August, Month::September],
            Quarter::Q4 => [Month::October, Month::November, Month::December],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

impl FromStr for Quarter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().trim_start_matches('Q') {
            "1" => Ok(Quarter::Q1),
            "2" => Ok(Quarter::Q2),
            "3" => Ok(Quarter::Q3),
            "4" => Ok(Quarter::Q4),
            _ => Err(FilterError::UnknownQuarter(s.to_string())),
        }
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse the year and month of a `YYYY-MM[...]` value
pub fn parse_period(value: &str) -> Option<(Year, Month)> {
    let head = value.trim().get(..7)?;
    let date = NaiveDate::parse_from_str(&format!("{}-01", head), "%Y-%m-%d").ok()?;
    Some((Year::from(date.year()), Month::from_number(date.month())?))
}

/// Year, quarter and month options present in a set of date values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalOptions {
    pub years: Vec<Year>,
    pub quarters: Vec<Quarter>,
    pub months: Vec<Month>,
}

impl TemporalOptions {
    /// Decompose date values; values that are not `YYYY-MM...` are skipped
    pub fn from_periods<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut years = BTreeSet::new();
        let mut quarters = BTreeSet::new();
        let mut months = BTreeSet::new();

        for value in values {
            if let Some((year, month)) = parse_period(value.as_ref()) {
                years.insert(year);
                quarters.insert(month.quarter());
                months.insert(month);
            }
        }

        Self {
            years: years.into_iter().collect(),
            quarters: quarters.into_iter().collect(),
            months: months.into_iter().collect(),
        }
    }
}
