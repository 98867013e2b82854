//! Helpers for the `YYYY-MM-DD` strings goals and allocations carry on the wire.

use chrono::{Datelike, Local, Months, NaiveDate};

use crate::constants::DATE_FORMAT;
use crate::errors::{Result, ValidationError};

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| {
        ValidationError::DateParse {
            value: value.to_string(),
            source,
        }
        .into()
    })
}

pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value.map(parse_date).transpose()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `date + months`, clamping the day to the end of shorter months.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

pub fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    let next = add_months(first, 1);
    (next - first).num_days() as u32
}

/// Whole calendar months from `start` to `end`, never counting a month whose
/// day-of-month has not been reached yet.
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if months > 0 && add_months(start, months as u32) > end {
        months -= 1;
    } else if months < 0 && sub_months(start, (-months) as u32) < end {
        months += 1;
    }
    months
}
