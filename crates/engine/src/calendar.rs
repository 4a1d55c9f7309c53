//! Calendar helpers shared by the report folds.
//!
//! Reports never call the system clock directly; "today" is always passed in
//! from the caller so folds stay deterministic.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};

/// Items that can be bucketed on a time axis.
pub trait GroupDate {
    fn group_date(&self) -> NaiveDate;
}

/// First day of the month containing `date`.
pub fn beginning_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    match add_months(beginning_of_month(date), 1).pred_opt() {
        Some(last) => last,
        None => date,
    }
}

/// `date` shifted forward by `months` calendar months, day clamped.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// `date` shifted backward by `months` calendar months, day clamped.
pub fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

/// Month bucket key, e.g. `2024-03`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Buckets items by calendar month, preserving input order within a bucket.
pub fn group_by_month<T: GroupDate + Clone>(items: &[T]) -> BTreeMap<String, Vec<T>> {
    let mut grouped: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        grouped
            .entry(month_key(item.group_date()))
            .or_default()
            .push(item.clone());
    }
    grouped
}

/// First day of the financial year containing `date`.
///
/// `starting_month` is 1-12; with the default of 4 (April), 2024-03-15 falls
/// in the financial year starting 2023-04-01.
pub fn financial_year_start(date: NaiveDate, starting_month: u32) -> NaiveDate {
    let year = if date.month() >= starting_month {
        date.year()
    } else {
        date.year() - 1
    };
    NaiveDate::from_ymd_opt(year, starting_month, 1).unwrap_or(date)
}
