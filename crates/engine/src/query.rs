//! Composable posting queries.
//!
//! A [`Query`] accumulates immutable filter clauses over a snapshot and
//! materializes a posting slice only on [`Query::all`]. Builders are cheap to
//! clone, so branches of an analysis never interfere.

use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;

use crate::{
    calendar::{beginning_of_month, end_of_month, sub_months},
    posting::{Posting, is_same_or_parent},
};

/// Compiles an account pattern into an anchored regex.
///
/// `*` matches within one path segment (never across `:`); `%` matches any
/// suffix, SQL style. Everything else is literal.
pub(crate) fn compile_pattern(pattern: &str) -> Option<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => translated.push_str("[^:]*"),
            '%' => translated.push_str(".*"),
            _ => translated.push_str(&regex::escape(&ch.to_string())),
        }
    }
    translated.push('$');
    match Regex::new(&translated) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!("invalid account pattern {pattern:?}: {err}");
            None
        }
    }
}

/// `true` when `account` matches the `*`/`%` pattern.
pub fn account_matches(pattern: &str, account: &str) -> bool {
    compile_pattern(pattern).is_some_and(|re| re.is_match(account))
}

#[derive(Clone, Debug)]
enum Filter {
    Like(Vec<Regex>),
    AccountPrefix(String),
    NotAccountPrefix(String),
    Forecast(bool),
    From(NaiveDate),
    Until(NaiveDate),
    Before(NaiveDate),
}

impl Filter {
    fn matches(&self, posting: &Posting) -> bool {
        match self {
            Filter::Like(patterns) => patterns.iter().any(|re| re.is_match(&posting.account)),
            Filter::AccountPrefix(prefix) => is_same_or_parent(&posting.account, prefix),
            Filter::NotAccountPrefix(prefix) => !is_same_or_parent(&posting.account, prefix),
            Filter::Forecast(forecast) => posting.forecast == *forecast,
            Filter::From(date) => posting.date >= *date,
            Filter::Until(date) => posting.date <= *date,
            Filter::Before(date) => posting.date < *date,
        }
    }
}

/// Posting query over one snapshot.
///
/// Queries exclude forecast postings unless [`Query::forecast`] asks for them,
/// so reports over actuals never mix in projections.
#[derive(Clone, Debug)]
pub struct Query {
    postings: Arc<Vec<Posting>>,
    today: NaiveDate,
    forecast: bool,
    filters: Vec<Filter>,
}

impl Query {
    pub fn new(postings: Arc<Vec<Posting>>, today: NaiveDate) -> Query {
        Query {
            postings,
            today,
            forecast: false,
            filters: Vec::new(),
        }
    }

    /// Keeps postings whose account matches any of `patterns`.
    #[must_use]
    pub fn like(mut self, patterns: &[&str]) -> Query {
        let compiled = patterns.iter().filter_map(|p| compile_pattern(p)).collect();
        self.filters.push(Filter::Like(compiled));
        self
    }

    /// Keeps postings at or under `prefix` (colon boundary).
    #[must_use]
    pub fn account_prefix(mut self, prefix: &str) -> Query {
        self.filters.push(Filter::AccountPrefix(prefix.to_string()));
        self
    }

    /// Drops postings at or under `prefix`.
    #[must_use]
    pub fn not_account_prefix(mut self, prefix: &str) -> Query {
        self.filters
            .push(Filter::NotAccountPrefix(prefix.to_string()));
        self
    }

    /// Restricts to forecast postings.
    #[must_use]
    pub fn forecast(mut self) -> Query {
        self.forecast = true;
        self
    }

    /// Restricts to actual (non-forecast) postings. This is the default.
    #[must_use]
    pub fn not_forecast(mut self) -> Query {
        self.forecast = false;
        self
    }

    /// Postings dated in the last `n` calendar months (month-aligned).
    #[must_use]
    pub fn last_n_months(mut self, n: u32) -> Query {
        let boundary = sub_months(beginning_of_month(self.today), n);
        self.filters.push(Filter::From(boundary));
        self
    }

    /// Postings dated strictly before the last `n` calendar months.
    ///
    /// Partitions the stream together with [`Query::last_n_months`] at the
    /// same boundary.
    #[must_use]
    pub fn before_n_months(mut self, n: u32) -> Query {
        let boundary = sub_months(beginning_of_month(self.today), n);
        self.filters.push(Filter::Before(boundary));
        self
    }

    #[must_use]
    pub fn until_today(mut self) -> Query {
        self.filters.push(Filter::Until(self.today));
        self
    }

    #[must_use]
    pub fn until_this_month_end(mut self) -> Query {
        self.filters.push(Filter::Until(end_of_month(self.today)));
        self
    }

    /// Materializes the matching postings in canonical order (date ascending,
    /// ties by transaction encounter order then posting index).
    pub fn all(&self) -> Vec<Posting> {
        self.postings
            .iter()
            .filter(|p| p.forecast == self.forecast)
            .filter(|p| self.filters.iter().all(|f| f.matches(p)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use rust_decimal_macros::dec;

    use super::*;
    use crate::posting::Status;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(account: &str, on: NaiveDate, forecast: bool) -> Posting {
        Posting {
            id: 0,
            transaction_id: "t".to_string(),
            date: on,
            payee: String::new(),
            account: account.to_string(),
            commodity: "INR".to_string(),
            quantity: dec!(0),
            amount: dec!(100),
            status: Status::Unmarked,
            tag_recurring: None,
            forecast,
            transaction_begin_line: 0,
            transaction_end_line: 0,
            file_name: "main.ledger".to_string(),
        }
    }

    fn snapshot(postings: Vec<Posting>) -> Arc<Vec<Posting>> {
        Arc::new(postings)
    }

    #[test]
    fn star_matches_one_segment_only() {
        assert!(account_matches("Assets:*", "Assets:Equity"));
        assert!(!account_matches("Assets:*", "Assets:Equity:NIFTY"));
        assert!(account_matches("Assets:%", "Assets:Equity:NIFTY"));
        assert!(account_matches("Assets:*:NIFTY", "Assets:Equity:NIFTY"));
        assert!(!account_matches("Assets:%", "Income:CapitalGains"));
    }

    #[test]
    fn like_patterns_or_together() {
        let q = Query::new(
            snapshot(vec![
                posting("Assets:Equity", date(2024, 1, 1), false),
                posting("Liabilities:Loan", date(2024, 1, 2), false),
                posting("Expenses:Food", date(2024, 1, 3), false),
            ]),
            date(2024, 6, 1),
        );
        let matched = q.like(&["Assets:%", "Liabilities:%"]).all();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn forecast_postings_are_excluded_by_default() {
        let q = Query::new(
            snapshot(vec![
                posting("Expenses:Food", date(2024, 1, 1), false),
                posting("Expenses:Food", date(2024, 2, 1), true),
            ]),
            date(2024, 6, 1),
        );
        assert_eq!(q.clone().all().len(), 1);
        assert_eq!(q.clone().forecast().all().len(), 1);
        assert!(q.forecast().all()[0].forecast);
    }

    #[test]
    fn month_windows_partition_the_stream() {
        let today = date(2024, 6, 15);
        let q = Query::new(
            snapshot(vec![
                posting("Assets:Checking:HDFC", date(2024, 2, 29), false),
                posting("Assets:Checking:HDFC", date(2024, 3, 1), false),
                posting("Assets:Checking:HDFC", date(2024, 5, 20), false),
            ]),
            today,
        );
        let before = q.clone().before_n_months(3).all();
        let last = q.clone().last_n_months(3).all();
        assert_eq!(before.len(), 1);
        assert_eq!(last.len(), 2);
        assert_eq!(before.len() + last.len(), q.all().len());
    }

    #[test]
    fn until_today_clips_future_postings() {
        let today = date(2024, 6, 15);
        let q = Query::new(
            snapshot(vec![
                posting("Assets:Equity", date(2024, 6, 15), false),
                posting("Assets:Equity", date(2024, 6, 16), false),
            ]),
            today,
        );
        assert_eq!(q.until_today().all().len(), 1);
    }
}
