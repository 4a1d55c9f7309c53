//! Retirement goal: target sizing from the safe withdrawal rate plus a
//! completion projection at the trailing-year savings rate.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::{
    calendar::{add_months, financial_year_start, sub_months},
    classify::Classifier,
    config::{Config, RetirementGoal},
    posting::Posting,
    query::Query,
    valuation::{Valuer, cost_sum},
};

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementProgress {
    pub name: String,
    pub icon: String,
    pub swr: Decimal,
    pub yearly_expenses: Decimal,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub monthly_addition: Decimal,
    pub completion_date: Option<NaiveDate>,
}

fn matching(query: &Query, patterns: &[String]) -> Vec<Posting> {
    let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
    query.clone().like(&patterns).all()
}

/// Mean yearly spend over the last three complete financial years.
fn mean_yearly_expenses(
    query: &Query,
    goal: &RetirementGoal,
    config: &Config,
    today: NaiveDate,
) -> Decimal {
    let expenses = matching(query, &goal.expenses);
    let fy_start = financial_year_start(today, config.financial_year_starting_month);
    let window_start = match fy_start.with_year(fy_start.year() - 3) {
        Some(start) => start,
        None => return Decimal::ZERO,
    };
    let total: Decimal = cost_sum(
        &expenses
            .iter()
            .filter(|p| p.date >= window_start && p.date < fy_start)
            .cloned()
            .collect::<Vec<_>>(),
    );
    total / Decimal::from(3)
}

pub fn compute_retirement(
    goal: &RetirementGoal,
    config: &Config,
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    query: &Query,
    today: NaiveDate,
) -> RetirementProgress {
    let yearly_expenses = goal
        .yearly_expenses
        .unwrap_or_else(|| mean_yearly_expenses(query, goal, config, today));
    let target_amount = yearly_expenses * Decimal::ONE_HUNDRED / goal.swr;

    let savings = matching(query, &goal.savings);
    let current_amount = valuer.current_balance(classifier, &savings, today);

    // Savings rate: average monthly addition over the trailing twelve months.
    let year_ago = sub_months(today, 12);
    let earlier: Vec<Posting> = savings
        .iter()
        .filter(|p| p.date <= year_ago)
        .cloned()
        .collect();
    let balance_year_ago = valuer.current_balance(classifier, &earlier, year_ago);
    let monthly_addition = (current_amount - balance_year_ago) / Decimal::from(12);

    let completion_date = if current_amount >= target_amount {
        Some(today)
    } else if monthly_addition <= Decimal::ZERO {
        None
    } else {
        let shortfall = target_amount - current_amount;
        let months = (shortfall / monthly_addition).ceil();
        months.to_u32().map(|n| add_months(today, n))
    };

    RetirementProgress {
        name: goal.name.clone(),
        icon: goal.icon.clone(),
        swr: goal.swr,
        yearly_expenses,
        target_amount,
        current_amount,
        monthly_addition,
        completion_date,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::{posting::Status, price::PriceIndex};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(on: NaiveDate, account: &str, amount: Decimal) -> Posting {
        Posting {
            id: 0,
            transaction_id: "t".to_string(),
            date: on,
            payee: String::new(),
            account: account.to_string(),
            commodity: "INR".to_string(),
            quantity: dec!(0),
            amount,
            status: Status::Unmarked,
            tag_recurring: None,
            forecast: false,
            transaction_begin_line: 0,
            transaction_end_line: 0,
            file_name: "main.ledger".to_string(),
        }
    }

    fn goal() -> RetirementGoal {
        RetirementGoal {
            name: "FIRE".to_string(),
            icon: String::new(),
            swr: dec!(4),
            expenses: vec!["Expenses:%".to_string()],
            savings: vec!["Assets:%".to_string()],
            yearly_expenses: None,
        }
    }

    #[test]
    fn target_is_expenses_over_swr() {
        let config = Config::default();
        let today = date(2024, 6, 1);
        // Both spends fall inside the last three complete financial years
        // (2021-04 .. 2024-03).
        let postings = vec![
            posting(date(2022, 6, 10), "Expenses:Food", dec!(300000)),
            posting(date(2023, 6, 10), "Expenses:Food", dec!(600000)),
            posting(date(2024, 1, 15), "Assets:Debt:PPF", dec!(100000)),
        ];
        let prices = PriceIndex::default();
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);
        let query = Query::new(Arc::new(postings.clone()), today);

        let progress =
            compute_retirement(&goal(), &config, &classifier, valuer, &query, today);

        // Window covers FY 2021-04..2024-03: 300000 + 600000 over 3 years.
        assert_eq!(progress.yearly_expenses, dec!(300000));
        assert_eq!(progress.target_amount, dec!(7500000));
        assert_eq!(progress.current_amount, dec!(100000));
    }

    #[test]
    fn override_wins_and_projection_extends_forward() {
        let config = Config::default();
        let today = date(2024, 6, 1);
        let mut g = goal();
        g.yearly_expenses = Some(dec!(100000));
        // Savings: 50k a year ago and 50k since, so monthly addition is
        // 50000/12.
        let postings = vec![
            posting(date(2023, 1, 1), "Assets:Debt:PPF", dec!(50000)),
            posting(date(2024, 1, 1), "Assets:Debt:PPF", dec!(50000)),
        ];
        let prices = PriceIndex::default();
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);
        let query = Query::new(Arc::new(postings.clone()), today);

        let progress = compute_retirement(&g, &config, &classifier, valuer, &query, today);

        assert_eq!(progress.target_amount, dec!(2500000));
        assert_eq!(progress.current_amount, dec!(100000));
        assert!(progress.monthly_addition > dec!(0));
        let completion = progress.completion_date.unwrap();
        // (2500000 - 100000) / (50000/12) = 576 months.
        assert_eq!(completion, add_months(today, 576));
    }

    #[test]
    fn no_additions_means_no_completion() {
        let config = Config::default();
        let today = date(2024, 6, 1);
        let mut g = goal();
        g.yearly_expenses = Some(dec!(100000));
        let postings = vec![posting(date(2022, 1, 1), "Assets:Debt:PPF", dec!(50000))];
        let prices = PriceIndex::default();
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);
        let query = Query::new(Arc::new(postings.clone()), today);

        let progress = compute_retirement(&g, &config, &classifier, valuer, &query, today);
        assert!(progress.completion_date.is_none());
    }
}
