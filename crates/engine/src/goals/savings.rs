//! Savings goal: solve the annuity future-value identity
//! `T = FV*(1+r/12)^n + P*((1+r/12)^n - 1)/(r/12)` for whichever of the
//! payment or the horizon the config leaves open.
//!
//! The solver works in `f64` like the XIRR core and converts back to
//! `Decimal` at the boundary.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;

use crate::{
    calendar::add_months,
    classify::Classifier,
    config::SavingsGoal,
    posting::Posting,
    query::Query,
    valuation::Valuer,
};

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsProjection {
    pub name: String,
    pub icon: String,
    pub target: Decimal,
    pub rate: Decimal,
    pub current_amount: Decimal,
    pub months_remaining: u32,
    pub target_date: Option<NaiveDate>,
    pub payment_per_period: Decimal,
}

fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    u32::try_from(months.max(0)).unwrap_or(0)
}

/// Monthly payment needed to reach `target` in `n` months.
fn solve_payment(target: f64, current: f64, monthly_rate: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    if monthly_rate == 0.0 {
        return (target - current) / n;
    }
    let growth = (1.0 + monthly_rate).powf(n);
    (target - current * growth) * monthly_rate / (growth - 1.0)
}

/// Months needed to reach `target` when paying `payment` a month.
fn solve_months(target: f64, current: f64, monthly_rate: f64, payment: f64) -> f64 {
    if current >= target {
        return 0.0;
    }
    if monthly_rate == 0.0 {
        if payment <= 0.0 {
            return f64::INFINITY;
        }
        return ((target - current) / payment).ceil();
    }
    let annuity = payment / monthly_rate;
    let ratio = (target + annuity) / (current + annuity);
    if ratio <= 0.0 || current + annuity <= 0.0 {
        return f64::INFINITY;
    }
    (ratio.ln() / (1.0 + monthly_rate).ln()).ceil()
}

pub fn compute_savings(
    goal: &SavingsGoal,
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    query: &Query,
    today: NaiveDate,
) -> SavingsProjection {
    let patterns: Vec<&str> = goal.accounts.iter().map(String::as_str).collect();
    let postings: Vec<Posting> = query.clone().like(&patterns).all();
    let current_amount = valuer.current_balance(classifier, &postings, today);

    let target = goal.target.to_f64().unwrap_or(0.0);
    let current = current_amount.to_f64().unwrap_or(0.0);
    let monthly_rate = goal.rate.to_f64().unwrap_or(0.0) / 12.0;

    let (months_remaining, payment, target_date) = match goal.target_date {
        // A fixed date wins; the payment is derived from it.
        Some(date) => {
            let n = months_between(today, date);
            let payment = solve_payment(target, current, monthly_rate, f64::from(n));
            (n, payment.max(0.0), Some(date))
        }
        None => {
            let payment = goal
                .payment_per_period
                .and_then(|p| p.to_f64())
                .unwrap_or(0.0);
            let n = solve_months(target, current, monthly_rate, payment);
            if n.is_finite() {
                let n = n as u32;
                (n, payment, Some(add_months(today, n)))
            } else {
                (0, payment, None)
            }
        }
    };

    SavingsProjection {
        name: goal.name.clone(),
        icon: goal.icon.clone(),
        target: goal.target,
        rate: goal.rate,
        current_amount,
        months_remaining,
        target_date,
        payment_per_period: Decimal::from_f64(payment).unwrap_or(Decimal::ZERO).round_dp(2),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::{config::Config, posting::Status, price::PriceIndex};

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

    fn goal() -> SavingsGoal {
        SavingsGoal {
            name: "House".to_string(),
            icon: String::new(),
            target: dec!(120000),
            rate: dec!(0),
            target_date: None,
            payment_per_period: None,
            accounts: vec!["Assets:Debt:%".to_string()],
        }
    }

    fn fixture(g: &SavingsGoal, postings: Vec<Posting>, today: NaiveDate) -> SavingsProjection {
        let config = Config::default();
        let prices = PriceIndex::default();
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);
        let query = Query::new(Arc::new(postings.clone()), today);
        compute_savings(g, &classifier, valuer, &query, today)
    }

    #[test]
    fn payment_from_target_date_zero_rate() {
        let mut g = goal();
        g.target_date = Some(date(2025, 1, 1));
        let today = date(2024, 1, 1);
        let projection = fixture(
            &g,
            vec![posting(date(2023, 6, 1), "Assets:Debt:PPF", dec!(24000))],
            today,
        );

        assert_eq!(projection.months_remaining, 12);
        // (120000 - 24000) / 12 months.
        assert_eq!(projection.payment_per_period, dec!(8000));
    }

    #[test]
    fn months_from_payment_zero_rate() {
        let mut g = goal();
        g.payment_per_period = Some(dec!(10000));
        let today = date(2024, 1, 1);
        let projection = fixture(&g, Vec::new(), today);

        assert_eq!(projection.months_remaining, 12);
        assert_eq!(projection.target_date, Some(date(2025, 1, 1)));
    }

    #[test]
    fn compounding_reduces_required_payment() {
        let mut g = goal();
        g.rate = dec!(0.12);
        g.target_date = Some(date(2025, 1, 1));
        let today = date(2024, 1, 1);
        let projection = fixture(&g, Vec::new(), today);

        // With 12% annual growth the flat 10000 a month overshoots.
        assert!(projection.payment_per_period < dec!(10000));
        assert!(projection.payment_per_period > dec!(9000));
    }

    #[test]
    fn reached_goal_needs_no_months() {
        let mut g = goal();
        g.payment_per_period = Some(dec!(1000));
        let today = date(2024, 1, 1);
        let projection = fixture(
            &g,
            vec![posting(date(2023, 6, 1), "Assets:Debt:PPF", dec!(150000))],
            today,
        );
        assert_eq!(projection.months_remaining, 0);
        assert_eq!(projection.target_date, Some(today));
    }
}
