//! Budget engine: forecast vs actual with optional month-to-month rollover.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    EngineError, ResultEngine,
    calendar::{add_months, beginning_of_month, end_of_month, group_by_month, month_key},
    cancel::CancelToken,
    posting::{Posting, is_same_or_parent},
    valuation::cost_sum,
};

/// One account's budget for one month.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBudget {
    pub account: String,
    pub forecast: Decimal,
    pub actual: Decimal,
    pub rollover: Decimal,
    pub available: Decimal,
    pub date: NaiveDate,
    pub expenses: Vec<Posting>,
}

/// One month of the budget.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub date: NaiveDate,
    pub accounts: Vec<AccountBudget>,
    pub available_this_month: Decimal,
    pub end_of_month_balance: Decimal,
    pub forecast: Decimal,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    pub budgets_by_month: BTreeMap<String, Budget>,
    pub checking_balance: Decimal,
    pub available_for_budgeting: Decimal,
}

/// Forecast window walk.
///
/// The running "available for budgeting" seed starts at the checking balance
/// and shrinks by each month's positive availability; `end_of_month_balance`
/// is the seed after that deduction.
pub fn compute_budget(
    forecast_postings: &[Posting],
    expense_postings: &[Posting],
    checking_balance: Decimal,
    rollover: bool,
    today: NaiveDate,
    cancel: &CancelToken,
) -> ResultEngine<BudgetReport> {
    let mut report = BudgetReport {
        checking_balance,
        available_for_budgeting: checking_balance,
        ..BudgetReport::default()
    };
    if forecast_postings.is_empty() {
        return Ok(report);
    }

    let forecasts = group_by_month(forecast_postings);
    let expenses = group_by_month(expense_postings);

    let accounts: Vec<String> = forecast_postings
        .iter()
        .map(|p| p.account.clone())
        .unique()
        .sorted()
        .collect();

    let current_month = beginning_of_month(today);
    let mut balance: HashMap<String, Decimal> = HashMap::new();

    let start = beginning_of_month(forecast_postings[0].date);
    let end = end_of_month(forecast_postings[forecast_postings.len() - 1].date);

    let mut month = start;
    while month <= end {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let key = month_key(month);
        let empty = Vec::new();
        let forecasts_by_account = split_by_account(forecasts.get(&key).unwrap_or(&empty));
        let mut expenses_by_account = split_by_account(expenses.get(&key).unwrap_or(&empty));

        // Most specific forecast account wins an expense, so consume the pool
        // child-first.
        let mut consumed: HashMap<&str, Vec<Posting>> = HashMap::new();
        for account in accounts.iter().rev() {
            consumed.insert(
                account.as_str(),
                pop_expenses(account, &mut expenses_by_account),
            );
        }

        let mut account_budgets = Vec::new();
        for account in &accounts {
            let fs = forecasts_by_account.get(account.as_str()).cloned().unwrap_or_default();
            let es = consumed.remove(account.as_str()).unwrap_or_default();
            let budget = build_budget(
                month,
                account,
                balance.get(account).copied().unwrap_or_default(),
                &fs,
                es,
                month < current_month,
                rollover,
            );
            let carried = if budget.available > Decimal::ZERO {
                budget.available
            } else {
                Decimal::ZERO
            };
            balance.insert(account.clone(), carried);
            account_budgets.push(budget);
        }

        let available_this_month: Decimal = account_budgets
            .iter()
            .map(|b| b.available.max(Decimal::ZERO))
            .sum();
        let forecast_total: Decimal = account_budgets
            .iter()
            .map(|b| b.forecast.max(Decimal::ZERO))
            .sum();

        report.available_for_budgeting -= available_this_month;

        report.budgets_by_month.insert(
            key,
            Budget {
                date: month,
                accounts: account_budgets,
                available_this_month,
                end_of_month_balance: report.available_for_budgeting,
                forecast: forecast_total,
            },
        );

        month = add_months(month, 1);
    }

    Ok(report)
}

fn build_budget(
    date: NaiveDate,
    account: &str,
    balance: Decimal,
    forecasts: &[Posting],
    expenses: Vec<Posting>,
    past: bool,
    rollover: bool,
) -> AccountBudget {
    let forecast = cost_sum(forecasts);
    let actual = cost_sum(&expenses);

    let mut carried = Decimal::ZERO;
    let mut available = forecast - actual;
    if past {
        available = Decimal::ZERO;
    }
    if rollover {
        carried = balance;
        available = balance + (forecast - actual);
    }

    AccountBudget {
        account: account.to_string(),
        forecast,
        actual,
        rollover: carried,
        available,
        date,
        expenses,
    }
}

fn split_by_account(postings: &[Posting]) -> HashMap<&str, Vec<Posting>> {
    let mut by_account: HashMap<&str, Vec<Posting>> = HashMap::new();
    for posting in postings {
        by_account
            .entry(posting.account.as_str())
            .or_default()
            .push(posting.clone());
    }
    by_account
}

/// Removes from the pool every expense booked at or under `forecast_account`.
fn pop_expenses(
    forecast_account: &str,
    expenses_by_account: &mut HashMap<&str, Vec<Posting>>,
) -> Vec<Posting> {
    let matching: Vec<&str> = expenses_by_account
        .keys()
        .filter(|account| is_same_or_parent(account, forecast_account))
        .copied()
        .collect();
    let mut popped = Vec::new();
    for account in matching {
        if let Some(mut es) = expenses_by_account.remove(account) {
            popped.append(&mut es);
        }
    }
    popped
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

    fn posting(on: NaiveDate, account: &str, amount: Decimal, forecast: bool) -> Posting {
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
            forecast,
            transaction_begin_line: 0,
            transaction_end_line: 0,
            file_name: "main.ledger".to_string(),
        }
    }

    #[test]
    fn rollover_carries_and_clamps() {
        let forecasts = vec![
            posting(date(2024, 1, 1), "Expenses:Food", dec!(10000), true),
            posting(date(2024, 2, 1), "Expenses:Food", dec!(10000), true),
        ];
        let expenses = vec![
            posting(date(2024, 1, 12), "Expenses:Food", dec!(8000), false),
            posting(date(2024, 2, 14), "Expenses:Food", dec!(12000), false),
        ];

        let report = compute_budget(
            &forecasts,
            &expenses,
            dec!(50000),
            true,
            date(2024, 2, 20),
            &CancelToken::new(),
        )
        .unwrap();

        let january = &report.budgets_by_month["2024-01"].accounts[0];
        assert_eq!(january.available, dec!(2000));

        let february = &report.budgets_by_month["2024-02"].accounts[0];
        assert_eq!(february.rollover, dec!(2000));
        assert_eq!(february.available, dec!(2000) + dec!(10000) - dec!(12000));
        assert_eq!(february.available, dec!(0));
    }

    #[test]
    fn without_rollover_past_months_are_zeroed() {
        let forecasts = vec![
            posting(date(2024, 1, 1), "Expenses:Food", dec!(10000), true),
            posting(date(2024, 2, 1), "Expenses:Food", dec!(10000), true),
        ];
        let expenses = vec![posting(date(2024, 1, 12), "Expenses:Food", dec!(8000), false)];

        let report = compute_budget(
            &forecasts,
            &expenses,
            dec!(50000),
            false,
            date(2024, 2, 20),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(
            report.budgets_by_month["2024-01"].accounts[0].available,
            dec!(0)
        );
        assert_eq!(
            report.budgets_by_month["2024-02"].accounts[0].available,
            dec!(10000)
        );
    }

    #[test]
    fn seed_decreases_by_available_each_month() {
        let forecasts = vec![
            posting(date(2024, 2, 1), "Expenses:Food", dec!(10000), true),
            posting(date(2024, 2, 1), "Expenses:Rent", dec!(20000), true),
        ];
        let report = compute_budget(
            &forecasts,
            &[],
            dec!(50000),
            false,
            date(2024, 2, 10),
            &CancelToken::new(),
        )
        .unwrap();

        let month = &report.budgets_by_month["2024-02"];
        assert_eq!(month.available_this_month, dec!(30000));
        assert_eq!(month.end_of_month_balance, dec!(20000));
        assert_eq!(
            month.available_this_month + month.end_of_month_balance,
            report.checking_balance
        );
        assert_eq!(report.available_for_budgeting, dec!(20000));
    }

    #[test]
    fn child_expense_goes_to_most_specific_forecast() {
        let forecasts = vec![
            posting(date(2024, 1, 1), "Expenses:Food", dec!(5000), true),
            posting(date(2024, 1, 1), "Expenses:Food:Dining", dec!(2000), true),
        ];
        let expenses = vec![
            posting(date(2024, 1, 8), "Expenses:Food:Dining:Pizza", dec!(900), false),
            posting(date(2024, 1, 9), "Expenses:Food:Groceries", dec!(1500), false),
        ];

        let report = compute_budget(
            &forecasts,
            &expenses,
            dec!(10000),
            false,
            date(2024, 1, 20),
            &CancelToken::new(),
        )
        .unwrap();

        let month = &report.budgets_by_month["2024-01"];
        let by_account: HashMap<&str, &AccountBudget> = month
            .accounts
            .iter()
            .map(|b| (b.account.as_str(), b))
            .collect();
        assert_eq!(by_account["Expenses:Food:Dining"].actual, dec!(900));
        assert_eq!(by_account["Expenses:Food"].actual, dec!(1500));
    }
}
