//! Monthly cash-flow accumulator.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    EngineError, ResultEngine,
    calendar::{GroupDate, add_months, beginning_of_month, group_by_month, month_key},
    cancel::CancelToken,
    query::Query,
    valuation::cost_sum,
};

/// One month of cash movement.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub liabilities: Decimal,
    pub investment: Decimal,
    pub tax: Decimal,
    pub checking: Decimal,
    pub balance: Decimal,
}

impl GroupDate for CashFlow {
    fn group_date(&self) -> NaiveDate {
        self.date
    }
}

/// Monthly cash flow from the first posting through max(today, last posting).
///
/// `balance` is a running sum of checking movement, seeded with `balance` --
/// the current variant passes the checking balance from before the window so
/// the running total lines up with the account.
pub fn compute_cash_flow(
    query: &Query,
    today: NaiveDate,
    mut balance: Decimal,
    cancel: &CancelToken,
) -> ResultEngine<Vec<CashFlow>> {
    let postings = query.all();
    if postings.is_empty() {
        return Ok(Vec::new());
    }

    let expenses = group_by_month(
        &query
            .clone()
            .like(&["Expenses:%"])
            .not_account_prefix("Expenses:Tax")
            .all(),
    );
    let incomes = group_by_month(&query.clone().like(&["Income:%"]).all());
    let liabilities = group_by_month(&query.clone().like(&["Liabilities:%"]).all());
    let investments = group_by_month(
        &query
            .clone()
            .like(&["Assets:%"])
            .not_account_prefix("Assets:Checking")
            .all(),
    );
    let taxes = group_by_month(&query.clone().account_prefix("Expenses:Tax").all());
    let checkings = group_by_month(&query.clone().account_prefix("Assets:Checking").all());

    let last = postings[postings.len() - 1].date;
    let end = today.max(last);

    let mut cash_flows = Vec::new();
    let mut start = beginning_of_month(postings[0].date);
    while start <= end {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let key = month_key(start);
        let mut cash_flow = CashFlow {
            date: start,
            ..CashFlow::default()
        };

        if let Some(ps) = expenses.get(&key) {
            cash_flow.expenses = cost_sum(ps);
        }
        if let Some(ps) = incomes.get(&key) {
            cash_flow.income = -cost_sum(ps);
        }
        if let Some(ps) = liabilities.get(&key) {
            cash_flow.liabilities = -cost_sum(ps);
        }
        if let Some(ps) = investments.get(&key) {
            cash_flow.investment = cost_sum(ps);
        }
        if let Some(ps) = taxes.get(&key) {
            cash_flow.tax = cost_sum(ps);
        }
        if let Some(ps) = checkings.get(&key) {
            cash_flow.checking = cost_sum(ps);
        }

        balance += cash_flow.checking;
        cash_flow.balance = balance;

        cash_flows.push(cash_flow);
        start = add_months(start, 1);
    }

    Ok(cash_flows)
}
