//! Asset allocation versus configured targets.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    classify::Classifier,
    config::Config,
    query::Query,
    valuation::Valuer,
};

/// One configured target with its current standing.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub name: String,
    pub target: Decimal,
    pub current_amount: Decimal,
    pub percent: Decimal,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    pub total: Decimal,
    pub allocations: Vec<Allocation>,
}

/// Market value per target group as a share of the whole asset base.
pub fn compute_allocation(
    config: &Config,
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    query: &Query,
    today: NaiveDate,
) -> AllocationReport {
    let assets = query.clone().like(&["Assets:%"]).until_today().all();
    let total = valuer.current_balance(classifier, &assets, today);

    let allocations = config
        .allocation_targets
        .iter()
        .map(|target| {
            let patterns: Vec<&str> = target.accounts.iter().map(String::as_str).collect();
            let postings = query.clone().like(&patterns).until_today().all();
            let current_amount = valuer.current_balance(classifier, &postings, today);
            let percent = if total.is_zero() {
                Decimal::ZERO
            } else {
                current_amount * Decimal::ONE_HUNDRED / total
            };
            Allocation {
                name: target.name.clone(),
                target: target.target,
                current_amount,
                percent,
            }
        })
        .collect();

    AllocationReport { total, allocations }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        config::AllocationTarget,
        posting::{Posting, Status},
        price::PriceIndex,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(account: &str, amount: Decimal) -> Posting {
        Posting {
            id: 0,
            transaction_id: "t".to_string(),
            date: date(2024, 1, 1),
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

    #[test]
    fn percent_is_share_of_total_assets() {
        let mut config = Config::default();
        config.allocation_targets = vec![
            AllocationTarget {
                name: "Equity".to_string(),
                target: dec!(60),
                accounts: vec!["Assets:Equity:%".to_string()],
            },
            AllocationTarget {
                name: "Debt".to_string(),
                target: dec!(40),
                accounts: vec!["Assets:Debt:%".to_string()],
            },
        ];
        let postings = vec![
            posting("Assets:Equity:NIFTY", dec!(7000)),
            posting("Assets:Debt:PPF", dec!(3000)),
        ];
        let prices = PriceIndex::default();
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);
        let query = Query::new(Arc::new(postings.clone()), date(2024, 6, 1));

        let report = compute_allocation(&config, &classifier, valuer, &query, date(2024, 6, 1));

        assert_eq!(report.total, dec!(10000));
        assert_eq!(report.allocations[0].percent, dec!(70));
        assert_eq!(report.allocations[1].percent, dec!(30));
    }
}
