//! Per-account asset breakdowns.
//!
//! Capital-gains postings re-parent to their source asset account for
//! membership, so a sale contributes both its withdrawal and its realized
//! gain to the same subtree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    classify::Classifier,
    posting::{Posting, is_same_or_parent, parent_account},
    valuation::Valuer,
    xirr::postings_xirr,
};

/// Aggregate over one account subtree (or a single leaf).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBreakdown {
    pub group: String,
    pub investment_amount: Decimal,
    pub withdrawal_amount: Decimal,
    pub market_amount: Decimal,
    pub balance_units: Decimal,
    pub latest_price: Decimal,
    pub xirr: Decimal,
    pub gain_amount: Decimal,
    pub absolute_return: Decimal,
}

/// Breakdown per account.
///
/// With `rollup`, every ancestor of a posting's account gets an aggregate
/// entry; otherwise only accounts that carry postings directly (leaves).
pub fn compute_breakdowns(
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    postings: &[Posting],
    rollup: bool,
    today: NaiveDate,
) -> BTreeMap<String, AssetBreakdown> {
    let mut accounts: BTreeMap<String, bool> = BTreeMap::new();
    for posting in postings {
        if classifier.is_capital_gains(posting) {
            continue;
        }
        if rollup {
            // Strict ancestors are never leaves, not even when they carry
            // postings of their own.
            let mut account = posting.account.as_str();
            while let Some(parent) = parent_account(account) {
                accounts.insert(parent.to_string(), false);
                account = parent;
            }
        }
        accounts.entry(posting.account.clone()).or_insert(true);
    }

    let mut result = BTreeMap::new();
    for (group, leaf) in accounts {
        let members: Vec<Posting> = postings
            .iter()
            .filter(|p| is_same_or_parent(&classifier.breakdown_account(p), &group))
            .cloned()
            .collect();
        let breakdown = compute_breakdown(classifier, valuer, &members, leaf, &group, today);
        result.insert(group, breakdown);
    }
    result
}

pub fn compute_breakdown(
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    postings: &[Posting],
    leaf: bool,
    group: &str,
    today: NaiveDate,
) -> AssetBreakdown {
    let mut investment_amount = Decimal::ZERO;
    let mut withdrawal_amount = Decimal::ZERO;
    for posting in postings {
        let checking = classifier.is_checking_account(&posting.account);
        let interest = classifier.is_interest(posting);
        let split = classifier.is_stock_split(posting);
        let capital_gains = classifier.is_capital_gains(posting);

        if !(checking || posting.amount < Decimal::ZERO || interest || split || capital_gains) {
            investment_amount += posting.amount;
        }
        if capital_gains
            || !(checking || posting.amount > Decimal::ZERO || interest || split)
        {
            withdrawal_amount += -posting.amount;
        }
    }

    let without_capital_gains: Vec<Posting> = postings
        .iter()
        .filter(|p| !classifier.is_capital_gains(p))
        .cloned()
        .collect();
    let market_amount = valuer.current_balance(classifier, &without_capital_gains, today);

    let mut balance_units = Decimal::ZERO;
    let mut latest_price = Decimal::ZERO;
    if leaf {
        balance_units = without_capital_gains
            .iter()
            .filter(|p| !classifier.is_currency(&p.commodity))
            .map(|p| p.quantity)
            .sum();
        if let Some(commodity) = without_capital_gains
            .iter()
            .find(|p| !classifier.is_currency(&p.commodity))
            .map(|p| p.commodity.as_str())
        {
            latest_price = valuer.unit_price(commodity, today).unwrap_or_default();
        }
    }

    let rate = postings_xirr(classifier, valuer, postings, today);

    let net_investment = investment_amount - withdrawal_amount;
    let gain_amount = market_amount - net_investment;
    let absolute_return = if investment_amount.is_zero() {
        Decimal::ZERO
    } else {
        gain_amount / investment_amount
    };

    AssetBreakdown {
        group: group.to_string(),
        investment_amount,
        withdrawal_amount,
        market_amount,
        balance_units,
        latest_price,
        xirr: rate,
        gain_amount,
        absolute_return,
    }
}
