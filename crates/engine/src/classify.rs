//! Per-posting classification.
//!
//! Every accumulator routes a posting's contribution through exactly one of
//! these predicates, so each rupee lands in exactly one bucket.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::{
    config::{CommodityType, Config},
    posting::{Posting, is_same_or_parent},
};

const CAPITAL_GAINS_PREFIX: &str = "Income:CapitalGains";
const CHECKING_PREFIX: &str = "Assets:Checking";

/// Classifier over one posting snapshot.
///
/// Stock-split and interest-repayment detection need the sibling postings of
/// a transaction, so the classifier indexes the snapshot by transaction id
/// up front.
pub struct Classifier<'a> {
    config: &'a Config,
    siblings: HashMap<&'a str, Vec<&'a Posting>>,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Config, postings: &'a [Posting]) -> Classifier<'a> {
        let mut siblings: HashMap<&'a str, Vec<&'a Posting>> = HashMap::new();
        for posting in postings {
            siblings
                .entry(posting.transaction_id.as_str())
                .or_default()
                .push(posting);
        }
        Classifier { config, siblings }
    }

    /// `true` for the default currency and declared currency commodities.
    pub fn is_currency(&self, commodity: &str) -> bool {
        commodity == self.config.default_currency
            || self
                .config
                .commodity(commodity)
                .is_some_and(|c| c.commodity_type == CommodityType::Currency)
    }

    /// Interest accrual counter-posting, per the configured prefixes.
    pub fn is_interest(&self, posting: &Posting) -> bool {
        self.config
            .interest_prefixes
            .iter()
            .any(|prefix| is_same_or_parent(&posting.account, prefix))
    }

    /// Liabilities-side mirror of an interest accrual: the posting sits under
    /// `Liabilities:` and its transaction carries an accrual posting.
    pub fn is_interest_repayment(&self, posting: &Posting) -> bool {
        if !posting.account.starts_with("Liabilities:") {
            return false;
        }
        self.siblings
            .get(posting.transaction_id.as_str())
            .is_some_and(|siblings| siblings.iter().any(|p| self.is_interest(p)))
    }

    /// A pure quantity adjustment: non-currency commodity, zero amount,
    /// nonzero quantity, and the transaction's postings in that commodity net
    /// to zero amount.
    pub fn is_stock_split(&self, posting: &Posting) -> bool {
        if self.is_currency(&posting.commodity)
            || posting.quantity.is_zero()
            || !posting.amount.is_zero()
        {
            return false;
        }
        self.siblings
            .get(posting.transaction_id.as_str())
            .is_some_and(|siblings| {
                let same_commodity: Vec<_> = siblings
                    .iter()
                    .filter(|p| p.commodity == posting.commodity)
                    .collect();
                same_commodity.len() == siblings.len()
                    && same_commodity
                        .iter()
                        .map(|p| p.amount)
                        .sum::<Decimal>()
                        .is_zero()
            })
    }

    pub fn is_capital_gains(&self, posting: &Posting) -> bool {
        posting
            .account
            .strip_prefix(CAPITAL_GAINS_PREFIX)
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// The asset account a capital-gains posting belongs to, recovered by
    /// substituting the configured source prefix for `Income:CapitalGains`.
    pub fn capital_gains_source_account(&self, account: &str) -> String {
        match account.strip_prefix(CAPITAL_GAINS_PREFIX) {
            Some(rest) if rest.starts_with(':') => {
                format!("{}{rest}", self.config.capital_gains_source_prefix)
            }
            _ => account.to_string(),
        }
    }

    pub fn is_checking_account(&self, account: &str) -> bool {
        account
            .strip_prefix(CHECKING_PREFIX)
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// Account used for breakdown membership: capital gains re-parent to
    /// their source asset account, everything else stays put.
    pub fn breakdown_account(&self, posting: &Posting) -> String {
        if self.is_capital_gains(posting) {
            self.capital_gains_source_account(&posting.account)
        } else {
            posting.account.clone()
        }
    }
}
