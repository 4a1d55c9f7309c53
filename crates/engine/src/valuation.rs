//! Market valuation of postings.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{classify::Classifier, config::Config, posting::Posting, price::PriceIndex};

/// Values postings against the price index in the default currency.
#[derive(Clone, Copy)]
pub struct Valuer<'a> {
    config: &'a Config,
    prices: &'a PriceIndex,
}

impl<'a> Valuer<'a> {
    pub fn new(config: &'a Config, prices: &'a PriceIndex) -> Valuer<'a> {
        Valuer { config, prices }
    }

    /// Unit price of `commodity` at the greatest date `<= date`, converted to
    /// the default currency when the series is quoted in another one.
    pub fn unit_price(&self, commodity: &str, date: NaiveDate) -> Option<Decimal> {
        let raw = self.prices.unit_price(commodity, date)?;
        let declared = self.config.commodity(commodity).and_then(|c| c.currency.as_deref());
        match declared {
            Some(currency) if currency != self.config.default_currency => {
                let rate = self
                    .prices
                    .exchange_rate(currency, &self.config.default_currency, date)?;
                Some(raw * rate)
            }
            _ => Some(raw),
        }
    }

    /// Market value of one posting at `date`.
    ///
    /// Default-currency postings are worth their booked amount; everything
    /// else is `quantity x unit price`, falling back to booked cost while the
    /// commodity is unvalued.
    pub fn market_price(&self, classifier: &Classifier<'_>, posting: &Posting, date: NaiveDate) -> Decimal {
        if classifier.is_currency(&posting.commodity) {
            return posting.amount;
        }
        match self.unit_price(&posting.commodity, date) {
            Some(unit) => posting.quantity * unit,
            None => posting.amount,
        }
    }

    /// Market value of a posting slice at `date`.
    ///
    /// Units are aggregated per commodity first so a priced commodity is
    /// re-valued as a whole instead of posting by posting.
    pub fn current_balance(
        &self,
        classifier: &Classifier<'_>,
        postings: &[Posting],
        date: NaiveDate,
    ) -> Decimal {
        let mut by_commodity: BTreeMap<&str, Vec<&Posting>> = BTreeMap::new();
        for posting in postings {
            by_commodity
                .entry(posting.commodity.as_str())
                .or_default()
                .push(posting);
        }

        let mut balance = Decimal::ZERO;
        for (commodity, group) in by_commodity {
            if classifier.is_currency(commodity) {
                balance += group.iter().map(|p| p.amount).sum::<Decimal>();
                continue;
            }
            match self.unit_price(commodity, date) {
                Some(unit) => {
                    let units: Decimal = group.iter().map(|p| p.quantity).sum();
                    balance += units * unit;
                }
                None => {
                    balance += group.iter().map(|p| p.amount).sum::<Decimal>();
                }
            }
        }
        balance
    }
}

/// Sum of booked amounts.
pub fn cost_sum(postings: &[Posting]) -> Decimal {
    postings.iter().map(|p| p.amount).sum()
}
