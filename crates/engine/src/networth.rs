//! Net-worth accumulators.
//!
//! Both folds require postings in canonical order (date ascending). The
//! timeline keeps one running sum per commodity and emits a record per day;
//! the current variant collapses the same stream into a single record.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    EngineError, ResultEngine,
    calendar::GroupDate,
    cancel::CancelToken,
    classify::Classifier,
    posting::Posting,
    valuation::Valuer,
};

/// One day (or the current instant) of net worth.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Networth {
    pub date: NaiveDate,
    pub investment_amount: Decimal,
    pub withdrawal_amount: Decimal,
    pub gain_amount: Decimal,
    pub balance_amount: Decimal,
    pub balance_units: Decimal,
    pub net_investment_amount: Decimal,
}

impl GroupDate for Networth {
    fn group_date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Default)]
struct RunningSum {
    investment: Decimal,
    withdrawal: Decimal,
    balance: Decimal,
    balance_units: Decimal,
}

/// Stop extending the timeline once the portfolio has fully exited.
fn exhausted(balance: Decimal) -> bool {
    balance.abs() < Decimal::new(1, 2)
}

/// Daily net-worth records from the first posting through end-of-today.
pub fn networth_timeline(
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    postings: &[Posting],
    today: NaiveDate,
    compute_balance_units: bool,
    cancel: &CancelToken,
) -> ResultEngine<Vec<Networth>> {
    let mut timeline = Vec::new();
    if postings.is_empty() {
        return Ok(timeline);
    }

    let mut accumulator: HashMap<&str, RunningSum> = HashMap::new();
    let mut remaining = postings.iter().peekable();

    let mut day = postings[0].date;
    while day <= today {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        while let Some(posting) = remaining.next_if(|p| p.date <= day) {
            if classifier.is_capital_gains(posting) {
                continue;
            }
            let rs = accumulator.entry(posting.commodity.as_str()).or_default();

            if classifier.is_interest(posting) {
                rs.balance += posting.amount;
                rs.balance_units += posting.quantity;
                continue;
            }
            if posting.amount > Decimal::ZERO {
                rs.investment += posting.amount;
            }
            if posting.amount < Decimal::ZERO {
                rs.withdrawal += -posting.amount;
            }
            rs.balance += valuer.market_price(classifier, posting, day);
            rs.balance_units += posting.quantity;
        }

        let mut record = Networth {
            date: day,
            ..Networth::default()
        };
        for (commodity, rs) in &accumulator {
            record.investment_amount += rs.investment;
            record.withdrawal_amount += rs.withdrawal;

            if classifier.is_currency(commodity) {
                record.balance_amount += rs.balance;
            } else {
                if compute_balance_units {
                    record.balance_units += rs.balance_units;
                }
                match valuer.unit_price(commodity, day) {
                    Some(unit) if !unit.is_zero() => {
                        record.balance_amount += rs.balance_units * unit;
                    }
                    _ => record.balance_amount += rs.balance,
                }
            }
        }
        record.gain_amount =
            record.balance_amount + record.withdrawal_amount - record.investment_amount;
        record.net_investment_amount = record.investment_amount - record.withdrawal_amount;

        let balance = record.balance_amount;
        timeline.push(record);

        if remaining.peek().is_none() && exhausted(balance) {
            break;
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    Ok(timeline)
}

/// Net worth as of `today`, as a single record.
pub fn current_networth(
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    postings: &[Posting],
    today: NaiveDate,
) -> Networth {
    let mut record = Networth {
        date: today,
        ..Networth::default()
    };
    if postings.is_empty() {
        return record;
    }

    for posting in postings {
        if classifier.is_interest(posting) || classifier.is_interest_repayment(posting) {
            record.balance_amount += posting.amount;
        } else if classifier.is_capital_gains(posting) {
            record.withdrawal_amount += -posting.amount;
        } else {
            let split = classifier.is_stock_split(posting);
            if posting.amount > Decimal::ZERO && !split {
                record.investment_amount += posting.amount;
            }
            if posting.amount < Decimal::ZERO && !split {
                record.withdrawal_amount += -posting.amount;
            }
            record.balance_amount += valuer.market_price(classifier, posting, today);
        }
    }

    record.gain_amount =
        record.balance_amount + record.withdrawal_amount - record.investment_amount;
    record.net_investment_amount = record.investment_amount - record.withdrawal_amount;
    record
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        config::{Config, CommodityType},
        posting::Status,
        price::{Price, PriceIndex},
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(
        txn: &str,
        on: NaiveDate,
        account: &str,
        commodity: &str,
        quantity: Decimal,
        amount: Decimal,
    ) -> Posting {
        Posting {
            id: 0,
            transaction_id: txn.to_string(),
            date: on,
            payee: String::new(),
            account: account.to_string(),
            commodity: commodity.to_string(),
            quantity,
            amount,
            status: Status::Unmarked,
            tag_recurring: None,
            forecast: false,
            transaction_begin_line: 0,
            transaction_end_line: 0,
            file_name: "main.ledger".to_string(),
        }
    }

    fn nifty_price(on: NaiveDate, value: Decimal) -> Price {
        Price {
            commodity_type: CommodityType::Mutualfund,
            commodity_id: "NIFTY".to_string(),
            commodity_name: "NIFTY".to_string(),
            date: on,
            value,
        }
    }

    #[test]
    fn invariants_hold_on_every_record() {
        let config = Config::default();
        let prices = PriceIndex::build(&[
            nifty_price(date(2024, 1, 1), dec!(100)),
            nifty_price(date(2024, 1, 5), dec!(120)),
        ]);
        let postings = vec![
            posting("t1", date(2024, 1, 1), "Assets:Equity:NIFTY", "NIFTY", dec!(10), dec!(1000)),
            posting("t2", date(2024, 1, 3), "Assets:Checking:HDFC", "INR", dec!(0), dec!(500)),
        ];
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);

        let timeline = networth_timeline(
            &classifier,
            valuer,
            &postings,
            date(2024, 1, 10),
            true,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(timeline.len(), 10);
        for record in &timeline {
            assert_eq!(
                record.net_investment_amount,
                record.investment_amount - record.withdrawal_amount
            );
            assert_eq!(
                record.gain_amount,
                record.balance_amount + record.withdrawal_amount - record.investment_amount
            );
        }
        // Day 5 onward the ten units re-value at 120.
        assert_eq!(timeline[4].balance_amount, dec!(1200) + dec!(500));
        assert_eq!(timeline[9].balance_units, dec!(10));
    }

    #[test]
    fn timeline_stops_after_full_exit() {
        let config = Config::default();
        let prices = PriceIndex::build(&[nifty_price(date(2024, 1, 1), dec!(100))]);
        let postings = vec![
            posting("t1", date(2024, 1, 1), "Assets:Equity:NIFTY", "NIFTY", dec!(10), dec!(1000)),
            posting("t2", date(2024, 1, 5), "Assets:Equity:NIFTY", "NIFTY", dec!(-10), dec!(-1000)),
        ];
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);

        let timeline = networth_timeline(
            &classifier,
            valuer,
            &postings,
            date(2024, 12, 31),
            false,
            &CancelToken::new(),
        )
        .unwrap();

        // Exited on day 5; the loop must not run to end-of-year.
        assert_eq!(timeline.last().unwrap().date, date(2024, 1, 5));
        assert!(exhausted(timeline.last().unwrap().balance_amount));
    }

    #[test]
    fn cancellation_propagates() {
        let config = Config::default();
        let prices = PriceIndex::default();
        let postings = vec![posting(
            "t1",
            date(2024, 1, 1),
            "Assets:Checking:HDFC",
            "INR",
            dec!(0),
            dec!(500),
        )];
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = networth_timeline(
            &classifier,
            valuer,
            &postings,
            date(2024, 1, 10),
            false,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn current_networth_books_capital_gains_as_withdrawal() {
        let config = Config::default();
        let prices = PriceIndex::default();
        let postings = vec![
            posting("t1", date(2024, 1, 1), "Assets:Equity:NIFTY", "NIFTY", dec!(10), dec!(1000)),
            posting("t2", date(2024, 6, 1), "Assets:Equity:NIFTY", "NIFTY", dec!(-10), dec!(-1500)),
            posting("t2", date(2024, 6, 1), "Income:CapitalGains:Equity:NIFTY", "INR", dec!(0), dec!(-500)),
        ];
        let classifier = Classifier::new(&config, &postings);
        let valuer = Valuer::new(&config, &prices);

        let record = current_networth(&classifier, valuer, &postings, date(2024, 6, 2));
        assert_eq!(record.investment_amount, dec!(1000));
        assert_eq!(record.withdrawal_amount, dec!(1500) + dec!(500));
    }
}
