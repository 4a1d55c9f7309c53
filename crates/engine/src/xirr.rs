//! Annualized internal rate of return over irregular cash flows.
//!
//! The solver works in `f64` and converts back to `Decimal` at the boundary;
//! everything upstream and downstream of it stays exact.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::{classify::Classifier, posting::Posting, valuation::Valuer};

const TOLERANCE: f64 = 1e-6;
const MAX_ITERATIONS: u32 = 100;
const BISECT_LOW: f64 = -0.9999;
const BISECT_HIGH: f64 = 10.0;

/// One dated cash flow: negative = invested, positive = returned.
pub type Flow = (NaiveDate, Decimal);

/// Solves `sum cf_i / (1+r)^(days_i/365) = 0` for the annualized rate `r`.
///
/// Newton-Raphson with the analytic derivative, falling back to bisection
/// over `[-0.9999, 10]` when it fails to converge. Returns zero for fewer
/// than two flows or when every flow has the same sign.
pub fn xirr(flows: &[Flow]) -> Decimal {
    if flows.len() < 2 {
        return Decimal::ZERO;
    }
    let has_negative = flows.iter().any(|(_, cf)| cf.is_sign_negative() && !cf.is_zero());
    let has_positive = flows.iter().any(|(_, cf)| cf.is_sign_positive() && !cf.is_zero());
    if !has_negative || !has_positive {
        return Decimal::ZERO;
    }

    let epoch = flows
        .iter()
        .map(|(date, _)| *date)
        .min()
        .unwrap_or(flows[0].0);
    let terms: Vec<(f64, f64)> = flows
        .iter()
        .map(|(date, cf)| {
            let years = (*date - epoch).num_days() as f64 / 365.0;
            (years, cf.to_f64().unwrap_or(0.0))
        })
        .collect();

    let rate = newton(&terms).or_else(|| bisect(&terms)).unwrap_or(0.0);
    Decimal::from_f64(rate).unwrap_or(Decimal::ZERO).round_dp(6)
}

/// XIRR of a posting slice: one flow per posting (booked amount, sign
/// flipped) plus a terminal flow at today's market value of the holdings,
/// capital gains excluded from the valuation.
pub fn postings_xirr(
    classifier: &Classifier<'_>,
    valuer: Valuer<'_>,
    postings: &[Posting],
    today: NaiveDate,
) -> Decimal {
    let without_capital_gains: Vec<Posting> = postings
        .iter()
        .filter(|p| !classifier.is_capital_gains(p))
        .cloned()
        .collect();
    let market = valuer.current_balance(classifier, &without_capital_gains, today);

    let mut flows: Vec<Flow> = postings.iter().map(|p| (p.date, -p.amount)).collect();
    if !market.is_zero() {
        flows.push((today, market));
    }
    xirr(&flows)
}

fn npv(terms: &[(f64, f64)], rate: f64) -> f64 {
    terms
        .iter()
        .map(|(years, cf)| cf / (1.0 + rate).powf(*years))
        .sum()
}

fn npv_derivative(terms: &[(f64, f64)], rate: f64) -> f64 {
    terms
        .iter()
        .map(|(years, cf)| -years * cf / (1.0 + rate).powf(years + 1.0))
        .sum()
}

fn newton(terms: &[(f64, f64)]) -> Option<f64> {
    let mut rate = 0.1;
    for _ in 0..MAX_ITERATIONS {
        let value = npv(terms, rate);
        if value.abs() < TOLERANCE {
            return Some(rate);
        }
        let derivative = npv_derivative(terms, rate);
        if derivative == 0.0 || !derivative.is_finite() {
            return None;
        }
        let next = rate - value / derivative;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        rate = next;
    }
    None
}

fn bisect(terms: &[(f64, f64)]) -> Option<f64> {
    let mut low = BISECT_LOW;
    let mut high = BISECT_HIGH;
    let mut f_low = npv(terms, low);
    let f_high = npv(terms, high);
    if f_low * f_high > 0.0 {
        return None;
    }
    for _ in 0..MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let f_mid = npv(terms, mid);
        if f_mid.abs() < TOLERANCE {
            return Some(mid);
        }
        if f_low * f_mid < 0.0 {
            high = mid;
        } else {
            low = mid;
            f_low = f_mid;
        }
    }
    Some((low + high) / 2.0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use rust_decimal_macros::dec;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn flat_portfolio_has_zero_rate() {
        let flows = vec![
            (date(2023, 1, 1), dec!(-1000)),
            (date(2024, 1, 1), dec!(1000)),
        ];
        assert_eq!(xirr(&flows), dec!(0));
    }

    #[test]
    fn doubling_in_one_year_is_one() {
        let flows = vec![
            (date(2023, 1, 1), dec!(-1000)),
            (date(2024, 1, 1), dec!(2000)),
        ];
        let rate = xirr(&flows).to_f64().unwrap();
        assert!((rate - 1.0).abs() < 1e-2, "rate = {rate}");
    }

    #[test]
    fn fewer_than_two_flows_is_zero() {
        assert_eq!(xirr(&[]), dec!(0));
        assert_eq!(xirr(&[(date(2024, 1, 1), dec!(-1000))]), dec!(0));
    }

    #[test]
    fn same_signed_flows_are_zero() {
        let flows = vec![
            (date(2023, 1, 1), dec!(-1000)),
            (date(2024, 1, 1), dec!(-500)),
        ];
        assert_eq!(xirr(&flows), dec!(0));
    }

    #[test]
    fn deep_loss_falls_back_to_bisection() {
        // Newton from 0.1 diverges below -1 on near-total losses.
        let flows = vec![
            (date(2023, 1, 1), dec!(-1000)),
            (date(2024, 1, 1), dec!(1)),
        ];
        let rate = xirr(&flows).to_f64().unwrap();
        assert!(rate < -0.9, "rate = {rate}");
    }
}
