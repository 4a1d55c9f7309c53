//! Market prices and the time-indexed lookup every valuation goes through.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, config::CommodityType};

/// A unit-price observation for a commodity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub commodity_type: CommodityType,
    pub commodity_id: String,
    pub commodity_name: String,
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Name of the exchange-pair series converting `from` into `to`,
/// e.g. `USDINR=X`.
pub fn pair_name(from: &str, to: &str) -> String {
    format!("{from}{to}=X")
}

/// Price series per commodity name, ordered by date.
///
/// Lookup is "greatest record with `date <= t`"; a commodity with no record
/// at or before `t` is unvalued and callers fall back to booked cost.
#[derive(Clone, Debug, Default)]
pub struct PriceIndex {
    series: BTreeMap<String, BTreeMap<NaiveDate, Decimal>>,
}

impl PriceIndex {
    pub fn build(prices: &[Price]) -> Self {
        let mut series: BTreeMap<String, BTreeMap<NaiveDate, Decimal>> = BTreeMap::new();
        for price in prices {
            series
                .entry(price.commodity_name.clone())
                .or_default()
                .insert(price.date, price.value);
        }
        PriceIndex { series }
    }

    /// Unit price of `commodity` at the greatest date `<= date`.
    pub fn unit_price(&self, commodity: &str, date: NaiveDate) -> Option<Decimal> {
        self.series
            .get(commodity)?
            .range(..=date)
            .next_back()
            .map(|(_, value)| *value)
    }

    /// Exchange rate `from -> to` at the greatest date `<= date`, read from
    /// the `<FROM><TO>=X` pair series.
    pub fn exchange_rate(&self, from: &str, to: &str, date: NaiveDate) -> Option<Decimal> {
        self.unit_price(&pair_name(from, to), date)
    }

    pub fn has_series(&self, commodity: &str) -> bool {
        self.series.contains_key(commodity)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "prices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub commodity_type: String,
    pub commodity_id: String,
    pub commodity_name: String,
    pub date: Date,
    pub value: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Price {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let commodity_type =
            CommodityType::try_from(model.commodity_type.as_str()).map_err(|()| {
                EngineError::DbCorruption(format!(
                    "invalid commodity type: {}",
                    model.commodity_type
                ))
            })?;
        Ok(Price {
            commodity_type,
            commodity_id: model.commodity_id,
            commodity_name: model.commodity_name,
            date: model.date,
            value: model.value,
        })
    }
}

impl From<&Price> for ActiveModel {
    fn from(price: &Price) -> Self {
        Self {
            id: ActiveValue::NotSet,
            commodity_type: ActiveValue::Set(price.commodity_type.as_str().to_string()),
            commodity_id: ActiveValue::Set(price.commodity_id.clone()),
            commodity_name: ActiveValue::Set(price.commodity_name.clone()),
            date: ActiveValue::Set(price.date),
            value: ActiveValue::Set(price.value),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use rust_decimal_macros::dec;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn price(name: &str, on: NaiveDate, value: Decimal) -> Price {
        Price {
            commodity_type: CommodityType::Stock,
            commodity_id: name.to_string(),
            commodity_name: name.to_string(),
            date: on,
            value,
        }
    }

    #[test]
    fn lookup_is_descending_less_or_equal() {
        let index = PriceIndex::build(&[
            price("NIFTY", date(2024, 1, 10), dec!(100)),
            price("NIFTY", date(2024, 2, 10), dec!(110)),
            price("NIFTY", date(2024, 3, 10), dec!(120)),
        ]);

        assert_eq!(index.unit_price("NIFTY", date(2024, 2, 10)), Some(dec!(110)));
        assert_eq!(index.unit_price("NIFTY", date(2024, 2, 11)), Some(dec!(110)));
        assert_eq!(index.unit_price("NIFTY", date(2024, 9, 1)), Some(dec!(120)));
    }

    #[test]
    fn lookup_before_first_record_is_none() {
        let index = PriceIndex::build(&[price("NIFTY", date(2024, 1, 10), dec!(100))]);
        assert_eq!(index.unit_price("NIFTY", date(2024, 1, 9)), None);
        assert_eq!(index.unit_price("GOLD", date(2024, 1, 10)), None);
    }

    #[test]
    fn exchange_rate_reads_pair_series() {
        let index = PriceIndex::build(&[price("USDINR=X", date(2024, 1, 1), dec!(83))]);
        assert_eq!(
            index.exchange_rate("USD", "INR", date(2024, 6, 1)),
            Some(dec!(83))
        );
    }
}
