//! Postings, the atomic unit every report builds on.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, calendar::GroupDate};

/// Clearing status of a posting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unmarked,
    Pending,
    Cleared,
}

impl Status {
    /// String representation used in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unmarked => "unmarked",
            Self::Pending => "pending",
            Self::Cleared => "cleared",
        }
    }
}

impl TryFrom<&str> for Status {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unmarked" => Ok(Self::Unmarked),
            "pending" => Ok(Self::Pending),
            "cleared" => Ok(Self::Cleared),
            _ => Err(()),
        }
    }
}

/// One line of a double-entry transaction.
///
/// `amount` is the booked cost in the default currency. For default-currency
/// postings `quantity` is zero; otherwise `amount / quantity` is the implied
/// per-unit price at booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub id: i64,
    pub transaction_id: String,
    pub date: NaiveDate,
    pub payee: String,
    pub account: String,
    pub commodity: String,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub status: Status,
    pub tag_recurring: Option<String>,
    pub forecast: bool,
    pub transaction_begin_line: u32,
    pub transaction_end_line: u32,
    pub file_name: String,
}

impl GroupDate for Posting {
    fn group_date(&self) -> NaiveDate {
        self.date
    }
}

/// `true` when `account` is `parent` itself or lies under it at a colon
/// boundary; `Assets:Equity` is a parent of `Assets:Equity:NIFTY` but not of
/// `Assets:EquityFund`.
pub fn is_same_or_parent(account: &str, parent: &str) -> bool {
    account == parent
        || account
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// The account one level up, if any.
pub fn parent_account(account: &str) -> Option<&str> {
    account.rsplit_once(':').map(|(parent, _)| parent)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "postings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub transaction_id: String,
    pub date: Date,
    pub payee: String,
    pub account: String,
    pub commodity: String,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub status: String,
    pub tag_recurring: Option<String>,
    pub forecast: bool,
    pub transaction_begin_line: i64,
    pub transaction_end_line: i64,
    pub file_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Posting {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let status = Status::try_from(model.status.as_str()).map_err(|()| {
            EngineError::DbCorruption(format!("invalid posting status: {}", model.status))
        })?;
        Ok(Posting {
            id: model.id,
            transaction_id: model.transaction_id,
            date: model.date,
            payee: model.payee,
            account: model.account,
            commodity: model.commodity,
            quantity: model.quantity,
            amount: model.amount,
            status,
            tag_recurring: model.tag_recurring,
            forecast: model.forecast,
            transaction_begin_line: model.transaction_begin_line as u32,
            transaction_end_line: model.transaction_end_line as u32,
            file_name: model.file_name,
        })
    }
}

impl From<&Posting> for ActiveModel {
    fn from(posting: &Posting) -> Self {
        Self {
            id: ActiveValue::NotSet,
            transaction_id: ActiveValue::Set(posting.transaction_id.clone()),
            date: ActiveValue::Set(posting.date),
            payee: ActiveValue::Set(posting.payee.clone()),
            account: ActiveValue::Set(posting.account.clone()),
            commodity: ActiveValue::Set(posting.commodity.clone()),
            quantity: ActiveValue::Set(posting.quantity),
            amount: ActiveValue::Set(posting.amount),
            status: ActiveValue::Set(posting.status.as_str().to_string()),
            tag_recurring: ActiveValue::Set(posting.tag_recurring.clone()),
            forecast: ActiveValue::Set(posting.forecast),
            transaction_begin_line: ActiveValue::Set(i64::from(posting.transaction_begin_line)),
            transaction_end_line: ActiveValue::Set(i64::from(posting.transaction_end_line)),
            file_name: ActiveValue::Set(posting.file_name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parent_matching_respects_colon_boundary() {
        assert!(is_same_or_parent("Assets:Equity", "Assets:Equity"));
        assert!(is_same_or_parent("Assets:Equity:NIFTY", "Assets:Equity"));
        assert!(is_same_or_parent("Assets:Equity:NIFTY", "Assets"));
        assert!(!is_same_or_parent("Assets:EquityFund", "Assets:Equity"));
        assert!(!is_same_or_parent("Assets", "Assets:Equity"));
    }

    #[test]
    fn parent_account_strips_one_level() {
        assert_eq!(parent_account("Assets:Equity:NIFTY"), Some("Assets:Equity"));
        assert_eq!(parent_account("Assets"), None);
    }
}
