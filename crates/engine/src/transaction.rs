//! Transactions: provenance rows plus the derived view grouping postings.

use chrono::NaiveDate;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;

use crate::posting::Posting;

/// Postings grouped by transaction id, preserving first-encounter order of
/// both transactions and their postings.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    pub date: NaiveDate,
    pub payee: String,
    pub begin_line: u32,
    pub end_line: u32,
    pub file_name: String,
    pub postings: Vec<Posting>,
}

pub fn group_postings(postings: &[Posting]) -> Vec<TransactionView> {
    let mut views: Vec<TransactionView> = Vec::new();
    for posting in postings {
        match views
            .iter_mut()
            .find(|view| view.id == posting.transaction_id)
        {
            Some(view) => view.postings.push(posting.clone()),
            None => views.push(TransactionView {
                id: posting.transaction_id.clone(),
                date: posting.date,
                payee: posting.payee.clone(),
                begin_line: posting.transaction_begin_line,
                end_line: posting.transaction_end_line,
                file_name: posting.file_name.clone(),
                postings: vec![posting.clone()],
            }),
        }
    }
    views
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub date: Date,
    pub payee: String,
    pub begin_line: i64,
    pub end_line: i64,
    pub file_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TransactionView> for ActiveModel {
    fn from(view: &TransactionView) -> Self {
        Self {
            id: ActiveValue::Set(view.id.clone()),
            date: ActiveValue::Set(view.date),
            payee: ActiveValue::Set(view.payee.clone()),
            begin_line: ActiveValue::Set(i64::from(view.begin_line)),
            end_line: ActiveValue::Set(i64::from(view.end_line)),
            file_name: ActiveValue::Set(view.file_name.clone()),
        }
    }
}
