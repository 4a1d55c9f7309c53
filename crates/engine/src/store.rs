//! Posting/price persistence: snapshot load and the atomic journal rebuild.
//!
//! A rebuild replaces the `postings`, `transactions` and `prices` tables
//! inside one database transaction. Readers hold an `Arc` snapshot, so they
//! see either the old journal or the new one, never a partial merge.

use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

use crate::{
    ResultEngine,
    posting::{self, Posting},
    price::{self, Price, PriceIndex},
    transaction::{self, group_postings},
};

const INSERT_CHUNK: usize = 100;

/// Immutable view of one store version.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub postings: Arc<Vec<Posting>>,
    pub prices: PriceIndex,
    pub version: u64,
}

impl Snapshot {
    pub fn empty() -> Snapshot {
        Snapshot {
            postings: Arc::new(Vec::new()),
            prices: PriceIndex::default(),
            version: 0,
        }
    }
}

/// Parsed journal content handed over by the external ledger parser.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    pub postings: Vec<Posting>,
    pub prices: Vec<Price>,
}

/// Loads the canonical posting order: date ascending, ties broken by insert
/// order (transaction encounter order, then posting index).
pub(crate) async fn load_postings(db: &DatabaseConnection) -> ResultEngine<Vec<Posting>> {
    let models = posting::Entity::find()
        .order_by_asc(posting::Column::Date)
        .order_by_asc(posting::Column::Id)
        .all(db)
        .await?;
    models.into_iter().map(Posting::try_from).collect()
}

pub(crate) async fn load_prices(db: &DatabaseConnection) -> ResultEngine<Vec<Price>> {
    let models = price::Entity::find()
        .order_by_asc(price::Column::CommodityName)
        .order_by_asc(price::Column::Date)
        .all(db)
        .await?;
    models.into_iter().map(Price::try_from).collect()
}

pub(crate) async fn load_snapshot(
    db: &DatabaseConnection,
    version: u64,
) -> ResultEngine<Snapshot> {
    let postings = load_postings(db).await?;
    let prices = load_prices(db).await?;
    Ok(Snapshot {
        postings: Arc::new(postings),
        prices: PriceIndex::build(&prices),
        version,
    })
}

/// Parsers that do not carry transaction ids leave them empty; postings of
/// one transaction share a file position, so they get one generated id.
fn assign_transaction_ids(postings: &mut [Posting]) {
    let mut generated: HashMap<(String, u32), String> = HashMap::new();
    for posting in postings.iter_mut() {
        if !posting.transaction_id.is_empty() {
            continue;
        }
        let key = (posting.file_name.clone(), posting.transaction_begin_line);
        let id = generated
            .entry(key)
            .or_insert_with(|| uuid::Uuid::new_v4().to_string());
        posting.transaction_id = id.clone();
    }
}

/// One account keeps its first-seen commodity; a later change is almost
/// always a journal mistake, so say so.
fn warn_on_commodity_change(postings: &[Posting]) {
    let mut first_seen: HashMap<&str, &str> = HashMap::new();
    for posting in postings {
        let commodity = first_seen
            .entry(posting.account.as_str())
            .or_insert(posting.commodity.as_str());
        if *commodity != posting.commodity {
            tracing::warn!(
                account = posting.account,
                previous = *commodity,
                current = posting.commodity,
                "account changed commodity mid-journal; valuations use the first-seen commodity"
            );
        }
    }
}

async fn insert_postings(
    db_tx: &DatabaseTransaction,
    postings: &[Posting],
) -> ResultEngine<()> {
    for chunk in postings.chunks(INSERT_CHUNK) {
        let actives: Vec<posting::ActiveModel> = chunk.iter().map(Into::into).collect();
        posting::Entity::insert_many(actives).exec(db_tx).await?;
    }
    Ok(())
}

async fn insert_prices(db_tx: &DatabaseTransaction, prices: &[Price]) -> ResultEngine<()> {
    for chunk in prices.chunks(INSERT_CHUNK) {
        let actives: Vec<price::ActiveModel> = chunk.iter().map(Into::into).collect();
        price::Entity::insert_many(actives).exec(db_tx).await?;
    }
    Ok(())
}

/// Destructive rebuild from a freshly parsed journal.
pub(crate) async fn replace_journal(
    db: &DatabaseConnection,
    journal: &Journal,
) -> ResultEngine<()> {
    let mut postings = journal.postings.clone();
    assign_transaction_ids(&mut postings);
    // Stable sort keeps transaction encounter order within a day.
    postings.sort_by_key(|p| p.date);
    warn_on_commodity_change(&postings);

    let views = group_postings(&postings);

    let db_tx = db.begin().await?;

    posting::Entity::delete_many().exec(&db_tx).await?;
    transaction::Entity::delete_many().exec(&db_tx).await?;
    price::Entity::delete_many().exec(&db_tx).await?;

    insert_postings(&db_tx, &postings).await?;
    for chunk in views.chunks(INSERT_CHUNK) {
        let actives: Vec<transaction::ActiveModel> = chunk.iter().map(Into::into).collect();
        transaction::Entity::insert_many(actives).exec(&db_tx).await?;
    }
    insert_prices(&db_tx, &journal.prices).await?;

    db_tx.commit().await?;
    Ok(())
}

/// Replaces the stored price series of the given commodities.
pub(crate) async fn replace_prices(
    db: &DatabaseConnection,
    prices: &[Price],
) -> ResultEngine<()> {
    let names: Vec<String> = prices
        .iter()
        .map(|p| p.commodity_name.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let db_tx = db.begin().await?;
    price::Entity::delete_many()
        .filter(price::Column::CommodityName.is_in(names))
        .exec(&db_tx)
        .await?;
    insert_prices(&db_tx, prices).await?;
    db_tx.commit().await?;
    Ok(())
}
