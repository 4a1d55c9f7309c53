pub use sea_orm_migration::prelude::*;

mod m20240114_090000_postings;
mod m20240114_090500_transactions;
mod m20240114_091000_prices;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240114_090000_postings::Migration),
            Box::new(m20240114_090500_transactions::Migration),
            Box::new(m20240114_091000_prices::Migration),
        ]
    }
}
