use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Prices {
    Table,
    Id,
    CommodityType,
    CommodityId,
    CommodityName,
    Date,
    Value,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Prices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Prices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Prices::CommodityType).string().not_null())
                    .col(ColumnDef::new(Prices::CommodityId).string().not_null())
                    .col(ColumnDef::new(Prices::CommodityName).string().not_null())
                    .col(ColumnDef::new(Prices::Date).date().not_null())
                    .col(ColumnDef::new(Prices::Value).decimal_len(28, 8).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-prices-commodity_id-date")
                    .table(Prices::Table)
                    .col(Prices::CommodityId)
                    .col(Prices::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Prices::Table).to_owned())
            .await
    }
}
