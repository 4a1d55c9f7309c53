use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Postings {
    Table,
    Id,
    TransactionId,
    Date,
    Payee,
    Account,
    Commodity,
    Quantity,
    Amount,
    Status,
    TagRecurring,
    Forecast,
    TransactionBeginLine,
    TransactionEndLine,
    FileName,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Postings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Postings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Postings::TransactionId).string().not_null())
                    .col(ColumnDef::new(Postings::Date).date().not_null())
                    .col(ColumnDef::new(Postings::Payee).string().not_null())
                    .col(ColumnDef::new(Postings::Account).string().not_null())
                    .col(ColumnDef::new(Postings::Commodity).string().not_null())
                    .col(
                        ColumnDef::new(Postings::Quantity)
                            .decimal_len(28, 8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Postings::Amount)
                            .decimal_len(28, 8)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Postings::Status).string().not_null())
                    .col(ColumnDef::new(Postings::TagRecurring).string())
                    .col(
                        ColumnDef::new(Postings::Forecast)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Postings::TransactionBeginLine)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Postings::TransactionEndLine)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Postings::FileName).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-postings-account")
                    .table(Postings::Table)
                    .col(Postings::Account)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-postings-date")
                    .table(Postings::Table)
                    .col(Postings::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Postings::Table).to_owned())
            .await
    }
}
