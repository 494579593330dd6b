use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(create_prices_table()).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Prices::Table).to_owned())
            .await
    }
}

/// One row per (cycle timestamp, token, network, market side).
fn create_prices_table() -> TableCreateStatement {
    Table::create()
        .table(Prices::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Prices::Timestamp)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(ColumnDef::new(Prices::TokenName).string_len(10).not_null())
        .col(ColumnDef::new(Prices::Network).string_len(20).not_null())
        .col(ColumnDef::new(Prices::IsPrimaryMarket).boolean().not_null())
        .col(ColumnDef::new(Prices::PriceEth).decimal_len(38, 18).not_null())
        .col(ColumnDef::new(Prices::PriceUsd).decimal_len(16, 2).null())
        .col(ColumnDef::new(Prices::Premium).decimal_len(38, 18).not_null())
        .primary_key(
            Index::create()
                .name("pk_prices")
                .col(Prices::Timestamp)
                .col(Prices::TokenName)
                .col(Prices::Network)
                .col(Prices::IsPrimaryMarket),
        )
        .to_owned()
}

#[derive(DeriveIden)]
enum Prices {
    Table,
    Timestamp,
    TokenName,
    Network,
    IsPrimaryMarket,
    PriceEth,
    PriceUsd,
    Premium,
}
