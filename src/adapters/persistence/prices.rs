//! SeaORM Entity for the `prices` observation table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "prices")]
pub struct Model {
    /// Cycle timestamp (second precision)
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeWithTimeZone,
    /// Token name, at most 10 characters
    #[sea_orm(primary_key, auto_increment = false)]
    pub token_name: String,
    /// Network name
    #[sea_orm(primary_key, auto_increment = false)]
    pub network: String,
    /// Issuer rate (true) or aggregator quote (false)
    #[sea_orm(primary_key, auto_increment = false)]
    pub is_primary_market: bool,
    /// Price in the network's reference asset
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub price_eth: Decimal,
    /// Fiat price, never populated by the fetcher
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub price_usd: Option<Decimal>,
    /// Signed premium over the primary rate
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub premium: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
