//! Postgres Sink - `prices` Table via SeaORM
//!
//! Connects once at startup, applies the embedded migrations, then inserts
//! one row per observation. The composite primary key enforces the natural
//! key; a unique violation is reported as `DuplicateObservation`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait, Set, SqlErr};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, instrument};

use crate::domain::error::PriceError;
use crate::domain::observation::PriceObservation;
use crate::ports::sink::ObservationSink;

use super::migration::Migrator;
use super::prices;

/// Observation store backed by Postgres.
pub struct PostgresSink {
    db: DatabaseConnection,
}

impl PostgresSink {
    /// Connect to `database_url` and bring the schema up to date.
    ///
    /// # Errors
    /// Fails if the database is unreachable or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .max_connections(4)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        info!("Connecting to database...");
        let db = Database::connect(options)
            .await
            .context("Failed to connect to database")?;

        info!("Running migrations...");
        Migrator::up(&db, None)
            .await
            .context("Failed to run migrations")?;

        Ok(Self { db })
    }
}

/// Map an observation onto a `prices` row.
pub fn to_active_model(observation: &PriceObservation) -> prices::ActiveModel {
    prices::ActiveModel {
        timestamp: Set(observation.timestamp.fixed_offset()),
        token_name: Set(observation.token.clone()),
        network: Set(observation.network.clone()),
        is_primary_market: Set(observation.is_primary_market),
        price_eth: Set(observation.price),
        price_usd: Set(observation.price_fiat),
        premium: Set(observation.premium),
    }
}

fn classify(err: &DbErr, observation: &PriceObservation) -> PriceError {
    classify_sql(err.sql_err(), || err.to_string(), observation)
}

/// Unique violations on the natural key become `DuplicateObservation`.
fn classify_sql(
    sql_err: Option<SqlErr>,
    message: impl FnOnce() -> String,
    observation: &PriceObservation,
) -> PriceError {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            PriceError::DuplicateObservation(observation.key().to_string())
        }
        _ => PriceError::SinkFailure(message()),
    }
}

#[async_trait]
impl ObservationSink for PostgresSink {
    #[instrument(skip(self, observation), fields(key = %observation.key()))]
    async fn persist(&self, observation: &PriceObservation) -> Result<(), PriceError> {
        prices::Entity::insert(to_active_model(observation))
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| classify(&e, observation))?;

        debug!("Observation inserted");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.db.ping().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue;

    use super::*;

    #[test]
    fn test_maps_observation_to_row() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let obs = PriceObservation::secondary(ts, "wstETH", "arbitrum", dec!(1.16), dec!(-0.002));
        let row = to_active_model(&obs);

        assert_eq!(row.token_name, ActiveValue::Set("wstETH".to_string()));
        assert_eq!(row.is_primary_market, ActiveValue::Set(false));
        assert_eq!(row.price_eth, ActiveValue::Set(dec!(1.16)));
        assert_eq!(row.price_usd, ActiveValue::Set(None));
        assert_eq!(row.timestamp, ActiveValue::Set(ts.fixed_offset()));
    }

    #[test]
    fn test_generic_db_error_is_sink_failure() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let obs = PriceObservation::primary(ts, "rETH", "ethereum", dec!(1.05));
        let err = classify(&DbErr::Custom("connection reset".into()), &obs);
        assert!(matches!(err, PriceError::SinkFailure(msg) if msg.contains("connection reset")));
    }

    #[test]
    fn test_unique_violation_is_duplicate_observation() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let obs = PriceObservation::secondary(ts, "rETH", "base", dec!(1.09), dec!(0.003));
        let violation = SqlErr::UniqueConstraintViolation(
            "duplicate key value violates unique constraint \"pk_prices\"".into(),
        );

        let err = classify_sql(Some(violation), || "unused".into(), &obs);
        match err {
            PriceError::DuplicateObservation(key) => {
                assert_eq!(key, obs.key().to_string());
                assert!(key.starts_with("rETH/base/secondary@2024-03-01T12:00:00"), "key was {key}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let foreign_key = SqlErr::ForeignKeyConstraintViolation("fk_prices_token".into());
        let err = classify_sql(Some(foreign_key), || "fk".into(), &obs);
        assert_eq!(err.kind(), "sink_failure");
    }
}
