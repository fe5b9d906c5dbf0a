//! Database layer with `SeaORM` entities and settlement repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the settlement ledger
//! - Repository abstractions implementing the settlement operations
//! - Connection pool setup and transaction helpers

pub mod entities;
pub mod repositories;
pub mod txn;

pub use repositories::{
    AccountRepository, ReferralRepository, ReportRepository, RewardRepository,
    SettlementRepository, SubsidyRepository, WithdrawalRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use trellis_shared::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    Database::connect(options).await
}
