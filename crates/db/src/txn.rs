//! Transaction helpers shared by the repositories.
//!
//! Every settlement operation runs inside a single database transaction
//! with a bounded lock wait. Rather than blocking indefinitely on a row
//! that another settlement holds, the transaction sets a local
//! `lock_timeout` so a contended lock surfaces as [`AppError::Busy`] and
//! the caller can retry.

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionTrait};
use trellis_shared::{AppError, AppResult};

/// Begins a transaction with a bounded lock wait.
///
/// # Errors
///
/// Returns [`AppError::Database`] if the transaction cannot be started.
pub async fn begin(
    db: &DatabaseConnection,
    lock_wait_timeout_ms: u64,
) -> AppResult<DatabaseTransaction> {
    let txn = db.begin().await.map_err(map_db_err)?;
    // SET LOCAL scopes the timeout to this transaction only.
    txn.execute_unprepared(&format!("SET LOCAL lock_timeout = '{lock_wait_timeout_ms}ms'"))
        .await
        .map_err(map_db_err)?;
    Ok(txn)
}

/// Translates a `SeaORM` error into the application error space.
///
/// Unique constraint violations become [`AppError::InvalidState`] (a
/// record that must not exist twice already does), lock timeouts and
/// deadlocks become the retryable [`AppError::Busy`], everything else
/// is opaque [`AppError::Database`].
pub fn map_db_err(err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return AppError::InvalidState(format!("duplicate record: {detail}"));
    }

    let message = err.to_string();
    // Unique violations surfaced outside the structured sqlx path (e.g.
    // through a raw statement) still carry the Postgres message.
    if message.contains("duplicate key") || message.contains("23505") {
        return AppError::InvalidState(format!("duplicate record: {message}"));
    }
    if message.contains("lock timeout")
        || message.contains("deadlock detected")
        || message.contains("55P03")
        || message.contains("40P01")
    {
        return AppError::Busy(message);
    }

    AppError::Database(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sea_orm::RuntimeErr;

    /// Stand-in for the Postgres duplicate-key error on a unique index.
    #[derive(Debug)]
    struct DuplicateKey;

    impl fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("duplicate key value violates unique constraint \"orders_order_no_key\"")
        }
    }

    impl StdError for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint \"orders_order_no_key\""
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_maps_to_invalid_state() {
        // Settling the same order number twice trips the unique index on
        // orders.order_no and must surface as InvalidState, not Database.
        let err = DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(Box::new(
            DuplicateKey,
        ))));
        let mapped = map_db_err(err);
        assert!(matches!(mapped, AppError::InvalidState(_)));
        assert!(!mapped.is_retryable());
    }

    #[test]
    fn duplicate_key_message_maps_to_invalid_state() {
        let err = DbErr::Custom(
            "duplicate key value violates unique constraint \"user_referrals_user_id_key\"".into(),
        );
        assert!(matches!(map_db_err(err), AppError::InvalidState(_)));
    }

    #[test]
    fn lock_timeout_maps_to_busy() {
        let err = DbErr::Custom("canceling statement due to lock timeout".into());
        let mapped = map_db_err(err);
        assert!(matches!(mapped, AppError::Busy(_)));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn deadlock_maps_to_busy() {
        let err = DbErr::Custom("deadlock detected".into());
        assert!(matches!(map_db_err(err), AppError::Busy(_)));
    }

    #[test]
    fn other_errors_map_to_database() {
        let err = DbErr::Custom("connection reset".into());
        let mapped = map_db_err(err);
        assert!(matches!(mapped, AppError::Database(_)));
        assert!(!mapped.is_retryable());
    }
}
