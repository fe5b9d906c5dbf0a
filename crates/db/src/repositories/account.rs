//! Pool account primitives shared by the settlement repositories.
//!
//! Every balance change goes through the helpers here so that the
//! append-only flow ledger stays consistent with the balances it
//! mirrors.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, NotSet,
    QueryFilter, QuerySelect, Set,
};
use trellis_core::PoolAccount;
use trellis_shared::{AppError, AppResult};

use crate::entities::{account_flows, finance_accounts, sea_orm_active_enums::FlowType, users};
use crate::txn::map_db_err;

/// A flow ledger entry waiting to be appended.
#[derive(Debug, Clone)]
pub struct FlowEntry<'a> {
    /// Pool key or per-user balance field name.
    pub account_type: &'a str,
    /// User the flow concerns, if any.
    pub related_user: Option<i64>,
    /// Signed change amount.
    pub change_amount: Decimal,
    /// Direction tag.
    pub flow_type: FlowType,
    /// Free-text context for auditors.
    pub remark: String,
}

/// Reads a pool balance without locking.
pub(crate) async fn pool_balance<C: ConnectionTrait>(
    conn: &C,
    pool: PoolAccount,
) -> AppResult<Decimal> {
    let account = finance_accounts::Entity::find()
        .filter(finance_accounts::Column::AccountType.eq(pool.as_str()))
        .one(conn)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| AppError::NotFound(format!("pool account {pool}")))?;

    Ok(account.balance)
}

/// Credits a pool balance unconditionally.
pub(crate) async fn credit_pool<C: ConnectionTrait>(
    conn: &C,
    pool: PoolAccount,
    amount: Decimal,
) -> AppResult<()> {
    let result = finance_accounts::Entity::update_many()
        .col_expr(
            finance_accounts::Column::Balance,
            Expr::col(finance_accounts::Column::Balance).add(amount),
        )
        .filter(finance_accounts::Column::AccountType.eq(pool.as_str()))
        .exec(conn)
        .await
        .map_err(map_db_err)?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("pool account {pool}")));
    }
    Ok(())
}

/// Debits a pool balance after locking the row and verifying funds.
pub(crate) async fn debit_pool_checked<C: ConnectionTrait>(
    conn: &C,
    pool: PoolAccount,
    amount: Decimal,
) -> AppResult<()> {
    let account = finance_accounts::Entity::find()
        .filter(finance_accounts::Column::AccountType.eq(pool.as_str()))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| AppError::NotFound(format!("pool account {pool}")))?;

    if account.balance < amount {
        return Err(AppError::InsufficientFunds {
            account: pool.as_str().to_owned(),
            required: amount,
            available: account.balance,
        });
    }

    finance_accounts::Entity::update_many()
        .col_expr(
            finance_accounts::Column::Balance,
            Expr::col(finance_accounts::Column::Balance).sub(amount),
        )
        .filter(finance_accounts::Column::Id.eq(account.id))
        .exec(conn)
        .await
        .map_err(map_db_err)?;

    Ok(())
}

/// Appends an entry to the account flow ledger.
///
/// The `balance_after` snapshot is best-effort: flows against account
/// types that have no tracked balance (coupon issuance, withdrawal
/// payout) record `None`.
pub(crate) async fn record_flow<C: ConnectionTrait>(
    conn: &C,
    entry: FlowEntry<'_>,
) -> AppResult<()> {
    let balance_after = snapshot_balance(conn, entry.account_type, entry.related_user).await?;

    let flow = account_flows::ActiveModel {
        id: NotSet,
        account_type: Set(entry.account_type.to_owned()),
        related_user: Set(entry.related_user),
        change_amount: Set(entry.change_amount),
        balance_after: Set(balance_after),
        flow_type: Set(entry.flow_type),
        remark: Set(Some(entry.remark)),
        created_at: Set(Utc::now().into()),
    };
    flow.insert(conn).await.map_err(map_db_err)?;

    Ok(())
}

/// Resolves the post-change balance for a flow entry.
async fn snapshot_balance<C: ConnectionTrait>(
    conn: &C,
    account_type: &str,
    related_user: Option<i64>,
) -> AppResult<Option<Decimal>> {
    if let Some(user_id) = related_user {
        if account_type == "promotion_balance" || account_type == "merchant_balance" {
            let user = users::Entity::find_by_id(user_id)
                .one(conn)
                .await
                .map_err(map_db_err)?;
            return Ok(user.map(|u| {
                if account_type == "promotion_balance" {
                    u.promotion_balance
                } else {
                    u.merchant_balance
                }
            }));
        }
    }

    let account = finance_accounts::Entity::find()
        .filter(finance_accounts::Column::AccountType.eq(account_type))
        .one(conn)
        .await
        .map_err(map_db_err)?;

    Ok(account.map(|a| a.balance))
}

/// Read access to the platform pool accounts.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the current balance of one pool.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the pool row is missing.
    pub async fn balance(&self, pool: PoolAccount) -> AppResult<Decimal> {
        pool_balance(&self.db, pool).await
    }

    /// Lists every pool account with its balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self) -> AppResult<Vec<finance_accounts::Model>> {
        finance_accounts::Entity::find()
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }
}
