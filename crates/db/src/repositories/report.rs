//! Read-only reporting queries.
//!
//! Pass-through projections over the ledger; no balances are mutated
//! here. Rendering is the caller's concern, so everything is returned as
//! plain typed values.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement, Value,
};
use trellis_core::types::user_status;
use trellis_core::PoolAccount;
use trellis_shared::{AppError, AppResult};

use crate::entities::{
    account_flows, coupons, finance_accounts, points_logs, users,
    sea_orm_active_enums::CouponStatus,
};
use crate::repositories::account;
use crate::txn::map_db_err;

/// User profile with asset balances and an unused-coupon summary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserInfo {
    /// User id.
    pub id: i64,
    /// Registered mobile number.
    pub mobile: String,
    /// Display name.
    pub name: String,
    /// Current member level.
    pub member_level: i16,
    /// True for promoted honor directors.
    pub honor_director: bool,
    /// Member point balance.
    pub points: i64,
    /// Cash reward balance.
    pub promotion_balance: Decimal,
    /// Merchant point balance.
    pub merchant_points: i64,
    /// Merchant cash balance.
    pub merchant_balance: Decimal,
    /// Number of unused coupons.
    pub unused_coupons: u64,
    /// Total face value of unused coupons.
    pub unused_coupon_amount: Decimal,
}

/// Aggregate totals over a public-welfare period.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WelfareSummary {
    /// Flow entries in the period.
    pub total_transactions: u64,
    /// Income flows summed.
    pub total_income: Decimal,
    /// Expense flows summed.
    pub total_expense: Decimal,
}

/// Public-welfare period report: summary plus the raw flow entries.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WelfareReport {
    /// Period totals.
    pub summary: WelfareSummary,
    /// Flow entries in the period, newest first.
    pub details: Vec<account_flows::Model>,
}

#[derive(FromQueryResult)]
struct CouponSummaryRow {
    count: i64,
    total_amount: Option<Decimal>,
}

#[derive(FromQueryResult)]
struct WelfareSummaryRow {
    total_transactions: i64,
    total_income: Option<Decimal>,
    total_expense: Option<Decimal>,
}

/// Platform-wide outstanding liabilities held by users and merchants.
#[derive(Debug, Clone, serde::Serialize, FromQueryResult)]
pub struct AssetTotals {
    /// Sum of all member point balances.
    pub total_points: i64,
    /// Sum of all promotion (reward) balances.
    pub total_promotion_balance: Decimal,
    /// Sum of all merchant point balances.
    pub total_merchant_points: i64,
    /// Sum of all merchant cash balances.
    pub total_merchant_balance: Decimal,
}

/// Full finance snapshot: pool balances plus user/merchant asset totals.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FinanceReport {
    /// Pool accounts with a positive balance.
    pub pools: Vec<finance_accounts::Model>,
    /// Outstanding user and merchant assets.
    pub assets: AssetTotals,
}

/// Read-only reporting queries over the ledger.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns a user's profile with balances and coupon summary.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user.
    pub async fn get_user_info(&self, user_id: i64) -> AppResult<UserInfo> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let sql = r"
            SELECT COUNT(*) AS count, SUM(amount) AS total_amount
            FROM coupons WHERE user_id = $1 AND status = 'unused'";
        let summary = CouponSummaryRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            [Value::from(user_id)],
        ))
        .one(&self.db)
        .await
        .map_err(map_db_err)?;

        let (unused_coupons, unused_coupon_amount) = summary.map_or((0, Decimal::ZERO), |s| {
            (
                u64::try_from(s.count).unwrap_or(0),
                s.total_amount.unwrap_or(Decimal::ZERO),
            )
        });

        Ok(UserInfo {
            id: user.id,
            mobile: user.mobile,
            name: user.name,
            member_level: user.member_level,
            honor_director: user.status == user_status::HONOR_DIRECTOR,
            points: user.points,
            promotion_balance: user.promotion_balance,
            merchant_points: user.merchant_points,
            merchant_balance: user.merchant_balance,
            unused_coupons,
            unused_coupon_amount,
        })
    }

    /// Lists a user's coupons in one status, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_user_coupons(
        &self,
        user_id: i64,
        status: CouponStatus,
    ) -> AppResult<Vec<coupons::Model>> {
        coupons::Entity::find()
            .filter(coupons::Column::UserId.eq(user_id))
            .filter(coupons::Column::Status.eq(status))
            .order_by_desc(coupons::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Current public-welfare fund balance.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the pool row is missing.
    pub async fn get_public_welfare_balance(&self) -> AppResult<Decimal> {
        account::pool_balance(&self.db, PoolAccount::PublicWelfare).await
    }

    /// Recent public-welfare flow entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_public_welfare_flow(
        &self,
        limit: u64,
    ) -> AppResult<Vec<account_flows::Model>> {
        account_flows::Entity::find()
            .filter(account_flows::Column::AccountType.eq(PoolAccount::PublicWelfare.as_str()))
            .order_by_desc(account_flows::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Public-welfare activity over a date range (inclusive).
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn get_public_welfare_report(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<WelfareReport> {
        let sql = r"
            SELECT COUNT(*) AS total_transactions,
                   SUM(CASE WHEN flow_type = 'income' THEN change_amount ELSE 0 END) AS total_income,
                   SUM(CASE WHEN flow_type = 'expense' THEN change_amount ELSE 0 END) AS total_expense
            FROM account_flows
            WHERE account_type = 'public_welfare'
              AND created_at::date BETWEEN $1 AND $2";
        let summary = WelfareSummaryRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            [Value::from(start_date), Value::from(end_date)],
        ))
        .one(&self.db)
        .await
        .map_err(map_db_err)?;

        let summary = summary.map_or(
            WelfareSummary {
                total_transactions: 0,
                total_income: Decimal::ZERO,
                total_expense: Decimal::ZERO,
            },
            |s| WelfareSummary {
                total_transactions: u64::try_from(s.total_transactions).unwrap_or(0),
                total_income: s.total_income.unwrap_or(Decimal::ZERO),
                total_expense: s.total_expense.unwrap_or(Decimal::ZERO),
            },
        );

        let details_sql = r"
            SELECT * FROM account_flows
            WHERE account_type = 'public_welfare'
              AND created_at::date BETWEEN $1 AND $2
            ORDER BY created_at DESC";
        let details = account_flows::Model::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            details_sql,
            [Value::from(start_date), Value::from(end_date)],
        ))
        .all(&self.db)
        .await
        .map_err(map_db_err)?;

        Ok(WelfareReport { summary, details })
    }

    /// Recent entries from the whole flow ledger, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_account_flows(&self, limit: u64) -> AppResult<Vec<account_flows::Model>> {
        account_flows::Entity::find()
            .order_by_desc(account_flows::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Recent points-log entries, optionally for one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_points_flows(
        &self,
        user_id: Option<i64>,
        limit: u64,
    ) -> AppResult<Vec<points_logs::Model>> {
        let mut query = points_logs::Entity::find()
            .order_by_desc(points_logs::Column::CreatedAt)
            .limit(limit);
        if let Some(user_id) = user_id {
            query = query.filter(points_logs::Column::UserId.eq(user_id));
        }

        query.all(&self.db).await.map_err(map_db_err)
    }

    /// Every pool account with a positive balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_platform_pools(&self) -> AppResult<Vec<finance_accounts::Model>> {
        finance_accounts::Entity::find()
            .filter(finance_accounts::Column::Balance.gt(Decimal::ZERO))
            .order_by_asc(finance_accounts::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Finance snapshot: every funded pool plus the user and merchant
    /// asset totals the pools must ultimately cover.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn get_finance_report(&self) -> AppResult<FinanceReport> {
        let pools = self.get_platform_pools().await?;

        let sql = r"
            SELECT COALESCE(SUM(points), 0)::bigint AS total_points,
                   COALESCE(SUM(promotion_balance), 0) AS total_promotion_balance,
                   COALESCE(SUM(merchant_points), 0)::bigint AS total_merchant_points,
                   COALESCE(SUM(merchant_balance), 0) AS total_merchant_balance
            FROM users";
        let assets = AssetTotals::find_by_statement(Statement::from_string(
            self.db.get_database_backend(),
            sql,
        ))
        .one(&self.db)
        .await
        .map_err(map_db_err)?
        .unwrap_or(AssetTotals {
            total_points: 0,
            total_promotion_balance: Decimal::ZERO,
            total_merchant_points: 0,
            total_merchant_balance: Decimal::ZERO,
        });

        Ok(FinanceReport { pools, assets })
    }

    /// Rewards count helper for dashboards: pending rewards by count.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_pending_rewards(&self) -> AppResult<u64> {
        use crate::entities::{pending_rewards, sea_orm_active_enums::RewardStatus};
        pending_rewards::Entity::find()
            .filter(pending_rewards::Column::Status.eq(RewardStatus::Pending))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }
}
