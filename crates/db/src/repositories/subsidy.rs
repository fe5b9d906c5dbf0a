//! Weekly subsidy distribution: points become coupons.
//!
//! The run values every outstanding point uniformly, then processes one
//! user per transaction so a long run never starves concurrent
//! settlements of locks. Each processed user leaves an idempotency
//! record keyed by `(user_id, side, week_start)`; a crashed run can be
//! re-executed and skips everyone already paid.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, NotSet, QueryFilter, QuerySelect, Set, Statement,
};
use trellis_core::reward::coupon_window;
use trellis_core::{subsidy, PoolAccount};
use trellis_shared::{AppResult, SettlementConfig};

use crate::entities::{
    coupons, users, weekly_subsidy_records,
    sea_orm_active_enums::{CouponStatus, CouponType, PointsKind},
};
use crate::repositories::account;
use crate::txn::{self, map_db_err};

/// Monday of the week containing `date`; the idempotency period key.
#[must_use]
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[derive(FromQueryResult)]
struct PointsSum {
    total: Option<Decimal>,
}

/// Weekly subsidy distribution.
#[derive(Debug, Clone)]
pub struct SubsidyRepository {
    db: DatabaseConnection,
    rules: SettlementConfig,
}

impl SubsidyRepository {
    /// Creates a new subsidy repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, rules: SettlementConfig) -> Self {
        Self { db, rules }
    }

    /// Runs the subsidy distribution for the current week.
    ///
    /// # Errors
    ///
    /// Propagates the first store error; users already processed in an
    /// earlier attempt of the same week are skipped.
    pub async fn distribute_weekly_subsidy(&self) -> AppResult<Decimal> {
        self.distribute_for_week(week_start_of(Utc::now().date_naive()))
            .await
    }

    /// Runs the subsidy distribution for an explicit week.
    ///
    /// # Errors
    ///
    /// Propagates the first store error.
    pub async fn distribute_for_week(&self, week_start: NaiveDate) -> AppResult<Decimal> {
        let pool_balance = account::pool_balance(&self.db, PoolAccount::SubsidyPool).await?;
        let user_points = self
            .sum_points("SELECT COALESCE(SUM(points), 0) AS total FROM users WHERE points > 0")
            .await?;
        let merchant_points = self
            .sum_points(
                "SELECT COALESCE(SUM(merchant_points), 0) AS total FROM users WHERE merchant_points > 0",
            )
            .await?;
        // Company points inflate the divisor but are never paid out.
        let company_points = account::pool_balance(&self.db, PoolAccount::CompanyPoints).await?;
        let total_points = user_points + merchant_points + company_points;

        let Some(per_point) =
            subsidy::point_value(pool_balance, total_points, self.rules.max_point_value)
        else {
            tracing::warn!(
                %pool_balance,
                %total_points,
                "subsidy run distributes nothing"
            );
            return Ok(Decimal::ZERO);
        };

        tracing::info!(
            %pool_balance,
            %user_points,
            %merchant_points,
            %company_points,
            %per_point,
            %week_start,
            "subsidy run started"
        );

        let mut distributed = Decimal::ZERO;

        let member_ids: Vec<i64> = users::Entity::find()
            .filter(users::Column::Points.gt(0))
            .select_only()
            .column(users::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        for user_id in member_ids {
            distributed += self
                .subsidize(user_id, PointsKind::Member, week_start, per_point)
                .await?;
        }

        let merchant_ids: Vec<i64> = users::Entity::find()
            .filter(users::Column::MerchantPoints.gt(0))
            .select_only()
            .column(users::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        for user_id in merchant_ids {
            distributed += self
                .subsidize(user_id, PointsKind::Merchant, week_start, per_point)
                .await?;
        }

        tracing::info!(%distributed, "subsidy run finished");
        Ok(distributed)
    }

    /// Processes one user ledger in its own short transaction.
    ///
    /// Returns the amount credited, zero when skipped. The merchant side
    /// only mints coupons and deducts points when the configuration
    /// enables it; the run record is written either way.
    async fn subsidize(
        &self,
        user_id: i64,
        side: PointsKind,
        week_start: NaiveDate,
        per_point: Decimal,
    ) -> AppResult<Decimal> {
        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;

        let already_paid = weekly_subsidy_records::Entity::find()
            .filter(weekly_subsidy_records::Column::UserId.eq(user_id))
            .filter(weekly_subsidy_records::Column::Side.eq(side.clone()))
            .filter(weekly_subsidy_records::Column::WeekStart.eq(week_start))
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .is_some();
        if already_paid {
            return Ok(Decimal::ZERO);
        }

        let Some(user) = users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(Decimal::ZERO);
        };

        let points = match side {
            PointsKind::Member => user.points,
            PointsKind::Merchant => user.merchant_points,
        };
        if points <= 0 {
            return Ok(Decimal::ZERO);
        }

        let quote = subsidy::quote(points, per_point);
        if quote.amount <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let pay_out = match side {
            PointsKind::Member => true,
            PointsKind::Merchant => self.rules.deduct_merchant_points_on_subsidy,
        };

        let coupon_id = if pay_out {
            let (valid_from, valid_to) =
                coupon_window(Utc::now().date_naive(), self.rules.coupon_valid_days);
            let coupon_type = match side {
                PointsKind::Member => CouponType::User,
                PointsKind::Merchant => CouponType::Merchant,
            };
            let coupon = coupons::ActiveModel {
                id: NotSet,
                user_id: Set(user_id),
                coupon_type: Set(coupon_type),
                amount: Set(quote.amount),
                status: Set(CouponStatus::Unused),
                valid_from: Set(valid_from),
                valid_to: Set(valid_to),
                used_at: Set(None),
                created_at: Set(Utc::now().into()),
            };
            let coupon = coupon.insert(&txn).await.map_err(map_db_err)?;

            let column = match side {
                PointsKind::Member => users::Column::Points,
                PointsKind::Merchant => users::Column::MerchantPoints,
            };
            users::Entity::update_many()
                .col_expr(column, Expr::col(column).sub(quote.deducted_points))
                .filter(users::Column::Id.eq(user_id))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;

            Some(coupon.id)
        } else {
            None
        };

        let record = weekly_subsidy_records::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            side: Set(side),
            week_start: Set(week_start),
            subsidy_amount: Set(quote.amount),
            points_before: Set(points),
            points_deducted: Set(if pay_out { quote.deducted_points } else { 0 }),
            coupon_id: Set(coupon_id),
            created_at: Set(Utc::now().into()),
        };
        record.insert(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(quote.amount)
    }

    async fn sum_points(&self, sql: &str) -> AppResult<Decimal> {
        let row = PointsSum::find_by_statement(Statement::from_string(
            self.db.get_database_backend(),
            sql,
        ))
        .one(&self.db)
        .await
        .map_err(map_db_err)?;

        Ok(row.and_then(|r| r.total).unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_start_is_monday() {
        // 2026-08-26 is a Wednesday.
        let wednesday = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_eq!(week_start_of(wednesday), monday);
        assert_eq!(week_start_of(monday), monday);
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(week_start_of(sunday), monday);
    }
}
