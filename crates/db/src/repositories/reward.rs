//! Reward lifecycle: auditing pending rewards into coupons.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use trellis_core::reward::{audit_transition, coupon_window};
use trellis_core::types::RewardType;
use trellis_core::SettlementError;
use trellis_shared::{AppError, AppResult, SettlementConfig};

use crate::entities::{
    coupons, pending_rewards,
    sea_orm_active_enums::{CouponStatus, CouponType, FlowType, RewardStatus},
};
use crate::repositories::account::{self, FlowEntry};
use crate::txn::{self, map_db_err};

/// Pending-reward audit operations.
#[derive(Debug, Clone)]
pub struct RewardRepository {
    db: DatabaseConnection,
    rules: SettlementConfig,
}

impl RewardRepository {
    /// Creates a new reward repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, rules: SettlementConfig) -> Self {
        Self { db, rules }
    }

    /// Audits a batch of pending rewards. Approval mints one coupon per
    /// reward; rejection just flips the status. Returns the number of
    /// rewards resolved.
    ///
    /// Only rewards still in the pending state are touched; ids that are
    /// missing or already resolved are ignored, but a batch that matches
    /// nothing at all is an error.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty id list and `InvalidState` when
    /// no pending reward matched.
    pub async fn audit_rewards(
        &self,
        reward_ids: &[i64],
        approve: bool,
        auditor: &str,
    ) -> AppResult<usize> {
        if reward_ids.is_empty() {
            return Err(AppError::Validation(
                "reward id list must not be empty".to_owned(),
            ));
        }

        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;

        let rewards = pending_rewards::Entity::find()
            .filter(pending_rewards::Column::Id.is_in(reward_ids.iter().copied()))
            .filter(pending_rewards::Column::Status.eq(RewardStatus::Pending))
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(map_db_err)?;

        if rewards.is_empty() {
            return Err(SettlementError::NoPendingRewards.into());
        }

        let resolved = rewards.len();
        for reward in rewards {
            self.resolve_reward(&txn, reward, approve).await?;
        }

        txn.commit().await.map_err(map_db_err)?;
        tracing::info!(auditor, resolved, approve, "rewards audited");
        Ok(resolved)
    }

    async fn resolve_reward(
        &self,
        txn: &DatabaseTransaction,
        reward: pending_rewards::Model,
        approve: bool,
    ) -> AppResult<()> {
        let next = audit_transition(reward.status.clone().into(), approve)?;

        if approve {
            let (valid_from, valid_to) =
                coupon_window(Utc::now().date_naive(), self.rules.coupon_valid_days);
            let coupon = coupons::ActiveModel {
                id: NotSet,
                user_id: Set(reward.user_id),
                coupon_type: Set(CouponType::User),
                amount: Set(reward.amount),
                status: Set(CouponStatus::Unused),
                valid_from: Set(valid_from),
                valid_to: Set(valid_to),
                used_at: Set(None),
                created_at: Set(Utc::now().into()),
            };
            let coupon = coupon.insert(txn).await.map_err(map_db_err)?;

            let description = match (RewardType::from(reward.reward_type.clone()), reward.layer) {
                (RewardType::Referral, _) => "Referral".to_owned(),
                (RewardType::Team, layer) => {
                    format!("Team L{}", layer.unwrap_or_default())
                }
            };
            account::record_flow(
                txn,
                FlowEntry {
                    account_type: "coupon",
                    related_user: Some(reward.user_id),
                    change_amount: rust_decimal::Decimal::ZERO,
                    flow_type: FlowType::Coupon,
                    remark: format!(
                        "{description} reward coupon #{} worth {}",
                        coupon.id, reward.amount
                    ),
                },
            )
            .await?;
        }

        let mut active: pending_rewards::ActiveModel = reward.into();
        active.status = Set(next.into());
        active.update(txn).await.map_err(map_db_err)?;

        Ok(())
    }

    /// Lists rewards by status, optionally filtered by type, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_rewards(
        &self,
        status: RewardStatus,
        reward_type: Option<crate::entities::sea_orm_active_enums::RewardType>,
        limit: u64,
    ) -> AppResult<Vec<pending_rewards::Model>> {
        let mut query = pending_rewards::Entity::find()
            .filter(pending_rewards::Column::Status.eq(status))
            .order_by_desc(pending_rewards::Column::CreatedAt)
            .limit(limit);
        if let Some(reward_type) = reward_type {
            query = query.filter(pending_rewards::Column::RewardType.eq(reward_type));
        }

        query.all(&self.db).await.map_err(map_db_err)
    }
}
