//! Settlement repository: order settlement and refund reversal.
//!
//! `settle_order` runs the whole fund split inside one store transaction:
//! lock product, validate merchant and rate limit, lock buyer, apply any
//! point redemption, insert the order, then apply the member or normal
//! split plan computed by `trellis-core`. Row locks are always taken in
//! the same order (product, then buyer, then each referrer walking up
//! the chain) so concurrent settlements cannot deadlock on each other.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QuerySelect, Set,
};
use trellis_core::referral::{RewardPlan, REWARD_SHARE};
use trellis_core::{order, PoolAccount, SettlementError};
use trellis_shared::{AppError, AppResult, SettlementConfig};

use crate::entities::{
    order_items, orders, pending_rewards, products, team_rewards, user_referrals, users,
    sea_orm_active_enums::{FlowType, OrderStatus, RewardStatus},
};
use crate::repositories::account::{self, FlowEntry};
use crate::txn::{self, map_db_err};

/// Input for settling one purchase.
#[derive(Debug, Clone)]
pub struct SettleOrderInput {
    /// Caller-supplied unique order number.
    pub order_no: String,
    /// Buyer.
    pub user_id: i64,
    /// Product being purchased.
    pub product_id: i64,
    /// Units purchased; must be at least 1.
    pub quantity: i32,
    /// Points to redeem as a discount (normal products only).
    pub points_to_use: i64,
}

/// Order settlement and refund operations.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
    rules: SettlementConfig,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, rules: SettlementConfig) -> Self {
        Self { db, rules }
    }

    /// Settles one purchase and returns the new order id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing product/user/merchant,
    /// `RateLimitExceeded` when the member purchase window is exhausted,
    /// `InsufficientPoints`/`DiscountLimitExceeded` for an invalid point
    /// redemption, `InvalidState` for a duplicate order number, and
    /// `Busy` on lock contention. Any error rolls back everything.
    pub async fn settle_order(&self, input: SettleOrderInput) -> AppResult<i64> {
        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;
        // Dropping the transaction on the error path rolls everything back.
        let order_id = self.settle_in_txn(&txn, &input).await?;
        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(order_no = %input.order_no, order_id, "order settled");
        Ok(order_id)
    }

    async fn settle_in_txn(
        &self,
        txn: &DatabaseTransaction,
        input: &SettleOrderInput,
    ) -> AppResult<i64> {
        if input.quantity < 1 {
            return Err(SettlementError::ZeroQuantity.into());
        }

        // Lock order: product first.
        let product = products::Entity::find_by_id(input.product_id)
            .filter(products::Column::Status.eq(1i16))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("product {}", input.product_id)))?;

        let sold_by_merchant = product.merchant_id != self.rules.platform_merchant_id;
        let merchant = if sold_by_merchant {
            let merchant = users::Entity::find_by_id(product.merchant_id)
                .one(txn)
                .await
                .map_err(map_db_err)?
                .ok_or_else(|| AppError::NotFound(format!("merchant {}", product.merchant_id)))?;
            Some(merchant)
        } else {
            None
        };

        if product.is_member_product {
            self.check_purchase_limit(txn, input.user_id).await?;
        }

        // Buyer second.
        let buyer = users::Entity::find_by_id(input.user_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("user {}", input.user_id)))?;

        let original_amount = product.price * Decimal::from(input.quantity);
        let mut buyer_points = buyer.points;

        let points_discount = if input.points_to_use > 0 {
            if product.is_member_product {
                return Err(SettlementError::PointsOnMemberProduct.into());
            }
            let discount = order::validate_points_redemption(
                input.points_to_use,
                buyer.points,
                original_amount,
                self.rules.points_discount_rate,
            )?;
            self.apply_points_discount(txn, &buyer, input.points_to_use, discount)
                .await?;
            buyer_points -= input.points_to_use;
            discount
        } else {
            Decimal::ZERO
        };
        let paid_amount = original_amount - points_discount;

        let order = self
            .insert_order(txn, input, &product, paid_amount, original_amount, points_discount)
            .await?;

        if product.is_member_product {
            let plan = order::plan_member_order(product.price, input.quantity, buyer.member_level)?;
            self.apply_pool_credits(txn, &order.order_no, &plan.pool_credits, None)
                .await?;
            account::credit_pool(txn, PoolAccount::PlatformRevenuePool, plan.platform_revenue)
                .await?;

            let new_points = buyer_points + plan.points_earned;
            let mut active: users::ActiveModel = buyer.clone().into();
            active.member_level = Set(plan.new_level);
            active.level_changed_at = Set(Some(Utc::now().into()));
            active.points = Set(new_points);
            active.updated_at = Set(Utc::now().into());
            active.update(txn).await.map_err(map_db_err)?;

            self.log_points(
                txn,
                buyer.id,
                plan.points_earned,
                new_points,
                crate::entities::sea_orm_active_enums::PointsKind::Member,
                "Member product purchase",
                order.id,
            )
            .await?;

            account::credit_pool(
                txn,
                PoolAccount::CompanyPoints,
                Decimal::from(plan.company_points),
            )
            .await?;

            let rewards = self
                .plan_chain_rewards(txn, buyer.id, plan.old_level, plan.new_level)
                .await?;
            self.queue_rewards(txn, order.id, &rewards).await?;
        } else {
            let plan = order::plan_normal_order(paid_amount, sold_by_merchant, buyer.member_level);

            if plan.revenue_to_merchant {
                users::Entity::update_many()
                    .col_expr(
                        users::Column::MerchantBalance,
                        Expr::col(users::Column::MerchantBalance).add(plan.revenue_share),
                    )
                    .filter(users::Column::Id.eq(product.merchant_id))
                    .exec(txn)
                    .await
                    .map_err(map_db_err)?;
                account::record_flow(
                    txn,
                    FlowEntry {
                        account_type: "merchant_balance",
                        related_user: Some(product.merchant_id),
                        change_amount: plan.revenue_share,
                        flow_type: FlowType::Income,
                        remark: format!("Normal product revenue - order {}", order.order_no),
                    },
                )
                .await?;
            } else {
                account::credit_pool(txn, PoolAccount::PlatformRevenuePool, plan.revenue_share)
                    .await?;
            }

            self.apply_pool_credits(txn, &order.order_no, &plan.pool_credits, Some(buyer.id))
                .await?;

            if let Some(points) = plan.buyer_points {
                users::Entity::update_many()
                    .col_expr(
                        users::Column::Points,
                        Expr::col(users::Column::Points).add(points),
                    )
                    .filter(users::Column::Id.eq(buyer.id))
                    .exec(txn)
                    .await
                    .map_err(map_db_err)?;
                self.log_points(
                    txn,
                    buyer.id,
                    points,
                    buyer_points + points,
                    crate::entities::sea_orm_active_enums::PointsKind::Member,
                    "Purchase",
                    order.id,
                )
                .await?;
            }

            if let Some(points) = plan.merchant_points {
                // Only set when sold_by_merchant, so the model is present.
                let merchant = merchant.as_ref().ok_or_else(|| {
                    AppError::NotFound(format!("merchant {}", product.merchant_id))
                })?;
                users::Entity::update_many()
                    .col_expr(
                        users::Column::MerchantPoints,
                        Expr::col(users::Column::MerchantPoints).add(points),
                    )
                    .filter(users::Column::Id.eq(merchant.id))
                    .exec(txn)
                    .await
                    .map_err(map_db_err)?;
                self.log_points(
                    txn,
                    merchant.id,
                    points,
                    merchant.merchant_points + points,
                    crate::entities::sea_orm_active_enums::PointsKind::Merchant,
                    "Sale",
                    order.id,
                )
                .await?;
            }
        }

        Ok(order.id)
    }

    /// Rejects the settlement when the buyer already hit the rolling
    /// 24-hour member purchase cap. Refunded orders do not count.
    async fn check_purchase_limit(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
    ) -> AppResult<()> {
        let window_start = Utc::now() - Duration::hours(24);
        let recent = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::IsMemberOrder.eq(true))
            .filter(orders::Column::Status.ne(OrderStatus::Refunded))
            .filter(orders::Column::CreatedAt.gte(window_start))
            .count(txn)
            .await
            .map_err(map_db_err)?;

        if recent >= self.rules.max_member_purchases_per_window {
            return Err(AppError::RateLimitExceeded {
                limit: self.rules.max_member_purchases_per_window,
            });
        }
        Ok(())
    }

    /// Deducts redeemed points from the buyer and parks their monetary
    /// value in the company points pool.
    async fn apply_points_discount(
        &self,
        txn: &DatabaseTransaction,
        buyer: &users::Model,
        points_to_use: i64,
        discount: Decimal,
    ) -> AppResult<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::Points,
                Expr::col(users::Column::Points).sub(points_to_use),
            )
            .filter(users::Column::Id.eq(buyer.id))
            .exec(txn)
            .await
            .map_err(map_db_err)?;

        account::credit_pool(txn, PoolAccount::CompanyPoints, discount).await
    }

    async fn insert_order(
        &self,
        txn: &DatabaseTransaction,
        input: &SettleOrderInput,
        product: &products::Model,
        paid_amount: Decimal,
        original_amount: Decimal,
        points_discount: Decimal,
    ) -> AppResult<orders::Model> {
        let now = Utc::now().into();
        let order = orders::ActiveModel {
            id: NotSet,
            order_no: Set(input.order_no.clone()),
            user_id: Set(input.user_id),
            merchant_id: Set(product.merchant_id),
            total_amount: Set(paid_amount),
            original_amount: Set(original_amount),
            points_discount: Set(points_discount),
            is_member_order: Set(product.is_member_product),
            status: Set(OrderStatus::Completed),
            refund_status: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        // A duplicate order_no trips the unique index here and maps to
        // InvalidState.
        let order = order.insert(txn).await.map_err(map_db_err)?;

        let item = order_items::ActiveModel {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(input.quantity),
            unit_price: Set(product.price),
            total_price: Set(original_amount),
        };
        item.insert(txn).await.map_err(map_db_err)?;

        Ok(order)
    }

    /// Credits the fixed-percentage pools and records the public-welfare
    /// flow entry.
    async fn apply_pool_credits(
        &self,
        txn: &DatabaseTransaction,
        order_no: &str,
        credits: &[(PoolAccount, Decimal)],
        welfare_related_user: Option<i64>,
    ) -> AppResult<()> {
        for (pool, amount) in credits {
            account::credit_pool(txn, *pool, *amount).await?;
            if *pool == PoolAccount::PublicWelfare {
                account::record_flow(
                    txn,
                    FlowEntry {
                        account_type: pool.as_str(),
                        related_user: welfare_related_user,
                        change_amount: *amount,
                        flow_type: FlowType::Income,
                        remark: format!("Order {order_no} public welfare contribution"),
                    },
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Walks the referral chain upward, locking each referrer row in
    /// ascending chain order, then lets the core walker decide who is
    /// rewarded.
    async fn plan_chain_rewards(
        &self,
        txn: &DatabaseTransaction,
        buyer_id: i64,
        old_level: i16,
        new_level: i16,
    ) -> AppResult<Vec<RewardPlan>> {
        let max_hops = u32::try_from(new_level)
            .unwrap_or(0)
            .min(self.rules.max_team_layer)
            .max(1);

        let mut edges: HashMap<i64, i64> = HashMap::new();
        let mut levels: HashMap<i64, i16> = HashMap::new();
        let mut seen: HashSet<i64> = HashSet::from([buyer_id]);
        let mut current = buyer_id;

        for _ in 0..max_hops {
            let Some(edge) = user_referrals::Entity::find()
                .filter(user_referrals::Column::UserId.eq(current))
                .one(txn)
                .await
                .map_err(map_db_err)?
            else {
                break;
            };
            if !seen.insert(edge.referrer_id) {
                break;
            }
            let Some(referrer) = users::Entity::find_by_id(edge.referrer_id)
                .lock_exclusive()
                .one(txn)
                .await
                .map_err(map_db_err)?
            else {
                break;
            };
            edges.insert(current, referrer.id);
            levels.insert(referrer.id, referrer.member_level);
            current = referrer.id;
        }

        trellis_core::referral::plan_rewards::<_, _, AppError>(
            buyer_id,
            old_level,
            new_level,
            self.rules.member_product_price,
            self.rules.max_team_layer,
            |id| Ok(edges.get(&id).copied()),
            |id| Ok(levels.get(&id).copied()),
        )
    }

    async fn queue_rewards(
        &self,
        txn: &DatabaseTransaction,
        order_id: i64,
        rewards: &[RewardPlan],
    ) -> AppResult<()> {
        for reward in rewards {
            let layer = match reward.layer {
                Some(layer) => Some(i16::try_from(layer).map_err(|_| {
                    AppError::Validation(format!("team layer {layer} out of range"))
                })?),
                None => None,
            };
            let pending = pending_rewards::ActiveModel {
                id: NotSet,
                user_id: Set(reward.recipient),
                reward_type: Set(reward.reward_type.into()),
                amount: Set(reward.amount),
                order_id: Set(order_id),
                layer: Set(layer),
                status: Set(RewardStatus::Pending),
                created_at: Set(Utc::now().into()),
            };
            pending.insert(txn).await.map_err(map_db_err)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_points(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
        change: i64,
        balance_after: i64,
        kind: crate::entities::sea_orm_active_enums::PointsKind,
        reason: &str,
        order_id: i64,
    ) -> AppResult<()> {
        let entry = crate::entities::points_logs::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            change_amount: Set(change),
            balance_after: Set(balance_after),
            kind: Set(kind),
            reason: Set(Some(format!("{reason} points earned"))),
            related_order: Set(Some(order_id)),
            created_at: Set(Utc::now().into()),
        };
        entry.insert(txn).await.map_err(map_db_err)?;
        Ok(())
    }

    /// Reverses a settled order.
    ///
    /// Member orders claw back referral/team reward cash (floored at
    /// zero: a recipient who already spent the money keeps the
    /// difference), remove the earned points (floored at zero) and drop
    /// the buyer's level by exactly one. All orders then reverse the 80%
    /// revenue share from whoever received it, verifying balance first.
    /// The fixed-percentage pool allocations are intentionally not
    /// reversed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order, `InvalidState` when it
    /// was already refunded, `InsufficientFunds` when the revenue share
    /// cannot be clawed back, and `Busy` on lock contention.
    pub async fn refund_order(&self, order_no: &str) -> AppResult<()> {
        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;
        self.refund_in_txn(&txn, order_no).await?;
        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(order_no, "order refunded");
        Ok(())
    }

    async fn refund_in_txn(&self, txn: &DatabaseTransaction, order_no: &str) -> AppResult<()> {
        let order = orders::Entity::find()
            .filter(orders::Column::OrderNo.eq(order_no))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_no}")))?;

        if order.status == OrderStatus::Refunded {
            return Err(AppError::InvalidState(format!(
                "order {order_no} already refunded"
            )));
        }

        if order.is_member_order {
            self.reverse_member_effects(txn, &order).await?;
        }

        let revenue_share = order.total_amount * trellis_core::REVENUE_SHARE;
        if order.is_member_order || order.merchant_id == self.rules.platform_merchant_id {
            account::debit_pool_checked(txn, PoolAccount::PlatformRevenuePool, revenue_share)
                .await?;
        } else {
            self.claw_back_merchant_revenue(txn, order.merchant_id, revenue_share)
                .await?;
        }

        let mut active: orders::ActiveModel = order.into();
        active.status = Set(OrderStatus::Refunded);
        active.refund_status = Set(Some("refunded".to_owned()));
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await.map_err(map_db_err)?;

        Ok(())
    }

    /// Claws back reward cash, earned points and the level step for a
    /// member order.
    async fn reverse_member_effects(
        &self,
        txn: &DatabaseTransaction,
        order: &orders::Model,
    ) -> AppResult<()> {
        let reward_amount = order.original_amount * REWARD_SHARE;

        // Same lock order as settlement: buyer before any upstream rows.
        let buyer = users::Entity::find_by_id(order.user_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("user {}", order.user_id)))?;

        let edge = user_referrals::Entity::find()
            .filter(user_referrals::Column::UserId.eq(order.user_id))
            .one(txn)
            .await
            .map_err(map_db_err)?;
        if let Some(edge) = edge {
            debit_promotion_floored(txn, edge.referrer_id, reward_amount).await?;
        }

        let paid_team_rewards = team_rewards::Entity::find()
            .filter(team_rewards::Column::OrderId.eq(order.id))
            .all(txn)
            .await
            .map_err(map_db_err)?;
        for reward in paid_team_rewards {
            debit_promotion_floored(txn, reward.user_id, reward.reward_amount).await?;
        }

        let points_reversed = order::points_from_amount(order.original_amount);
        let mut active: users::ActiveModel = buyer.clone().into();
        active.points = Set(order::points_after_refund(buyer.points, points_reversed));
        active.member_level = Set(order::demoted_level(buyer.member_level));
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await.map_err(map_db_err)?;

        Ok(())
    }

    async fn claw_back_merchant_revenue(
        &self,
        txn: &DatabaseTransaction,
        merchant_id: i64,
        amount: Decimal,
    ) -> AppResult<()> {
        let merchant = users::Entity::find_by_id(merchant_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("merchant {merchant_id}")))?;

        if merchant.merchant_balance < amount {
            return Err(AppError::InsufficientFunds {
                account: format!("user:{merchant_id}:merchant_balance"),
                required: amount,
                available: merchant.merchant_balance,
            });
        }

        users::Entity::update_many()
            .col_expr(
                users::Column::MerchantBalance,
                Expr::col(users::Column::MerchantBalance).sub(amount),
            )
            .filter(users::Column::Id.eq(merchant_id))
            .exec(txn)
            .await
            .map_err(map_db_err)?;

        Ok(())
    }
}

/// Deducts reward cash from a promotion balance, clamped so the balance
/// never goes negative.
async fn debit_promotion_floored(
    txn: &DatabaseTransaction,
    user_id: i64,
    amount: Decimal,
) -> AppResult<()> {
    let Some(user) = users::Entity::find_by_id(user_id)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(map_db_err)?
    else {
        return Ok(());
    };

    let deduction = order::clawback_amount(user.promotion_balance, amount);
    if deduction <= Decimal::ZERO {
        return Ok(());
    }

    users::Entity::update_many()
        .col_expr(
            users::Column::PromotionBalance,
            Expr::col(users::Column::PromotionBalance).sub(deduction),
        )
        .filter(users::Column::Id.eq(user_id))
        .exec(txn)
        .await
        .map_err(map_db_err)?;

    Ok(())
}
