//! Order settlement math.
//!
//! Pure calculations behind `settle_order`: point redemption limits, member
//! level upgrades, point accrual, and the fund-split plans for member and
//! normal product orders. The database layer applies these plans inside one
//! store transaction; nothing here touches a store.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::allocation::{self, PoolAccount, COMPANY_POINTS_SHARE, REVENUE_SHARE};
use crate::error::SettlementError;
use crate::types::MAX_MEMBER_LEVEL;

/// Share of the pre-discount amount that points may cover at most.
const MAX_DISCOUNT_SHARE: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// Converts a monetary amount to whole points, truncating fractional cents.
///
/// Saturates instead of wrapping on (absurd) overflow.
#[must_use]
pub fn points_from_amount(amount: Decimal) -> i64 {
    amount.trunc().to_i64().unwrap_or(i64::MAX)
}

/// Validates a point redemption request and returns the discount amount.
///
/// Points may only be redeemed on normal products, the buyer must hold the
/// requested points, and the discount may not exceed 50% of the pre-discount
/// amount.
///
/// # Errors
///
/// Returns `InsufficientPoints` or `DiscountLimitExceeded` when the request
/// violates either rule.
pub fn validate_points_redemption(
    points_to_use: i64,
    points_held: i64,
    original_amount: Decimal,
    points_discount_rate: Decimal,
) -> Result<Decimal, SettlementError> {
    if points_held < points_to_use {
        return Err(SettlementError::InsufficientPoints {
            requested: points_to_use,
            held: points_held,
        });
    }

    let discount = Decimal::from(points_to_use) * points_discount_rate;
    let max_discount = original_amount * MAX_DISCOUNT_SHARE;
    if discount > max_discount {
        return Err(SettlementError::DiscountLimitExceeded {
            max_points: points_from_amount(max_discount / points_discount_rate),
        });
    }

    Ok(discount)
}

/// New member level after purchasing `quantity` units, capped at the maximum.
#[must_use]
pub fn upgraded_level(old_level: i16, quantity: i32) -> i16 {
    let raw = i32::from(old_level).saturating_add(quantity);
    i16::try_from(raw).unwrap_or(MAX_MEMBER_LEVEL).min(MAX_MEMBER_LEVEL)
}

/// Amount actually recoverable when clawing back `amount` from a balance.
///
/// A recipient who already spent the money keeps the difference; the clawback
/// never drives the balance negative.
#[must_use]
pub fn clawback_amount(available: Decimal, amount: Decimal) -> Decimal {
    amount.min(available).max(Decimal::ZERO)
}

/// Member level after a refund: down exactly one, never below zero. The
/// decrement does not scale with the refunded order's quantity.
#[must_use]
pub fn demoted_level(level: i16) -> i16 {
    (level - 1).max(0)
}

/// Point balance after removing refunded earnings, floored at zero.
#[must_use]
pub fn points_after_refund(points: i64, reversed: i64) -> i64 {
    points.saturating_sub(reversed).max(0)
}

/// Fund movements computed for a member-product order.
#[derive(Debug, Clone)]
pub struct MemberOrderPlan {
    /// Paid amount (unit price times quantity; member orders have no discount).
    pub total_amount: Decimal,
    /// Small-pool credits from the allocation table.
    pub pool_credits: Vec<(PoolAccount, Decimal)>,
    /// 80% share credited to the platform revenue pool.
    pub platform_revenue: Decimal,
    /// Buyer's level before the purchase.
    pub old_level: i16,
    /// Buyer's level after the purchase.
    pub new_level: i16,
    /// Points credited to the buyer (paid amount, truncated).
    pub points_earned: i64,
    /// Points credited to the company points pool (20% of paid, truncated).
    pub company_points: i64,
}

/// Computes the full fund split for a member-product order.
///
/// # Errors
///
/// Returns `ZeroQuantity` for a non-positive quantity.
pub fn plan_member_order(
    unit_price: Decimal,
    quantity: i32,
    old_level: i16,
) -> Result<MemberOrderPlan, SettlementError> {
    if quantity < 1 {
        return Err(SettlementError::ZeroQuantity);
    }

    let total_amount = unit_price * Decimal::from(quantity);
    Ok(MemberOrderPlan {
        total_amount,
        pool_credits: allocation::split(total_amount),
        platform_revenue: total_amount * REVENUE_SHARE,
        old_level,
        new_level: upgraded_level(old_level, quantity),
        points_earned: points_from_amount(total_amount),
        company_points: points_from_amount(total_amount * COMPANY_POINTS_SHARE),
    })
}

/// Fund movements computed for a normal-product order.
#[derive(Debug, Clone)]
pub struct NormalOrderPlan {
    /// 80% revenue share of the paid amount.
    pub revenue_share: Decimal,
    /// True when the share goes to the selling merchant's cash balance
    /// rather than the platform revenue pool.
    pub revenue_to_merchant: bool,
    /// Small-pool credits from the allocation table.
    pub pool_credits: Vec<(PoolAccount, Decimal)>,
    /// Points for the buyer; members only (level >= 1).
    pub buyer_points: Option<i64>,
    /// Merchant points for a non-platform seller (20% of paid, truncated).
    pub merchant_points: Option<i64>,
}

/// Computes the fund split for a normal-product order against the paid
/// (post-discount) amount.
#[must_use]
pub fn plan_normal_order(
    paid_amount: Decimal,
    sold_by_merchant: bool,
    buyer_level: i16,
) -> NormalOrderPlan {
    let merchant_points = points_from_amount(paid_amount * COMPANY_POINTS_SHARE);
    NormalOrderPlan {
        revenue_share: paid_amount * REVENUE_SHARE,
        revenue_to_merchant: sold_by_merchant,
        pool_credits: allocation::split(paid_amount),
        buyer_points: (buyer_level >= 1).then(|| points_from_amount(paid_amount)),
        merchant_points: (sold_by_merchant && merchant_points > 0).then_some(merchant_points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_redemption_requires_held_points() {
        let err = validate_points_redemption(100, 50, dec!(500.00), dec!(1)).unwrap_err();
        assert_eq!(
            err,
            SettlementError::InsufficientPoints {
                requested: 100,
                held: 50
            }
        );
    }

    #[test]
    fn test_redemption_capped_at_half_the_order() {
        // 500.00 order: at most 250 points worth of discount.
        let err = validate_points_redemption(251, 1_000, dec!(500.00), dec!(1)).unwrap_err();
        assert_eq!(err, SettlementError::DiscountLimitExceeded { max_points: 250 });

        let discount = validate_points_redemption(250, 1_000, dec!(500.00), dec!(1)).unwrap();
        assert_eq!(discount, dec!(250));
    }

    #[test]
    fn test_redemption_respects_discount_rate() {
        // At 0.5 per point, 600 points are worth 300 > half of 500.00.
        let err = validate_points_redemption(600, 1_000, dec!(500.00), dec!(0.5)).unwrap_err();
        assert_eq!(err, SettlementError::DiscountLimitExceeded { max_points: 500 });
    }

    #[rstest]
    #[case(0, 1, 1)]
    #[case(2, 3, 5)]
    #[case(5, 1, 6)]
    #[case(5, 4, 6)] // capped
    #[case(6, 1, 6)]
    fn test_upgraded_level(#[case] old: i16, #[case] qty: i32, #[case] expected: i16) {
        assert_eq!(upgraded_level(old, qty), expected);
    }

    #[test]
    fn test_member_plan_rejects_zero_quantity() {
        assert_eq!(
            plan_member_order(dec!(1980.00), 0, 0).unwrap_err(),
            SettlementError::ZeroQuantity
        );
    }

    #[test]
    fn test_member_plan_for_single_unit() {
        let plan = plan_member_order(dec!(1980.00), 1, 0).unwrap();
        assert_eq!(plan.total_amount, dec!(1980.00));
        assert_eq!(plan.platform_revenue, dec!(1584.00));
        assert_eq!(plan.new_level, 1);
        assert_eq!(plan.points_earned, 1980);
        assert_eq!(plan.company_points, 396);
    }

    #[test]
    fn test_member_plan_conserves_value() {
        let plan = plan_member_order(dec!(1980.00), 3, 2).unwrap();
        let pools: Decimal = plan.pool_credits.iter().map(|(_, a)| *a).sum();
        assert_eq!(pools + plan.platform_revenue, plan.total_amount);
        assert_eq!(plan.new_level, 5);
    }

    #[test]
    fn test_normal_plan_merchant_sale() {
        let plan = plan_normal_order(dec!(500.00), true, 2);
        assert_eq!(plan.revenue_share, dec!(400.00));
        assert!(plan.revenue_to_merchant);
        assert_eq!(plan.buyer_points, Some(500));
        assert_eq!(plan.merchant_points, Some(100));
    }

    #[test]
    fn test_normal_plan_platform_sale_non_member_buyer() {
        let plan = plan_normal_order(dec!(123.45), false, 0);
        assert!(!plan.revenue_to_merchant);
        assert_eq!(plan.buyer_points, None);
        assert_eq!(plan.merchant_points, None);
    }

    #[test]
    fn test_normal_plan_conserves_value() {
        let paid = dec!(333.33);
        let plan = plan_normal_order(paid, true, 1);
        let pools: Decimal = plan.pool_credits.iter().map(|(_, a)| *a).sum();
        assert_eq!(pools + plan.revenue_share, paid);
    }

    #[test]
    fn test_points_truncate_toward_zero() {
        assert_eq!(points_from_amount(dec!(199.99)), 199);
        assert_eq!(points_from_amount(dec!(0.99)), 0);
    }

    #[test]
    fn test_clawback_never_drives_balance_negative() {
        // Full recovery when the balance covers the reward.
        assert_eq!(clawback_amount(dec!(2000.00), dec!(990.00)), dec!(990.00));
        // Partial recovery when the recipient already spent some of it.
        assert_eq!(clawback_amount(dec!(100.00), dec!(990.00)), dec!(100.00));
        assert_eq!(clawback_amount(dec!(0), dec!(990.00)), dec!(0));
    }

    #[rstest]
    #[case(6, 5)]
    #[case(1, 0)]
    #[case(0, 0)] // already at the floor
    fn test_refund_demotes_exactly_one_level(#[case] level: i16, #[case] expected: i16) {
        assert_eq!(demoted_level(level), expected);
    }

    #[test]
    fn test_refund_floors_points_at_zero() {
        assert_eq!(points_after_refund(2500, 1980), 520);
        assert_eq!(points_after_refund(500, 1980), 0);
        assert_eq!(points_after_refund(0, 1980), 0);
    }
}
