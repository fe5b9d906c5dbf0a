//! Cross-module flow tests for the settlement pipeline.
//!
//! Exercises the pure planning layer end to end the way the repositories
//! drive it: fund split, chain walk, withholding, and subsidy valuation
//! composed over in-memory fixtures. No database required.

use std::collections::HashMap;
use std::convert::Infallible;

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trellis_core::referral::{plan_rewards, RewardPlan};
use trellis_core::types::{RewardType, WithdrawalStatus};
use trellis_core::{order, subsidy, withdrawal, REVENUE_SHARE};

const MEMBER_PRICE: Decimal = Decimal::from_parts(1_980_00, 0, 0, false, 2);

fn walk(
    edges: &HashMap<i64, i64>,
    levels: &HashMap<i64, i16>,
    buyer: i64,
    old_level: i16,
    new_level: i16,
) -> Vec<RewardPlan> {
    plan_rewards::<_, _, Infallible>(
        buyer,
        old_level,
        new_level,
        MEMBER_PRICE,
        6,
        |id| Ok(edges.get(&id).copied()),
        |id| Ok(levels.get(&id).copied()),
    )
    .unwrap()
}

#[test]
fn test_member_settlement_splits_and_rewards_first_purchase() {
    // A level-0 buyer referred by a level-3 member buys one unit.
    let plan = order::plan_member_order(MEMBER_PRICE, 1, 0).unwrap();
    let pools: Decimal = plan.pool_credits.iter().map(|(_, a)| *a).sum();
    assert_eq!(pools + plan.platform_revenue, dec!(1980.00));
    assert_eq!(plan.new_level, 1);

    let edges = HashMap::from([(1, 2)]);
    let levels = HashMap::from([(2, 3)]);
    let rewards = walk(&edges, &levels, 1, plan.old_level, plan.new_level);
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].reward_type, RewardType::Referral);
    assert_eq!(rewards[0].amount, dec!(990.00));
}

#[test]
fn test_member_upgrade_pays_team_reward_at_exact_depth() {
    // Level 1 buyer buys two units: 1 -> 3; the third-hop ancestor at
    // level 3 earns a layer-3 team reward, no referral reward.
    let plan = order::plan_member_order(MEMBER_PRICE, 2, 1).unwrap();
    assert_eq!(plan.new_level, 3);

    let edges = HashMap::from([(1, 10), (10, 20), (20, 30)]);
    let levels = HashMap::from([(30, 3)]);
    let rewards = walk(&edges, &levels, 1, plan.old_level, plan.new_level);
    assert_eq!(
        rewards,
        vec![RewardPlan {
            recipient: 30,
            reward_type: RewardType::Team,
            amount: dec!(990.00),
            layer: Some(3),
        }]
    );
}

#[test]
fn test_discounted_normal_order_conserves_paid_amount() {
    // Buyer holds 400 points and redeems 200 against a 500.00 order.
    let discount = order::validate_points_redemption(200, 400, dec!(500.00), dec!(1)).unwrap();
    let paid = dec!(500.00) - discount;
    assert_eq!(paid, dec!(300.00));

    let plan = order::plan_normal_order(paid, true, 2);
    let pools: Decimal = plan.pool_credits.iter().map(|(_, a)| *a).sum();
    assert_eq!(pools + plan.revenue_share, paid);
    assert_eq!(plan.revenue_share, paid * REVENUE_SHARE);
    assert_eq!(plan.buyer_points, Some(300));
    assert_eq!(plan.merchant_points, Some(60));
}

#[test]
fn test_refund_reversal_clamps_clawback_and_demotes_one_level() {
    // A level-0 buyer bought three units: level 0 -> 3, 5940 points earned.
    let plan = order::plan_member_order(MEMBER_PRICE, 3, 0).unwrap();
    assert_eq!(plan.new_level, 3);
    assert_eq!(plan.points_earned, 5940);

    // The referrer's reward is clawed back up to their remaining balance;
    // one who spent most of it only returns what is left.
    let reward = MEMBER_PRICE * dec!(3) * trellis_core::referral::REWARD_SHARE;
    assert_eq!(order::clawback_amount(dec!(10000.00), reward), reward);
    assert_eq!(
        order::clawback_amount(dec!(150.00), reward),
        dec!(150.00)
    );

    // The buyer loses exactly one level per refund, not the three the
    // purchase granted, and their points never go below zero.
    assert_eq!(order::demoted_level(plan.new_level), 2);
    let reversed = order::points_from_amount(MEMBER_PRICE * dec!(3));
    assert_eq!(order::points_after_refund(plan.points_earned, reversed), 0);
    assert_eq!(order::points_after_refund(1000, reversed), 0);
    assert_eq!(
        order::points_after_refund(plan.points_earned + 77, reversed),
        77
    );
}

#[test]
fn test_withdrawal_lifecycle_over_threshold() {
    let w = withdrawal::compute_withholding(dec!(6000.00), dec!(0.06)).unwrap();
    assert_eq!(w.tax, dec!(360.0000));
    assert_eq!(w.tax + w.net, w.gross);

    let status = withdrawal::route_audit(w.gross, dec!(5000.00));
    assert_eq!(status, WithdrawalStatus::PendingManual);

    let approved = withdrawal::audit_transition(status, true).unwrap();
    assert_eq!(approved, WithdrawalStatus::Approved);
    assert!(withdrawal::audit_transition(approved, false).is_err());
}

#[test]
fn test_subsidy_run_values_all_ledgers_uniformly() {
    // 1000.00 pool over 40000 + 5000 + 5000 points = 0.02/point exactly
    // at the cap.
    let per_point =
        subsidy::point_value(dec!(1000.00), dec!(50000), dec!(0.02)).unwrap();
    assert_eq!(per_point, dec!(0.02));

    let member = subsidy::quote(40_000, per_point);
    let merchant = subsidy::quote(5_000, per_point);
    assert_eq!(member.amount, dec!(800.00));
    assert_eq!(member.deducted_points, 800);
    assert_eq!(merchant.amount, dec!(100.00));
    // Company points share is never quoted or paid.
    assert_eq!(member.amount + merchant.amount, dec!(900.00));
}

proptest! {
    /// Every settlement plan conserves the paid amount exactly across
    /// pools and the revenue share, member and normal alike.
    #[test]
    fn prop_settlement_conserves_money(cents in 1i64..10_000_000, quantity in 1i32..5) {
        let price = Decimal::new(cents, 2);
        let member = order::plan_member_order(price, quantity, 0).unwrap();
        let member_pools: Decimal = member.pool_credits.iter().map(|(_, a)| *a).sum();
        prop_assert_eq!(member_pools + member.platform_revenue, member.total_amount);

        let normal = order::plan_normal_order(price, true, 1);
        let normal_pools: Decimal = normal.pool_credits.iter().map(|(_, a)| *a).sum();
        prop_assert_eq!(normal_pools + normal.revenue_share, price);
    }
}
