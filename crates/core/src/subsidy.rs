//! Weekly subsidy math: point-to-coupon conversion.
//!
//! A subsidy run values every outstanding point uniformly: the subsidy pool
//! balance divided by the combined point supply (user points, merchant
//! points, and the company points ledger), capped at a maximum per-point
//! value. Company points inflate the divisor but are never paid out; the
//! subsidy pool balance itself is not debited (it is replenished
//! out-of-band).

use rust_decimal::Decimal;

use crate::order::points_from_amount;

/// Computes the uniform per-point value for a subsidy run.
///
/// Returns `None` when the pool is empty or no points exist, in which case
/// the run distributes nothing.
#[must_use]
pub fn point_value(
    pool_balance: Decimal,
    total_points: Decimal,
    max_point_value: Decimal,
) -> Option<Decimal> {
    if pool_balance <= Decimal::ZERO || total_points <= Decimal::ZERO {
        return None;
    }
    Some((pool_balance / total_points).min(max_point_value))
}

/// One member's share of a subsidy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsidyQuote {
    /// Coupon value minted for the member.
    pub amount: Decimal,
    /// Whole points deducted in exchange (coupon value, truncated).
    pub deducted_points: i64,
}

/// Values a member's point holding at the run's per-point value.
#[must_use]
pub fn quote(points: i64, per_point: Decimal) -> SubsidyQuote {
    let amount = Decimal::from(points) * per_point;
    SubsidyQuote {
        amount,
        deducted_points: points_from_amount(amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_point_value_is_pool_over_supply() {
        let v = point_value(dec!(100.00), dec!(10000), dec!(0.02)).unwrap();
        assert_eq!(v, dec!(0.01));
    }

    #[test]
    fn test_point_value_is_capped() {
        // 1000 / 10000 = 0.10, above the 0.02 cap.
        let v = point_value(dec!(1000.00), dec!(10000), dec!(0.02)).unwrap();
        assert_eq!(v, dec!(0.02));
    }

    #[test]
    fn test_empty_pool_or_supply_distributes_nothing() {
        assert!(point_value(dec!(0), dec!(10000), dec!(0.02)).is_none());
        assert!(point_value(dec!(-5), dec!(10000), dec!(0.02)).is_none());
        assert!(point_value(dec!(100), dec!(0), dec!(0.02)).is_none());
    }

    #[test]
    fn test_quote_values_points_proportionally() {
        let q = quote(500, dec!(0.02));
        assert_eq!(q.amount, dec!(10.00));
        assert_eq!(q.deducted_points, 10);
    }

    #[test]
    fn test_quote_truncates_deducted_points() {
        let q = quote(123, dec!(0.02));
        assert_eq!(q.amount, dec!(2.46));
        assert_eq!(q.deducted_points, 2);
    }

    proptest! {
        /// Each member's coupon is proportional to their point share: for a
        /// fixed per-point value, doubling points doubles the coupon.
        #[test]
        fn prop_quotes_scale_linearly(points in 1i64..1_000_000) {
            let per_point = dec!(0.015);
            let single = quote(points, per_point);
            let double = quote(points * 2, per_point);
            prop_assert_eq!(double.amount, single.amount * Decimal::TWO);
        }

        /// The per-point value never exceeds the configured cap.
        #[test]
        fn prop_point_value_capped(
            pool_cents in 1i64..10_000_000_000,
            supply in 1i64..100_000_000,
        ) {
            let v = point_value(
                Decimal::new(pool_cents, 2),
                Decimal::from(supply),
                dec!(0.02),
            ).unwrap();
            prop_assert!(v <= dec!(0.02));
            prop_assert!(v > Decimal::ZERO);
        }
    }
}
