//! Pending-reward lifecycle rules.
//!
//! A pending reward moves `pending -> approved` or `pending -> rejected`;
//! both outcomes are terminal. Approval converts the reward into a coupon
//! whose validity window starts the day of approval.

use chrono::{Days, NaiveDate};

use crate::error::SettlementError;
use crate::types::RewardStatus;

/// Validates an audit decision against the reward's current state.
///
/// # Errors
///
/// Returns `RewardAlreadyResolved` when the reward is no longer pending.
pub fn audit_transition(
    current: RewardStatus,
    approve: bool,
) -> Result<RewardStatus, SettlementError> {
    match current {
        RewardStatus::Pending => Ok(if approve {
            RewardStatus::Approved
        } else {
            RewardStatus::Rejected
        }),
        RewardStatus::Approved => Err(SettlementError::RewardAlreadyResolved("approved")),
        RewardStatus::Rejected => Err(SettlementError::RewardAlreadyResolved("rejected")),
    }
}

/// Coupon validity window starting on the issue date.
///
/// Saturates at the calendar bounds rather than panicking on absurd inputs.
#[must_use]
pub fn coupon_window(issued_on: NaiveDate, valid_days: i64) -> (NaiveDate, NaiveDate) {
    let days = u64::try_from(valid_days).unwrap_or(0);
    let valid_to = issued_on
        .checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX);
    (issued_on, valid_to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_pending_approves_and_rejects() {
        assert_eq!(
            audit_transition(RewardStatus::Pending, true).unwrap(),
            RewardStatus::Approved
        );
        assert_eq!(
            audit_transition(RewardStatus::Pending, false).unwrap(),
            RewardStatus::Rejected
        );
    }

    #[rstest]
    #[case(RewardStatus::Approved, true)]
    #[case(RewardStatus::Approved, false)]
    #[case(RewardStatus::Rejected, true)]
    #[case(RewardStatus::Rejected, false)]
    fn test_resolved_rewards_are_terminal(#[case] status: RewardStatus, #[case] approve: bool) {
        assert!(matches!(
            audit_transition(status, approve),
            Err(SettlementError::RewardAlreadyResolved(_))
        ));
    }

    #[test]
    fn test_coupon_window_spans_valid_days() {
        let issued = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (from, to) = coupon_window(issued, 30);
        assert_eq!(from, issued);
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
    }

    #[test]
    fn test_coupon_window_with_zero_days() {
        let issued = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (from, to) = coupon_window(issued, 0);
        assert_eq!(from, to);
    }
}
