//! Withdrawal math: tax withholding and audit routing.

use rust_decimal::Decimal;

use crate::error::SettlementError;
use crate::types::WithdrawalStatus;

/// Gross/tax/net breakdown of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Withholding {
    /// Amount debited from the user's balance.
    pub gross: Decimal,
    /// Tax withheld into the company cash ledger.
    pub tax: Decimal,
    /// Amount payable to the user on approval.
    pub net: Decimal,
}

/// Computes the withholding breakdown for a withdrawal of `amount`.
///
/// The invariant `gross == tax + net` holds exactly at decimal precision.
///
/// # Errors
///
/// Returns `NonPositiveAmount` for zero or negative requests.
pub fn compute_withholding(amount: Decimal, tax_rate: Decimal) -> Result<Withholding, SettlementError> {
    if amount <= Decimal::ZERO {
        return Err(SettlementError::NonPositiveAmount);
    }
    let tax = amount * tax_rate;
    Ok(Withholding {
        gross: amount,
        tax,
        net: amount - tax,
    })
}

/// Routes a new withdrawal to automatic or manual audit by size.
#[must_use]
pub fn route_audit(amount: Decimal, manual_threshold: Decimal) -> WithdrawalStatus {
    if amount > manual_threshold {
        WithdrawalStatus::PendingManual
    } else {
        WithdrawalStatus::PendingAuto
    }
}

/// Validates an audit decision against the withdrawal's current state.
///
/// # Errors
///
/// Returns `WithdrawalAlreadyResolved` when the withdrawal was already
/// processed; both audit outcomes are terminal.
pub fn audit_transition(
    current: WithdrawalStatus,
    approve: bool,
) -> Result<WithdrawalStatus, SettlementError> {
    if !current.is_auditable() {
        return Err(SettlementError::WithdrawalAlreadyResolved(match current {
            WithdrawalStatus::Approved => "approved",
            _ => "rejected",
        }));
    }
    Ok(if approve {
        WithdrawalStatus::Approved
    } else {
        WithdrawalStatus::Rejected
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_withholding_at_six_percent() {
        let w = compute_withholding(dec!(1000.00), dec!(0.06)).unwrap();
        assert_eq!(w.tax, dec!(60.0000));
        assert_eq!(w.net, dec!(940.0000));
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        assert_eq!(
            compute_withholding(dec!(0), dec!(0.06)).unwrap_err(),
            SettlementError::NonPositiveAmount
        );
        assert_eq!(
            compute_withholding(dec!(-5), dec!(0.06)).unwrap_err(),
            SettlementError::NonPositiveAmount
        );
    }

    #[test]
    fn test_threshold_routing_is_strict() {
        // Exactly at the threshold stays automatic; only above goes manual.
        assert_eq!(route_audit(dec!(5000.00), dec!(5000.00)), WithdrawalStatus::PendingAuto);
        assert_eq!(route_audit(dec!(5000.01), dec!(5000.00)), WithdrawalStatus::PendingManual);
        assert_eq!(route_audit(dec!(10.00), dec!(5000.00)), WithdrawalStatus::PendingAuto);
    }

    #[test]
    fn test_audit_transitions() {
        assert_eq!(
            audit_transition(WithdrawalStatus::PendingAuto, true).unwrap(),
            WithdrawalStatus::Approved
        );
        assert_eq!(
            audit_transition(WithdrawalStatus::PendingManual, false).unwrap(),
            WithdrawalStatus::Rejected
        );
        assert!(audit_transition(WithdrawalStatus::Approved, true).is_err());
        assert!(audit_transition(WithdrawalStatus::Rejected, false).is_err());
    }

    proptest! {
        /// Withholding never loses money: gross always equals tax plus net.
        #[test]
        fn prop_withholding_conserves_gross(cents in 1i64..1_000_000_000) {
            let amount = Decimal::new(cents, 2);
            let w = compute_withholding(amount, dec!(0.06)).unwrap();
            prop_assert_eq!(w.tax + w.net, w.gross);
            prop_assert!(w.tax >= Decimal::ZERO);
            prop_assert!(w.net >= Decimal::ZERO);
        }
    }
}
