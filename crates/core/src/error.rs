//! Error types for settlement rule violations.

use thiserror::Error;
use trellis_shared::AppError;

/// Errors raised by the pure settlement rules.
///
/// The database layer converts these into the application-wide error type;
/// each carries enough context for the caller to explain the rejection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettlementError {
    /// Order quantity must be at least one.
    #[error("Order quantity must be at least 1")]
    ZeroQuantity,

    /// The buyer does not hold the requested points.
    #[error("Insufficient points: requested {requested}, held {held}")]
    InsufficientPoints {
        /// Points the buyer asked to redeem.
        requested: i64,
        /// Points the buyer holds.
        held: i64,
    },

    /// Point redemption may not discount more than half the order value.
    #[error("Points discount limited to 50% of the order: at most {max_points} points")]
    DiscountLimitExceeded {
        /// Maximum points redeemable on this order.
        max_points: i64,
    },

    /// Points cannot be redeemed against member products.
    #[error("Points cannot be redeemed on member products")]
    PointsOnMemberProduct,

    /// A user cannot refer themselves.
    #[error("A user cannot be their own referrer")]
    SelfReferral,

    /// No pending rewards matched the requested batch.
    #[error("No pending rewards matched the requested ids")]
    NoPendingRewards,

    /// The reward is not in a state that allows this transition.
    #[error("Reward is already {0}")]
    RewardAlreadyResolved(&'static str),

    /// The withdrawal is not in a state that allows this transition.
    #[error("Withdrawal is already {0}")]
    WithdrawalAlreadyResolved(&'static str),

    /// Withdrawal amount must be positive.
    #[error("Withdrawal amount must be positive")]
    NonPositiveAmount,
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::InsufficientPoints { requested, held } => {
                Self::InsufficientPoints { requested, held }
            }
            SettlementError::DiscountLimitExceeded { max_points } => {
                Self::DiscountLimitExceeded { max_points }
            }
            SettlementError::ZeroQuantity
            | SettlementError::NonPositiveAmount
            | SettlementError::PointsOnMemberProduct => Self::Validation(err.to_string()),
            SettlementError::SelfReferral
            | SettlementError::NoPendingRewards
            | SettlementError::RewardAlreadyResolved(_)
            | SettlementError::WithdrawalAlreadyResolved(_) => Self::InvalidState(err.to_string()),
        }
    }
}
