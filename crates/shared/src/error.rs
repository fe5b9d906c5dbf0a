//! Application-wide error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Every multi-step mutation runs inside one store transaction; any of these
/// errors triggers a full rollback, so partial effects are never observable.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (user, product, order, withdrawal, merchant).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A pool or user balance is below the required amount.
    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        /// The account or balance that came up short.
        account: String,
        /// The amount the operation needed.
        required: Decimal,
        /// The amount actually available.
        available: Decimal,
    },

    /// Too many member-product purchases inside the rolling window.
    #[error("Purchase rate limit exceeded: at most {limit} member orders per 24h")]
    RateLimitExceeded {
        /// The configured window limit.
        limit: u64,
    },

    /// Point redemption would discount more than the allowed share.
    #[error("Points discount limit exceeded: at most {max_points} points on this order")]
    DiscountLimitExceeded {
        /// Maximum points redeemable on this order.
        max_points: i64,
    },

    /// The buyer does not hold the requested points.
    #[error("Insufficient points: requested {requested}, held {held}")]
    InsufficientPoints {
        /// Points the buyer asked to redeem.
        requested: i64,
        /// Points the buyer holds.
        held: i64,
    },

    /// Operation not valid for the entity's current state (re-audit,
    /// double refund, self-referral, duplicate referrer or order number).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Lock contention; the operation is retryable.
    #[error("Store busy: {0}")]
    Busy(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    /// Returns true if the caller may safely retry the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::DiscountLimitExceeded { .. } => "DISCOUNT_LIMIT_EXCEEDED",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Busy(_) => "BUSY",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::NotFound(String::new()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            AppError::InsufficientFunds {
                account: "subsidy_pool".into(),
                required: dec!(10),
                available: dec!(5),
            }
            .error_code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            AppError::RateLimitExceeded { limit: 2 }.error_code(),
            "RATE_LIMIT_EXCEEDED"
        );
        assert_eq!(
            AppError::InvalidState(String::new()).error_code(),
            "INVALID_STATE"
        );
    }

    #[test]
    fn test_only_busy_is_retryable() {
        assert!(AppError::Busy("lock timeout".into()).is_retryable());
        assert!(!AppError::NotFound("user 7".into()).is_retryable());
        assert!(!AppError::Database(String::new()).is_retryable());
    }

    #[test]
    fn test_insufficient_funds_display_carries_amounts() {
        let err = AppError::InsufficientFunds {
            account: "platform_revenue_pool".into(),
            required: dec!(1584.00),
            available: dec!(100.00),
        };
        let msg = err.to_string();
        assert!(msg.contains("platform_revenue_pool"));
        assert!(msg.contains("1584.00"));
        assert!(msg.contains("100.00"));
    }
}
