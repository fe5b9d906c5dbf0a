//! Domain types shared by the settlement rules.

use serde::{Deserialize, Serialize};

/// Order completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order settled successfully.
    Completed,
    /// Order has been reversed.
    Refunded,
}

/// Kind of commission queued for an upstream member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    /// Direct-referrer reward on a first membership purchase.
    Referral,
    /// Layer-matched reward for an upstream member.
    Team,
}

/// Pending-reward audit state.
///
/// `Pending` is the only non-terminal state; approval and rejection are
/// terminal and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    /// Awaiting manual audit.
    Pending,
    /// Approved and converted into a coupon.
    Approved,
    /// Rejected; no payout.
    Rejected,
}

impl RewardStatus {
    /// Returns true if this state still accepts an audit decision.
    #[must_use]
    pub fn is_auditable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Coupon beneficiary role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    /// Coupon held in the user's consumer role.
    User,
    /// Coupon held in the user's merchant role.
    Merchant,
}

/// Coupon redemption state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    /// Issued and spendable inside the validity window.
    Unused,
    /// Redeemed.
    Used,
    /// Validity window elapsed.
    Expired,
}

/// Which cash balance a withdrawal draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalType {
    /// Promotion (reward) balance.
    User,
    /// Merchant sales balance.
    Merchant,
}

/// Withdrawal audit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Small request; eligible for automatic approval.
    PendingAuto,
    /// Large request; manual audit required.
    PendingManual,
    /// Paid out (terminal).
    Approved,
    /// Rejected and refunded (terminal).
    Rejected,
}

impl WithdrawalStatus {
    /// Returns true if this state still accepts an audit decision.
    #[must_use]
    pub fn is_auditable(&self) -> bool {
        matches!(self, Self::PendingAuto | Self::PendingManual)
    }
}

/// Direction tag on an account-flow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    /// Balance increased.
    Income,
    /// Balance decreased.
    Expense,
    /// Zero-amount audit marker for an off-ledger coupon issue.
    Coupon,
}

/// User account status code stored on the users row.
pub mod user_status {
    /// Regular account.
    pub const NORMAL: i16 = 1;
    /// Honor director: granted above level 6 by the promotion check.
    pub const HONOR_DIRECTOR: i16 = 9;
}

/// Highest purchasable member level.
pub const MAX_MEMBER_LEVEL: i16 = 6;
