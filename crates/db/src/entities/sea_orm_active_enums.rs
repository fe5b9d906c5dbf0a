//! Database-backed enums for status and type columns.
//!
//! All enums are stored as lowercase strings. Conversions to and from the
//! domain enums in `trellis-core` keep the pure logic free of any `SeaORM`
//! types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum OrderStatus {
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// Kind of a pending reward.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum RewardType {
    #[sea_orm(string_value = "referral")]
    Referral,
    #[sea_orm(string_value = "team")]
    Team,
}

/// Audit state of a pending reward.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum RewardStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Who a coupon was issued to.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum CouponType {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "merchant")]
    Merchant,
}

/// Coupon redemption state.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum CouponStatus {
    #[sea_orm(string_value = "unused")]
    Unused,
    #[sea_orm(string_value = "used")]
    Used,
    #[sea_orm(string_value = "expired")]
    Expired,
}

/// Which balance a withdrawal draws from.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum WithdrawalType {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "merchant")]
    Merchant,
}

/// Audit state of a withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum WithdrawalStatus {
    #[sea_orm(string_value = "pending_auto")]
    PendingAuto,
    #[sea_orm(string_value = "pending_manual")]
    PendingManual,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Direction of an account flow entry.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum FlowType {
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
    #[sea_orm(string_value = "coupon")]
    Coupon,
}

/// Which points ledger a log entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PointsKind {
    #[sea_orm(string_value = "member")]
    Member,
    #[sea_orm(string_value = "merchant")]
    Merchant,
}

impl From<trellis_core::types::RewardStatus> for RewardStatus {
    fn from(value: trellis_core::types::RewardStatus) -> Self {
        match value {
            trellis_core::types::RewardStatus::Pending => Self::Pending,
            trellis_core::types::RewardStatus::Approved => Self::Approved,
            trellis_core::types::RewardStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<RewardStatus> for trellis_core::types::RewardStatus {
    fn from(value: RewardStatus) -> Self {
        match value {
            RewardStatus::Pending => Self::Pending,
            RewardStatus::Approved => Self::Approved,
            RewardStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<trellis_core::types::RewardType> for RewardType {
    fn from(value: trellis_core::types::RewardType) -> Self {
        match value {
            trellis_core::types::RewardType::Referral => Self::Referral,
            trellis_core::types::RewardType::Team => Self::Team,
        }
    }
}

impl From<RewardType> for trellis_core::types::RewardType {
    fn from(value: RewardType) -> Self {
        match value {
            RewardType::Referral => Self::Referral,
            RewardType::Team => Self::Team,
        }
    }
}

impl From<trellis_core::types::WithdrawalStatus> for WithdrawalStatus {
    fn from(value: trellis_core::types::WithdrawalStatus) -> Self {
        match value {
            trellis_core::types::WithdrawalStatus::PendingAuto => Self::PendingAuto,
            trellis_core::types::WithdrawalStatus::PendingManual => Self::PendingManual,
            trellis_core::types::WithdrawalStatus::Approved => Self::Approved,
            trellis_core::types::WithdrawalStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<WithdrawalStatus> for trellis_core::types::WithdrawalStatus {
    fn from(value: WithdrawalStatus) -> Self {
        match value {
            WithdrawalStatus::PendingAuto => Self::PendingAuto,
            WithdrawalStatus::PendingManual => Self::PendingManual,
            WithdrawalStatus::Approved => Self::Approved,
            WithdrawalStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<trellis_core::types::WithdrawalType> for WithdrawalType {
    fn from(value: trellis_core::types::WithdrawalType) -> Self {
        match value {
            trellis_core::types::WithdrawalType::User => Self::User,
            trellis_core::types::WithdrawalType::Merchant => Self::Merchant,
        }
    }
}

impl From<WithdrawalType> for trellis_core::types::WithdrawalType {
    fn from(value: WithdrawalType) -> Self {
        match value {
            WithdrawalType::User => Self::User,
            WithdrawalType::Merchant => Self::Merchant,
        }
    }
}
