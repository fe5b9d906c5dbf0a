//! Core settlement logic for Trellis.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. Store lookups are injected as closures so every rule can be
//! exercised without a database.
//!
//! # Modules
//!
//! - `allocation` - static fund-split table across the platform pools
//! - `order` - order settlement math (discounts, upgrades, point accrual)
//! - `referral` - referral chain walking and downline enumeration
//! - `reward` - pending-reward lifecycle and coupon windows
//! - `subsidy` - weekly point-to-coupon conversion math
//! - `withdrawal` - tax withholding and audit routing

pub mod allocation;
pub mod error;
pub mod order;
pub mod referral;
pub mod reward;
pub mod subsidy;
pub mod types;
pub mod withdrawal;

pub use allocation::{PoolAccount, COMPANY_POINTS_SHARE, REVENUE_SHARE};
pub use error::SettlementError;
