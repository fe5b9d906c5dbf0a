//! `SeaORM` entity definitions for the settlement ledger schema.

pub mod account_flows;
pub mod coupons;
pub mod finance_accounts;
pub mod order_items;
pub mod orders;
pub mod pending_rewards;
pub mod points_logs;
pub mod products;
pub mod sea_orm_active_enums;
pub mod team_rewards;
pub mod user_referrals;
pub mod users;
pub mod weekly_subsidy_records;
pub mod withdrawals;
