//! `SeaORM` Entity for the pending_rewards table.
//!
//! Rewards earned during settlement sit here until an auditor approves
//! them (which mints a coupon) or rejects them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{RewardStatus, RewardType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_rewards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub reward_type: RewardType,
    pub amount: Decimal,
    pub order_id: i64,
    /// Depth of the team-reward hop; absent for referral rewards.
    pub layer: Option<i16>,
    pub status: RewardStatus,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
