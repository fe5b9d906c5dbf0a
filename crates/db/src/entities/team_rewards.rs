//! `SeaORM` Entity for the team_rewards table.
//!
//! Historical record of team rewards by order, used to reverse them on
//! refund.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "team_rewards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipient of the reward.
    pub user_id: i64,
    /// Buyer whose purchase produced it.
    pub from_user_id: i64,
    pub order_id: i64,
    pub layer: i16,
    pub reward_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
