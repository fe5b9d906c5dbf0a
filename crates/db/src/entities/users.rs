//! `SeaORM` Entity for the users table.
//!
//! A row holds both the consumer-side state (member level, points,
//! promotion balance) and the merchant-side state (merchant points and
//! balance) since a merchant account is just a user that sells.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub mobile: String,
    pub name: String,
    pub member_level: i16,
    pub points: i64,
    pub promotion_balance: Decimal,
    pub merchant_points: i64,
    pub merchant_balance: Decimal,
    /// 1 = normal, 9 = honor director.
    pub status: i16,
    pub level_changed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
