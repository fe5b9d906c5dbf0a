//! `SeaORM` Entity for the weekly_subsidy_records table.
//!
//! One row per user per points ledger per distribution week. The unique
//! `(user_id, side, week_start)` triple doubles as the idempotency
//! marker that lets a crashed subsidy run be re-executed without
//! double-crediting.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PointsKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "weekly_subsidy_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    /// Which points ledger this payout drew from.
    pub side: PointsKind,
    pub week_start: Date,
    pub subsidy_amount: Decimal,
    pub points_before: i64,
    pub points_deducted: i64,
    /// Absent when the merchant-side payout is disabled by configuration.
    pub coupon_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
