//! `SeaORM` Entity for the account_flows table.
//!
//! Append-only audit trail of every money movement. `account_type` names
//! either a platform pool or a per-user balance field
//! (`promotion_balance` / `merchant_balance`); `balance_after` is a
//! snapshot taken at write time and may be absent for flows that do not
//! touch a tracked balance (coupon issuance, withdrawal payout).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::FlowType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "account_flows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_type: String,
    pub related_user: Option<i64>,
    pub change_amount: Decimal,
    pub balance_after: Option<Decimal>,
    pub flow_type: FlowType,
    pub remark: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
