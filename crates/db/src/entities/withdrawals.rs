//! `SeaORM` Entity for the withdrawals table.
//!
//! The gross amount is debited from the user at apply time; `tax_amount`
//! plus `actual_amount` always equals `amount`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{WithdrawalStatus, WithdrawalType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub actual_amount: Decimal,
    pub withdrawal_type: WithdrawalType,
    pub status: WithdrawalStatus,
    pub audit_remark: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub processed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
