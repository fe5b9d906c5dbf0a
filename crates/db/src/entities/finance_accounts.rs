//! `SeaORM` Entity for the finance_accounts table.
//!
//! One row per platform pool. `account_type` is the stable key the
//! repositories look pools up by; it matches
//! [`trellis_core::PoolAccount::as_str`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "finance_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_name: String,
    #[sea_orm(unique)]
    pub account_type: String,
    pub balance: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
