//! Withdrawal settlement: apply with tax withholding, then audit.
//!
//! The gross amount leaves the user's balance at apply time. Approval
//! only records the net payout; rejection refunds the gross.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet,
    QueryFilter, QuerySelect, Set,
};
use trellis_core::types::WithdrawalType;
use trellis_core::withdrawal::{audit_transition, compute_withholding, route_audit};
use trellis_core::PoolAccount;
use trellis_shared::{AppError, AppResult, SettlementConfig};

use crate::entities::{
    sea_orm_active_enums::FlowType, users, withdrawals,
};
use crate::repositories::account::{self, FlowEntry};
use crate::txn::{self, map_db_err};

/// Balance field a withdrawal type draws from.
const fn balance_field(withdrawal_type: WithdrawalType) -> &'static str {
    match withdrawal_type {
        WithdrawalType::User => "promotion_balance",
        WithdrawalType::Merchant => "merchant_balance",
    }
}

/// Withdrawal request and audit operations.
#[derive(Debug, Clone)]
pub struct WithdrawalRepository {
    db: DatabaseConnection,
    rules: SettlementConfig,
}

impl WithdrawalRepository {
    /// Creates a new withdrawal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, rules: SettlementConfig) -> Self {
        Self { db, rules }
    }

    /// Files a withdrawal request and returns its id.
    ///
    /// Debits the gross amount immediately, withholds tax into the
    /// company cash ledger, and routes the request to automatic or
    /// manual audit by amount.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Validation` for a
    /// non-positive amount, `InsufficientFunds` when the balance cannot
    /// cover the request, and `Busy` on lock contention.
    pub async fn apply_withdrawal(
        &self,
        user_id: i64,
        amount: Decimal,
        withdrawal_type: WithdrawalType,
    ) -> AppResult<i64> {
        let withholding = compute_withholding(amount, self.rules.tax_rate)?;
        let field = balance_field(withdrawal_type);

        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;

        let user = users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let available = match withdrawal_type {
            WithdrawalType::User => user.promotion_balance,
            WithdrawalType::Merchant => user.merchant_balance,
        };
        if available < amount {
            return Err(AppError::InsufficientFunds {
                account: format!("user:{user_id}:{field}"),
                required: amount,
                available,
            });
        }

        let status = route_audit(amount, self.rules.manual_audit_threshold);
        let withdrawal = withdrawals::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            amount: Set(withholding.gross),
            tax_amount: Set(withholding.tax),
            actual_amount: Set(withholding.net),
            withdrawal_type: Set(withdrawal_type.into()),
            status: Set(status.into()),
            audit_remark: Set(None),
            created_at: Set(Utc::now().into()),
            processed_at: Set(None),
        };
        let withdrawal = withdrawal.insert(&txn).await.map_err(map_db_err)?;

        self.debit_user_balance(&txn, user_id, withdrawal_type, amount)
            .await?;
        account::record_flow(
            &txn,
            FlowEntry {
                account_type: field,
                related_user: Some(user_id),
                change_amount: -amount,
                flow_type: FlowType::Expense,
                remark: format!("Withdrawal #{} hold", withdrawal.id),
            },
        )
        .await?;

        account::credit_pool(&txn, PoolAccount::CompanyBalance, withholding.tax).await?;
        account::record_flow(
            &txn,
            FlowEntry {
                account_type: PoolAccount::CompanyBalance.as_str(),
                related_user: Some(user_id),
                change_amount: withholding.tax,
                flow_type: FlowType::Income,
                remark: format!("Withdrawal #{} tax withheld", withdrawal.id),
            },
        )
        .await?;

        txn.commit().await.map_err(map_db_err)?;
        tracing::info!(
            withdrawal_id = withdrawal.id,
            user_id,
            %amount,
            tax = %withholding.tax,
            net = %withholding.net,
            "withdrawal filed"
        );
        Ok(withdrawal.id)
    }

    /// Resolves a pending withdrawal.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown withdrawal, `InvalidState` when
    /// it was already resolved, and `Busy` on lock contention.
    pub async fn audit_withdrawal(
        &self,
        withdrawal_id: i64,
        approve: bool,
        auditor: &str,
    ) -> AppResult<()> {
        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;

        let withdrawal = withdrawals::Entity::find_by_id(withdrawal_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("withdrawal {withdrawal_id}")))?;

        let next = audit_transition(withdrawal.status.clone().into(), approve)?;
        let withdrawal_type = WithdrawalType::from(withdrawal.withdrawal_type.clone());

        if approve {
            // Funds left the balance at apply time; only the payout is
            // recorded here.
            account::record_flow(
                &txn,
                FlowEntry {
                    account_type: "withdrawal",
                    related_user: Some(withdrawal.user_id),
                    change_amount: withdrawal.actual_amount,
                    flow_type: FlowType::Income,
                    remark: format!("Withdrawal #{withdrawal_id} paid out"),
                },
            )
            .await?;
        } else {
            self.credit_user_balance(&txn, withdrawal.user_id, withdrawal_type, withdrawal.amount)
                .await?;
            account::record_flow(
                &txn,
                FlowEntry {
                    account_type: balance_field(withdrawal_type),
                    related_user: Some(withdrawal.user_id),
                    change_amount: withdrawal.amount,
                    flow_type: FlowType::Income,
                    remark: format!("Withdrawal #{withdrawal_id} rejected, funds returned"),
                },
            )
            .await?;
        }

        let mut active: withdrawals::ActiveModel = withdrawal.into();
        active.status = Set(next.into());
        active.audit_remark = Set(Some(format!("audited by {auditor}")));
        active.processed_at = Set(Some(Utc::now().into()));
        active.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        tracing::info!(withdrawal_id, approve, auditor, "withdrawal audited");
        Ok(())
    }

    async fn debit_user_balance(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
        withdrawal_type: WithdrawalType,
        amount: Decimal,
    ) -> AppResult<()> {
        let column = match withdrawal_type {
            WithdrawalType::User => users::Column::PromotionBalance,
            WithdrawalType::Merchant => users::Column::MerchantBalance,
        };
        users::Entity::update_many()
            .col_expr(column, Expr::col(column).sub(amount))
            .filter(users::Column::Id.eq(user_id))
            .exec(txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn credit_user_balance(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
        withdrawal_type: WithdrawalType,
        amount: Decimal,
    ) -> AppResult<()> {
        let column = match withdrawal_type {
            WithdrawalType::User => users::Column::PromotionBalance,
            WithdrawalType::Merchant => users::Column::MerchantBalance,
        };
        users::Entity::update_many()
            .col_expr(column, Expr::col(column).add(amount))
            .filter(users::Column::Id.eq(user_id))
            .exec(txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
