//! Referral graph maintenance: edges, team queries, director promotion.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, NotSet, QueryFilter, Set, Statement, Value,
};
use trellis_core::referral::qualifies_for_director;
use trellis_core::types::{user_status, MAX_MEMBER_LEVEL};
use trellis_core::SettlementError;
use trellis_shared::{AppError, AppResult, SettlementConfig};

use crate::entities::{user_referrals, users};
use crate::txn::{self, map_db_err};

/// A user's referrer with display attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerInfo {
    /// Referrer user id.
    pub referrer_id: i64,
    /// Referrer display name.
    pub name: String,
    /// Referrer member level.
    pub member_level: i16,
}

/// A downline member with their chain distance.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct TeamMember {
    /// Member user id.
    pub user_id: i64,
    /// Member display name.
    pub name: String,
    /// Member level.
    pub member_level: i16,
    /// Referral hops below the queried user (direct referees are 1).
    pub layer: i32,
}

#[derive(FromQueryResult)]
struct CountRow {
    count: i64,
}

/// Referral edge and team operations.
#[derive(Debug, Clone)]
pub struct ReferralRepository {
    db: DatabaseConnection,
    rules: SettlementConfig,
}

impl ReferralRepository {
    /// Creates a new referral repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, rules: SettlementConfig) -> Self {
        Self { db, rules }
    }

    /// Links a user to their referrer. An edge is immutable once set.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or referrer, and
    /// `InvalidState` for self-referral or an already-linked user.
    pub async fn set_referrer(&self, user_id: i64, referrer_id: i64) -> AppResult<()> {
        if user_id == referrer_id {
            return Err(SettlementError::SelfReferral.into());
        }

        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;

        let referrer = users::Entity::find_by_id(referrer_id)
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("referrer {referrer_id}")))?;
        users::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let existing = user_referrals::Entity::find()
            .filter(user_referrals::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(map_db_err)?;
        if existing.is_some() {
            return Err(AppError::InvalidState(format!(
                "user {user_id} already has a referrer"
            )));
        }

        let edge = user_referrals::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            referrer_id: Set(referrer_id),
            created_at: Set(Utc::now().into()),
        };
        edge.insert(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        tracing::info!(
            user_id,
            referrer_id,
            referrer_level = referrer.member_level,
            "referrer set"
        );
        Ok(())
    }

    /// Returns a user's referrer, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_referrer(&self, user_id: i64) -> AppResult<Option<ReferrerInfo>> {
        let edge = user_referrals::Entity::find()
            .filter(user_referrals::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        let Some(edge) = edge else {
            return Ok(None);
        };

        let referrer = users::Entity::find_by_id(edge.referrer_id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("referrer {}", edge.referrer_id)))?;

        Ok(Some(ReferrerInfo {
            referrer_id: referrer.id,
            name: referrer.name,
            member_level: referrer.member_level,
        }))
    }

    /// Enumerates a user's downline up to `max_layer` hops, ordered by
    /// layer then user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_user_team(&self, user_id: i64, max_layer: u32) -> AppResult<Vec<TeamMember>> {
        let sql = r"
            WITH RECURSIVE team_tree AS (
                SELECT user_id, referrer_id, 1 AS layer
                FROM user_referrals WHERE referrer_id = $1
                UNION ALL
                SELECT ur.user_id, ur.referrer_id, tt.layer + 1
                FROM user_referrals ur
                JOIN team_tree tt ON ur.referrer_id = tt.user_id
                WHERE tt.layer < $2
            )
            SELECT tt.user_id, u.name, u.member_level, tt.layer
            FROM team_tree tt JOIN users u ON tt.user_id = u.id
            ORDER BY tt.layer, tt.user_id";

        TeamMember::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            [Value::from(user_id), Value::from(i64::from(max_layer))],
        ))
        .all(&self.db)
        .await
        .map_err(map_db_err)
    }

    /// Promotes qualifying max-level members to honor director and
    /// returns how many were promoted.
    ///
    /// A member qualifies with at least 3 directly-referred max-level
    /// members and at least 10 in the bounded downline.
    ///
    /// # Errors
    ///
    /// Returns an error if any query fails; the whole sweep rolls back.
    pub async fn check_director_promotion(&self) -> AppResult<u64> {
        let txn = txn::begin(&self.db, self.rules.lock_wait_timeout_ms).await?;

        let candidate_ids: Vec<i64> = users::Entity::find()
            .filter(users::Column::MemberLevel.eq(MAX_MEMBER_LEVEL))
            .all(&txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|u| u.id)
            .collect();

        let mut promoted = 0u64;
        for user_id in candidate_ids {
            let direct = count_direct_level6(&txn, user_id).await?;
            let downline = self.count_downline_level6(&txn, user_id).await?;
            if !qualifies_for_director(direct, downline) {
                continue;
            }

            let updated = users::Entity::update_many()
                .col_expr(
                    users::Column::Status,
                    sea_orm::sea_query::Expr::value(user_status::HONOR_DIRECTOR),
                )
                .filter(users::Column::Id.eq(user_id))
                .filter(users::Column::Status.ne(user_status::HONOR_DIRECTOR))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;
            if updated.rows_affected > 0 {
                promoted += 1;
                tracing::info!(user_id, direct, downline, "promoted to honor director");
            }
        }

        txn.commit().await.map_err(map_db_err)?;
        tracing::info!(promoted, "director promotion sweep finished");
        Ok(promoted)
    }

    async fn count_downline_level6<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> AppResult<u64> {
        let sql = r"
            WITH RECURSIVE team AS (
                SELECT user_id, referrer_id, 1 AS layer
                FROM user_referrals WHERE referrer_id = $1
                UNION ALL
                SELECT ur.user_id, ur.referrer_id, t.layer + 1
                FROM user_referrals ur
                JOIN team t ON ur.referrer_id = t.user_id
                WHERE t.layer < $2
            )
            SELECT COUNT(DISTINCT t.user_id) AS count
            FROM team t JOIN users u ON t.user_id = u.id
            WHERE u.member_level = $3";

        let row = CountRow::find_by_statement(Statement::from_sql_and_values(
            conn.get_database_backend(),
            sql,
            [
                Value::from(user_id),
                Value::from(i64::from(self.rules.max_team_layer)),
                Value::from(MAX_MEMBER_LEVEL),
            ],
        ))
        .one(conn)
        .await
        .map_err(map_db_err)?;

        Ok(row.map_or(0, |r| u64::try_from(r.count).unwrap_or(0)))
    }
}

/// Counts a member's directly-referred users at max level.
async fn count_direct_level6<C: ConnectionTrait>(conn: &C, user_id: i64) -> AppResult<u64> {
    let sql = r"
        SELECT COUNT(DISTINCT u.id) AS count
        FROM user_referrals ur JOIN users u ON ur.user_id = u.id
        WHERE ur.referrer_id = $1 AND u.member_level = $2";

    let row = CountRow::find_by_statement(Statement::from_sql_and_values(
        conn.get_database_backend(),
        sql,
        [Value::from(user_id), Value::from(MAX_MEMBER_LEVEL)],
    ))
    .one(conn)
    .await
    .map_err(map_db_err)?;

    Ok(row.map_or(0, |r| u64::try_from(r.count).unwrap_or(0)))
}
