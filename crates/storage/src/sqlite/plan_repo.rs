use chrono::Utc;
use study_core::model::{Plan, PlanId, UserId};

use super::SqliteRepository;
use super::mapping::{map_plan_row, plan_to_json, version_from_i64, version_to_i64};
use crate::repository::{PlanRepository, PlanVersion, StorageError, StoredPlan};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl PlanRepository for SqliteRepository {
    async fn insert_plan(&self, plan: &Plan) -> Result<PlanVersion, StorageError> {
        let document = plan_to_json(plan)?;

        let res = sqlx::query(
            r"
            INSERT INTO plans (id, user_id, created_at, daily_budget_minutes, document, version, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            ",
        )
        .bind(plan.id().as_str())
        .bind(plan.user_id().as_str())
        .bind(plan.created_at())
        .bind(i64::from(plan.daily_budget_minutes()))
        .bind(document)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(1),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(e) => Err(conn(e)),
        }
    }

    async fn get_plan(&self, id: &PlanId) -> Result<StoredPlan, StorageError> {
        let row = sqlx::query(
            r"
                SELECT document, version
                FROM plans
                WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_plan_row(&row)
    }

    async fn save_plan(
        &self,
        plan: &Plan,
        expected_version: PlanVersion,
    ) -> Result<PlanVersion, StorageError> {
        let document = plan_to_json(plan)?;
        let expected = version_to_i64(expected_version)?;

        let res = sqlx::query(
            r"
            UPDATE plans
            SET document = ?1,
                daily_budget_minutes = ?2,
                version = version + 1,
                updated_at = ?3
            WHERE id = ?4 AND version = ?5
            ",
        )
        .bind(document)
        .bind(i64::from(plan.daily_budget_minutes()))
        .bind(Utc::now())
        .bind(plan.id().as_str())
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 1 {
            return Ok(expected_version + 1);
        }

        // Nothing matched: either the plan is gone or someone else wrote first.
        let current: Option<i64> = sqlx::query_scalar("SELECT version FROM plans WHERE id = ?1")
            .bind(plan.id().as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match current {
            None => Err(StorageError::NotFound),
            Some(found) => {
                let found = version_from_i64(found)?;
                tracing::warn!(
                    plan_id = %plan.id(),
                    expected = expected_version,
                    found,
                    "plan version moved on, rejecting save"
                );
                Err(StorageError::Conflict)
            }
        }
    }

    async fn list_plans_for_user(&self, user_id: &UserId) -> Result<Vec<StoredPlan>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT document, version
                FROM plans
                WHERE user_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_plan_row(&row)?);
        }
        Ok(out)
    }
}
