use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

use storage::repository::{PlanRepository, PlanVersion, StorageError, StoredPlan};
use study_core::model::{Plan, PlanId, UserId};
use study_core::rebalance::{RebalanceContext, RebalanceReport, Rebalanced, rebalance};
use study_core::time::{clamp_day_offset, today_session_index};

use crate::Clock;
use crate::error::RebalanceError;

/// A rebalanced plan as it was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceOutcome {
    pub plan: Plan,
    pub version: PlanVersion,
    pub report: RebalanceReport,
}

/// Loads a stored plan, rebalances it for "today" and writes it back.
///
/// This service owns:
/// - the time source (`Clock`)
/// - repository access
///
/// Each call is one read-modify-write against a single plan. Saves are
/// version-checked, so a concurrent rebalance of the same plan surfaces as
/// `RebalanceError::Conflict` instead of silently dropping carried work.
#[derive(Clone)]
pub struct RebalanceService {
    clock: Clock,
    plans: Arc<dyn PlanRepository>,
}

impl RebalanceService {
    #[must_use]
    pub fn new(clock: Clock, plans: Arc<dyn PlanRepository>) -> Self {
        Self { clock, plans }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Fetch a plan on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RebalanceError::NotFound` if the plan is missing, unreadable,
    /// or owned by another user, or `RebalanceError::Storage` for backend
    /// failures.
    pub async fn get_plan(
        &self,
        plan_id: &PlanId,
        user_id: &UserId,
    ) -> Result<StoredPlan, RebalanceError> {
        let stored = match self.plans.get_plan(plan_id).await {
            Ok(stored) => stored,
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!(plan_id = %plan_id, %reason, "stored plan document is malformed");
                return Err(RebalanceError::NotFound(plan_id.clone()));
            }
            Err(err) => return Err(RebalanceError::from_storage(plan_id, err)),
        };
        if stored.plan.user_id() != user_id {
            tracing::debug!(plan_id = %plan_id, user_id = %user_id, "plan owned by another user");
            return Err(RebalanceError::NotFound(plan_id.clone()));
        }
        Ok(stored)
    }

    /// Rebalance a stored plan as of `today` and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `RebalanceError::NotFound` for missing, malformed, or foreign plans,
    /// `RebalanceError::Conflict` if another writer saved first, and
    /// `RebalanceError::Storage` for backend failures. Nothing is retried.
    pub async fn rebalance_stored(
        &self,
        plan_id: &PlanId,
        user_id: &UserId,
        today: NaiveDate,
    ) -> Result<RebalanceOutcome, RebalanceError> {
        let stored = self.get_plan(plan_id, user_id).await?;
        let today_index = today_session_index(stored.plan.created_at(), today);

        let Rebalanced { plan, report } =
            rebalance(&stored.plan, today_index, &RebalanceContext::new());

        let version = match self.plans.save_plan(&plan, stored.version).await {
            Ok(version) => version,
            Err(err) => {
                let err = RebalanceError::from_storage(plan_id, err);
                if matches!(err, RebalanceError::Conflict(_)) {
                    tracing::warn!(plan_id = %plan_id, read_version = stored.version, "concurrent rebalance detected");
                }
                return Err(err);
            }
        };

        tracing::info!(
            plan_id = %plan_id,
            today = %today,
            today_index = report.today_index,
            sessions_locked = report.sessions_locked,
            activities_carried = report.activities_carried,
            sessions_repacked = report.sessions_repacked,
            version,
            "rebalanced plan"
        );

        Ok(RebalanceOutcome {
            plan,
            version,
            report,
        })
    }

    /// Rebalance using the service clock's current date.
    ///
    /// # Errors
    ///
    /// Same as [`RebalanceService::rebalance_stored`].
    pub async fn rebalance_today(
        &self,
        plan_id: &PlanId,
        user_id: &UserId,
    ) -> Result<RebalanceOutcome, RebalanceError> {
        self.rebalance_stored(plan_id, user_id, self.clock.today())
            .await
    }

    /// In-process rebalance of an in-memory plan; nothing is persisted.
    ///
    /// Negative offsets are treated as day 0.
    #[must_use]
    pub fn preview(plan: &Plan, day_offset: i64) -> Rebalanced {
        let today_index = clamp_day_offset(day_offset);
        let out = rebalance(plan, today_index, &RebalanceContext::new());
        tracing::debug!(
            plan_id = %plan.id(),
            today_index,
            sessions_repacked = out.report.sessions_repacked,
            "previewed rebalance"
        );
        out
    }
}

impl fmt::Debug for RebalanceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebalanceService")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::InMemoryRepository;
    use study_core::model::{Activity, Session};
    use study_core::time::fixed_now;

    fn build_plan() -> Plan {
        Plan::new(
            PlanId::new("p1"),
            UserId::new("u1"),
            fixed_now(),
            10,
            vec![
                Session::new("1", vec![Activity::read("ch1", 8)]),
                Session::new("2", vec![Activity::quiz("ch1", "remember", 5)]),
            ],
        )
    }

    async fn service_with_plan() -> (RebalanceService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        repo.insert_plan(&build_plan()).await.unwrap();
        let service = RebalanceService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()));
        (service, repo)
    }

    fn day(offset: i64) -> NaiveDate {
        (fixed_now() + Duration::days(offset)).date_naive()
    }

    #[tokio::test]
    async fn rebalance_stored_persists_new_version() {
        let (service, repo) = service_with_plan().await;

        let outcome = service
            .rebalance_stored(&PlanId::new("p1"), &UserId::new("u1"), day(1))
            .await
            .unwrap();

        assert_eq!(outcome.version, 2);
        assert_eq!(outcome.report.today_index, 1);
        assert_eq!(outcome.report.activities_carried, 1);
        assert_eq!(outcome.plan.sessions().len(), 3);

        let stored = repo.get_plan(&PlanId::new("p1")).await.unwrap();
        assert_eq!(stored.plan, outcome.plan);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn today_before_creation_behaves_like_day_zero() {
        let (service, _repo) = service_with_plan().await;
        let outcome = service
            .rebalance_stored(&PlanId::new("p1"), &UserId::new("u1"), day(-3))
            .await
            .unwrap();
        assert_eq!(outcome.report.today_index, 0);
        assert_eq!(outcome.report.sessions_locked, 0);
    }

    #[tokio::test]
    async fn rebalance_today_uses_clock() {
        let repo = InMemoryRepository::new();
        repo.insert_plan(&build_plan()).await.unwrap();
        let service = RebalanceService::new(
            Clock::fixed(fixed_now() + Duration::days(2)),
            Arc::new(repo),
        );
        let outcome = service
            .rebalance_today(&PlanId::new("p1"), &UserId::new("u1"))
            .await
            .unwrap();
        assert_eq!(outcome.report.today_index, 2);
    }

    #[tokio::test]
    async fn foreign_plan_is_not_found() {
        let (service, _repo) = service_with_plan().await;
        let err = service
            .rebalance_stored(&PlanId::new("p1"), &UserId::new("intruder"), day(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RebalanceError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_plan_is_not_found() {
        let (service, _repo) = service_with_plan().await;
        let err = service
            .rebalance_stored(&PlanId::new("nope"), &UserId::new("u1"), day(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RebalanceError::NotFound(_)));
    }

    #[tokio::test]
    async fn repeated_daily_runs_are_stable() {
        let (service, _repo) = service_with_plan().await;
        let first = service
            .rebalance_stored(&PlanId::new("p1"), &UserId::new("u1"), day(1))
            .await
            .unwrap();
        let second = service
            .rebalance_stored(&PlanId::new("p1"), &UserId::new("u1"), day(1))
            .await
            .unwrap();

        assert_eq!(second.plan, first.plan);
        assert_eq!(second.report.sessions_locked, 0);
        assert_eq!(second.version, 3);
    }

    #[test]
    fn preview_clamps_negative_offsets() {
        let plan = build_plan();
        let out = RebalanceService::preview(&plan, -4);
        assert_eq!(out.report.today_index, 0);
        assert!(out.plan.sessions().iter().all(|s| !s.is_locked()));

        let out = RebalanceService::preview(&plan, 1);
        assert!(out.plan.sessions()[0].is_locked());
    }
}
