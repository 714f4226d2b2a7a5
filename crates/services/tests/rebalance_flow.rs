use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use services::{ActivityBadge, AppServices, Clock, PlanOverview, RebalanceError, RebalanceService};
use storage::repository::{
    InMemoryRepository, PlanRepository, PlanVersion, StorageError, StoredPlan,
};
use storage::sqlite::SqliteRepository;
use study_core::model::{Activity, Plan, PlanId, Session, UserId};
use study_core::time::fixed_now;

fn week_plan() -> Plan {
    Plan::new(
        PlanId::new("week"),
        UserId::new("learner"),
        fixed_now(),
        20,
        vec![
            Session::new(
                "1",
                vec![Activity::read("ch1", 12), Activity::quiz("ch1", "remember", 6)],
            ),
            Session::new(
                "2",
                vec![Activity::read("ch2", 12), Activity::quiz("ch1", "understand", 6)],
            ),
            Session::new("3", vec![Activity::quiz("ch2", "remember", 6)]),
        ],
    )
}

#[tokio::test]
async fn learner_progress_then_daily_rebalance() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let plans = app.plans();
    plans.insert_plan(&week_plan()).await.unwrap();

    // Day 1: the learner finishes the reading but skips the quiz.
    let mut stored = plans.get_plan(&PlanId::new("week")).await.unwrap();
    stored.plan.session_mut(0).unwrap().activities_mut().unwrap()[0].mark_completed();
    let version = plans.save_plan(&stored.plan, stored.version).await.unwrap();
    assert_eq!(version, 2);

    let today = (fixed_now() + Duration::days(1)).date_naive();
    let outcome = app
        .rebalance()
        .rebalance_stored(&PlanId::new("week"), &UserId::new("learner"), today)
        .await
        .unwrap();

    let sessions = outcome.plan.sessions();
    assert!(sessions[0].is_locked());
    assert_eq!(outcome.report.activities_carried, 1);

    // Carried quiz (6) + ch2 reading (12) fit in 20; the next quiz opens day 3.
    let today_ids: Vec<(&str, u32)> = sessions[1]
        .activities()
        .iter()
        .map(|a| (a.activity_id().as_str(), a.replica_index()))
        .collect();
    assert_eq!(today_ids, [("ch1", 1), ("ch2", 0)]);
    for session in &sessions[1..] {
        assert!(session.total_minutes() <= 20);
    }

    let overview = PlanOverview::from_plan(&outcome.plan, outcome.report.today_index);
    let badges: Vec<ActivityBadge> = overview.sessions[0]
        .activities
        .iter()
        .map(|a| a.badge)
        .collect();
    assert_eq!(badges, [ActivityBadge::Done, ActivityBadge::Deferred]);
    assert_eq!(
        overview.today().unwrap().activities[0].badge,
        ActivityBadge::CarriedForward
    );
}

/// Repository double that lets another writer win just before every save.
struct RacingRepository {
    inner: InMemoryRepository,
}

#[async_trait]
impl PlanRepository for RacingRepository {
    async fn insert_plan(&self, plan: &Plan) -> Result<PlanVersion, StorageError> {
        self.inner.insert_plan(plan).await
    }

    async fn get_plan(&self, id: &PlanId) -> Result<StoredPlan, StorageError> {
        self.inner.get_plan(id).await
    }

    async fn save_plan(
        &self,
        plan: &Plan,
        expected_version: PlanVersion,
    ) -> Result<PlanVersion, StorageError> {
        let competing = self.inner.get_plan(plan.id()).await?;
        let mut other = competing.plan.clone();
        other.push_session(vec![Activity::read("other-writer", 1)]);
        self.inner.save_plan(&other, competing.version).await?;

        self.inner.save_plan(plan, expected_version).await
    }

    async fn list_plans_for_user(&self, user_id: &UserId) -> Result<Vec<StoredPlan>, StorageError> {
        self.inner.list_plans_for_user(user_id).await
    }
}

#[tokio::test]
async fn concurrent_write_surfaces_as_conflict() {
    let inner = InMemoryRepository::new();
    inner.insert_plan(&week_plan()).await.unwrap();
    let service = RebalanceService::new(
        Clock::fixed(fixed_now()),
        Arc::new(RacingRepository {
            inner: inner.clone(),
        }),
    );

    let err = service
        .rebalance_today(&PlanId::new("week"), &UserId::new("learner"))
        .await
        .unwrap_err();
    assert!(matches!(err, RebalanceError::Conflict(_)));

    // The competing write is kept intact.
    let stored = inner.get_plan(&PlanId::new("week")).await.unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(
        stored.plan.sessions().last().unwrap().activities()[0]
            .activity_id()
            .as_str(),
        "other-writer"
    );
}

#[test]
fn preview_never_touches_storage() {
    let plan = week_plan();
    let out = RebalanceService::preview(&plan, 2);
    assert_eq!(out.report.sessions_locked, 2);
    assert_eq!(plan, week_plan());
}

#[tokio::test]
async fn corrupt_stored_document_reads_as_not_found() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_corrupt_plan?mode=memory&cache=shared")
        .await
        .unwrap();
    repo.migrate().await.unwrap();
    repo.insert_plan(&week_plan()).await.unwrap();
    sqlx::query("UPDATE plans SET document = '{\"id\":3}' WHERE id = 'week'")
        .execute(repo.pool())
        .await
        .unwrap();

    let service = RebalanceService::new(Clock::fixed(fixed_now()), Arc::new(repo));
    let today = (fixed_now() + Duration::days(1)).date_naive();
    let err = service
        .rebalance_stored(&PlanId::new("week"), &UserId::new("learner"), today)
        .await
        .unwrap_err();
    assert!(matches!(err, RebalanceError::NotFound(_)));

    let err = service
        .get_plan(&PlanId::new("week"), &UserId::new("learner"))
        .await
        .unwrap_err();
    assert!(matches!(err, RebalanceError::NotFound(_)));
}

#[tokio::test]
async fn zero_budget_plan_rebalances_through_sqlite() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_zero_budget?mode=memory&cache=shared")
        .await
        .unwrap();
    repo.migrate().await.unwrap();
    let plan = Plan::new(
        PlanId::new("tight"),
        UserId::new("learner"),
        fixed_now(),
        0,
        vec![Session::new(
            "1",
            vec![Activity::read("ch1", 3), Activity::quiz("ch1", "remember", 2)],
        )],
    );
    repo.insert_plan(&plan).await.unwrap();

    let service = RebalanceService::new(Clock::fixed(fixed_now()), Arc::new(repo));
    let outcome = service
        .rebalance_today(&PlanId::new("tight"), &UserId::new("learner"))
        .await
        .unwrap();
    assert_eq!(outcome.plan.sessions().len(), 2);
    assert_eq!(outcome.version, 2);
}
