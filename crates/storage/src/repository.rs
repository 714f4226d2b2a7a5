use async_trait::async_trait;
use study_core::model::{Plan, PlanId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Monotonic per-plan write counter used for compare-and-swap saves.
pub type PlanVersion = u64;

/// A plan as read from storage, with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlan {
    pub plan: Plan,
    pub version: PlanVersion,
}

/// Repository contract for study plans.
///
/// Saves are optimistic: a writer passes the version it read, and the save
/// fails with `StorageError::Conflict` if anyone else wrote in between.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Store a brand-new plan at version 1.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a plan with the same id exists.
    async fn insert_plan(&self, plan: &Plan) -> Result<PlanVersion, StorageError>;

    /// Fetch a plan by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_plan(&self, id: &PlanId) -> Result<StoredPlan, StorageError>;

    /// Replace a plan if it is still at `expected_version`; returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing and `StorageError::Conflict`
    /// if the stored version moved on.
    async fn save_plan(
        &self,
        plan: &Plan,
        expected_version: PlanVersion,
    ) -> Result<PlanVersion, StorageError>;

    /// List every plan owned by `user_id`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the plans cannot be read.
    async fn list_plans_for_user(&self, user_id: &UserId) -> Result<Vec<StoredPlan>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    plans: Arc<Mutex<HashMap<PlanId, StoredPlan>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            plans: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl PlanRepository for InMemoryRepository {
    async fn insert_plan(&self, plan: &Plan) -> Result<PlanVersion, StorageError> {
        let mut guard = self
            .plans
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(plan.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(
            plan.id().clone(),
            StoredPlan {
                plan: plan.clone(),
                version: 1,
            },
        );
        Ok(1)
    }

    async fn get_plan(&self, id: &PlanId) -> Result<StoredPlan, StorageError> {
        let guard = self
            .plans
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn save_plan(
        &self,
        plan: &Plan,
        expected_version: PlanVersion,
    ) -> Result<PlanVersion, StorageError> {
        let mut guard = self
            .plans
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let stored = guard.get_mut(plan.id()).ok_or(StorageError::NotFound)?;
        if stored.version != expected_version {
            return Err(StorageError::Conflict);
        }
        stored.plan = plan.clone();
        stored.version += 1;
        Ok(stored.version)
    }

    async fn list_plans_for_user(&self, user_id: &UserId) -> Result<Vec<StoredPlan>, StorageError> {
        let guard = self
            .plans
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<StoredPlan> = guard
            .values()
            .filter(|stored| stored.plan.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.plan.id().cmp(b.plan.id()));
        Ok(found)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub plans: Arc<dyn PlanRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let plans: Arc<dyn PlanRepository> = Arc::new(InMemoryRepository::new());
        Self { plans }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{Activity, Session};
    use study_core::time::fixed_now;

    fn build_plan(id: &str, user: &str) -> Plan {
        Plan::new(
            PlanId::new(id),
            UserId::new(user),
            fixed_now(),
            30,
            vec![Session::new("1", vec![Activity::read("ch1", 10)])],
        )
    }

    #[tokio::test]
    async fn insert_then_get_returns_version_one() {
        let repo = InMemoryRepository::new();
        let plan = build_plan("p1", "u1");
        assert_eq!(repo.insert_plan(&plan).await.unwrap(), 1);

        let stored = repo.get_plan(plan.id()).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.plan, plan);
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts() {
        let repo = InMemoryRepository::new();
        let plan = build_plan("p1", "u1");
        repo.insert_plan(&plan).await.unwrap();
        let err = repo.insert_plan(&plan).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn stale_save_conflicts_and_keeps_first_write() {
        let repo = InMemoryRepository::new();
        let plan = build_plan("p1", "u1");
        repo.insert_plan(&plan).await.unwrap();

        let mut first = plan.clone();
        first.push_session(vec![Activity::read("ch2", 5)]);
        assert_eq!(repo.save_plan(&first, 1).await.unwrap(), 2);

        let err = repo.save_plan(&plan, 1).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(repo.get_plan(plan.id()).await.unwrap().plan, first);
    }

    #[tokio::test]
    async fn save_missing_plan_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.save_plan(&build_plan("ghost", "u1"), 1).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn list_filters_by_owner() {
        let storage = Storage::in_memory();
        storage.plans.insert_plan(&build_plan("b", "u1")).await.unwrap();
        storage.plans.insert_plan(&build_plan("a", "u1")).await.unwrap();
        storage.plans.insert_plan(&build_plan("c", "u2")).await.unwrap();

        let listed = storage
            .plans
            .list_plans_for_user(&UserId::new("u1"))
            .await
            .unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.plan.id().as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
