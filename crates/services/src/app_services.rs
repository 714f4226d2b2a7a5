use std::sync::Arc;

use storage::repository::{PlanRepository, Storage};

use crate::Clock;
use crate::error::AppServicesError;
use crate::plans::RebalanceService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    plans: Arc<dyn PlanRepository>,
    rebalance: Arc<RebalanceService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let rebalance = Arc::new(RebalanceService::new(clock, Arc::clone(&storage.plans)));
        Self {
            clock,
            plans: Arc::clone(&storage.plans),
            rebalance,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn plans(&self) -> Arc<dyn PlanRepository> {
        Arc::clone(&self.plans)
    }

    #[must_use]
    pub fn rebalance(&self) -> Arc<RebalanceService> {
        Arc::clone(&self.rebalance)
    }
}
