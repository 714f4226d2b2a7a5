//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::PlanId;

/// Errors emitted by `RebalanceService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RebalanceError {
    /// Missing plan, or a plan owned by someone else.
    #[error("plan {0} not found")]
    NotFound(PlanId),
    /// Another writer saved the plan between our read and our write.
    #[error("plan {0} was modified concurrently")]
    Conflict(PlanId),
    #[error(transparent)]
    Storage(StorageError),
}

impl RebalanceError {
    pub(crate) fn from_storage(plan_id: &PlanId, err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound(plan_id.clone()),
            StorageError::Conflict => Self::Conflict(plan_id.clone()),
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
