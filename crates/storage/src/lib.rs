#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{InMemoryRepository, PlanRepository, PlanVersion, Storage, StorageError, StoredPlan};
