use sqlx::Row;
use study_core::document::PlanDocument;
use study_core::model::Plan;

use crate::repository::{PlanVersion, StorageError, StoredPlan};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(super) fn version_from_i64(v: i64) -> Result<PlanVersion, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid version: {v}")))
}

pub(super) fn version_to_i64(v: PlanVersion) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("version overflow".into()))
}

pub(super) fn plan_to_json(plan: &Plan) -> Result<String, StorageError> {
    serde_json::to_string(&PlanDocument::from_plan(plan)).map_err(ser)
}

pub(super) fn plan_from_json(raw: &str) -> Result<Plan, StorageError> {
    let doc: PlanDocument = serde_json::from_str(raw).map_err(ser)?;
    doc.into_plan().map_err(ser)
}

pub(super) fn map_plan_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredPlan, StorageError> {
    let document: String = row.try_get("document").map_err(ser)?;
    let version = version_from_i64(row.try_get::<i64, _>("version").map_err(ser)?)?;
    let plan = plan_from_json(&document)?;
    Ok(StoredPlan { plan, version })
}
