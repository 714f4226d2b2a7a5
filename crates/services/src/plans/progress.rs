use serde::Serialize;
use study_core::model::Plan;

/// Aggregated minutes across a plan, useful for progress dashboards.
///
/// Deferred originals are excluded so carried work is only counted once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgress {
    pub planned_minutes: u64,
    pub completed_minutes: u64,
    pub remaining_minutes: u64,
    pub deferred_count: usize,
}

impl PlanProgress {
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        let mut progress = Self::default();
        for activity in plan.activities() {
            let minutes = u64::from(activity.time_needed());
            if activity.is_deferred() {
                progress.deferred_count += 1;
                continue;
            }
            progress.planned_minutes += minutes;
            if activity.is_completed() {
                progress.completed_minutes += minutes;
            }
        }
        progress.remaining_minutes = progress.planned_minutes - progress.completed_minutes;
        progress
    }

    /// Completed share in `[0, 1]`; an empty plan counts as done.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn completion_ratio(&self) -> f64 {
        if self.planned_minutes == 0 {
            return 1.0;
        }
        self.completed_minutes as f64 / self.planned_minutes as f64
    }
}
