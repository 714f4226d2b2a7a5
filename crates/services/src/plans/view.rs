use serde::Serialize;

use study_core::model::{Activity, ActivityKind, Plan, Session};

use super::progress::PlanProgress;

/// Status badge shown next to an activity.
///
/// Derived from the activity's status and replica index only; the engine's
/// internal bookkeeping never reaches this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityBadge {
    Done,
    /// Left unfinished on its day and moved to the next one.
    Deferred,
    /// A copy of work that was deferred from an earlier day.
    CarriedForward,
    Scheduled,
}

impl ActivityBadge {
    #[must_use]
    pub fn for_activity(activity: &Activity) -> Self {
        if activity.is_completed() {
            Self::Done
        } else if activity.is_deferred() {
            Self::Deferred
        } else if activity.is_replica() {
            Self::CarriedForward
        } else {
            Self::Scheduled
        }
    }
}

/// Where a session sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPosition {
    Past,
    Today,
    Upcoming,
}

impl DayPosition {
    fn of(idx: usize, today: usize) -> Self {
        match idx.cmp(&today) {
            std::cmp::Ordering::Less => Self::Past,
            std::cmp::Ordering::Equal => Self::Today,
            std::cmp::Ordering::Greater => Self::Upcoming,
        }
    }
}

/// Presentation-agnostic row for one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    pub activity_id: String,
    pub quiz_stage: Option<String>,
    pub minutes: u32,
    pub badge: ActivityBadge,
    pub replica_index: u32,
}

impl ActivityRow {
    #[must_use]
    pub fn from_activity(activity: &Activity) -> Self {
        let quiz_stage = match activity.kind() {
            ActivityKind::Read => None,
            ActivityKind::Quiz { stage } => Some(stage.to_string()),
        };
        Self {
            activity_id: activity.activity_id().to_string(),
            quiz_stage,
            minutes: activity.time_needed(),
            badge: ActivityBadge::for_activity(activity),
            replica_index: activity.replica_index(),
        }
    }
}

/// One day of the plan as a dashboard would list it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub label: String,
    pub position: DayPosition,
    pub locked: bool,
    pub planned_minutes: u64,
    pub completed_minutes: u64,
    pub over_budget: bool,
    pub activities: Vec<ActivityRow>,
}

impl SessionRow {
    fn from_session(session: &Session, position: DayPosition, budget: u32) -> Self {
        let mut planned_minutes = 0;
        let mut completed_minutes = 0;
        for activity in session.activities() {
            if activity.is_deferred() {
                continue;
            }
            let minutes = u64::from(activity.time_needed());
            planned_minutes += minutes;
            if activity.is_completed() {
                completed_minutes += minutes;
            }
        }
        Self {
            label: session.label().to_owned(),
            position,
            locked: session.is_locked(),
            planned_minutes,
            completed_minutes,
            over_budget: session.total_minutes() > u64::from(budget),
            activities: session
                .activities()
                .iter()
                .map(ActivityRow::from_activity)
                .collect(),
        }
    }
}

/// Read model for the day-by-day plan view.
///
/// This is intentionally **not** a UI view-model: no pre-formatted strings,
/// no localization; the UI decides how to render badges and minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOverview {
    pub plan_id: String,
    pub today_index: usize,
    pub daily_budget_minutes: u32,
    pub progress: PlanProgress,
    pub sessions: Vec<SessionRow>,
}

impl PlanOverview {
    #[must_use]
    pub fn from_plan(plan: &Plan, today_index: usize) -> Self {
        let budget = plan.daily_budget_minutes();
        Self {
            plan_id: plan.id().to_string(),
            today_index,
            daily_budget_minutes: budget,
            progress: PlanProgress::from_plan(plan),
            sessions: plan
                .sessions()
                .iter()
                .enumerate()
                .map(|(idx, s)| SessionRow::from_session(s, DayPosition::of(idx, today_index), budget))
                .collect(),
        }
    }

    /// The session scheduled for today, if the plan reaches that far.
    #[must_use]
    pub fn today(&self) -> Option<&SessionRow> {
        self.sessions.get(self.today_index)
    }
}
