use chrono::{DateTime, Utc};

use crate::model::activity::Activity;
use crate::model::ids::{PlanId, UserId};
use crate::model::session::Session;

//
// ─── PLAN ──────────────────────────────────────────────────────────────────────
//

/// A learner's multi-day study schedule.
///
/// Index 0 of `sessions` is the day the plan was created. Cloning a plan is a
/// deep copy; no activity is shared between two `Plan` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    id: PlanId,
    user_id: UserId,
    created_at: DateTime<Utc>,
    daily_budget_minutes: u32,
    sessions: Vec<Session>,
}

impl Plan {
    /// Creates a plan.
    ///
    /// Any budget is accepted; with a budget of 0 every non-empty activity
    /// ends up in a session of its own when the plan is repacked.
    #[must_use]
    pub fn new(
        id: PlanId,
        user_id: UserId,
        created_at: DateTime<Utc>,
        daily_budget_minutes: u32,
        sessions: Vec<Session>,
    ) -> Self {
        Self {
            id,
            user_id,
            created_at,
            daily_budget_minutes,
            sessions,
        }
    }

    #[must_use]
    pub fn id(&self) -> &PlanId {
        &self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Per-day time budget in minutes.
    #[must_use]
    pub fn daily_budget_minutes(&self) -> u32 {
        self.daily_budget_minutes
    }

    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    #[must_use]
    pub fn session(&self, idx: usize) -> Option<&Session> {
        self.sessions.get(idx)
    }

    pub fn session_mut(&mut self, idx: usize) -> Option<&mut Session> {
        self.sessions.get_mut(idx)
    }

    pub(crate) fn sessions_vec_mut(&mut self) -> &mut Vec<Session> {
        &mut self.sessions
    }

    /// Appends an unlocked session labelled with its 1-based position.
    pub fn push_session(&mut self, activities: Vec<Activity>) -> &mut Session {
        let label = (self.sessions.len() + 1).to_string();
        self.sessions.push(Session::new(label, activities));
        let last = self.sessions.len() - 1;
        &mut self.sessions[last]
    }

    /// Rewrites every label to its 1-based position (`"1"`, `"2"`, ...).
    pub fn relabel_sessions(&mut self) {
        for (idx, session) in self.sessions.iter_mut().enumerate() {
            session.set_label((idx + 1).to_string());
        }
    }

    /// All activity instances in session order.
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.sessions.iter().flat_map(|s| s.activities().iter())
    }

    /// Number of leading sessions that are locked.
    #[must_use]
    pub fn locked_prefix_len(&self) -> usize {
        self.sessions.iter().take_while(|s| s.is_locked()).count()
    }
}
