//! Plan rebalancing: finalize the days before "today" and repack the rest.
//!
//! The engine is a pure function over `Plan` values. It never mutates its
//! input, holds no state between calls, and everything it needs to stay
//! idempotent (lock flags, activity status, replica indices) travels inside
//! the plan itself.

use std::collections::HashMap;

use crate::model::{Activity, ActivityId, Plan, Session};

//
// ─── CONTEXT ───────────────────────────────────────────────────────────────────
//

/// Per-activity side channel supplied by callers.
///
/// Accepted for interface stability; the current algorithm does not read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebalanceContext {
    entries: HashMap<ActivityId, String>,
}

impl RebalanceContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, activity_id: ActivityId, value: impl Into<String>) {
        self.entries.insert(activity_id, value.into());
    }

    #[must_use]
    pub fn get(&self, activity_id: &ActivityId) -> Option<&str> {
        self.entries.get(activity_id).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//
// ─── REPORTS ───────────────────────────────────────────────────────────────────
//

/// What the deferral walk changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferralReport {
    pub sessions_locked: usize,
    pub activities_carried: usize,
    pub sessions_appended: usize,
}

/// Counts describing one rebalance, used for logging by callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebalanceReport {
    pub today_index: usize,
    pub sessions_locked: usize,
    pub activities_carried: usize,
    pub sessions_repacked: usize,
}

/// Result of `rebalance`: the new plan plus what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebalanced {
    pub plan: Plan,
    pub report: RebalanceReport,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Rebalance `plan` as seen on day `today` (zero-based session index).
///
/// Runs the deferral walk over `[0, today)` and then repacks every session
/// from `today` onward under the plan's daily budget. The input is cloned
/// first, so callers can keep using their snapshot.
///
/// # Examples
///
/// ```
/// # use study_core::model::{Activity, Plan, PlanId, Session, UserId};
/// # use study_core::rebalance::{rebalance, RebalanceContext};
/// # use study_core::time::fixed_now;
/// let plan = Plan::new(
///     PlanId::new("p"),
///     UserId::new("u"),
///     fixed_now(),
///     10,
///     vec![
///         Session::new("1", vec![Activity::read("ch1", 8)]),
///         Session::new("2", vec![Activity::quiz("ch1", "remember", 5)]),
///     ],
/// );
///
/// let out = rebalance(&plan, 1, &RebalanceContext::new());
/// assert!(out.plan.sessions()[0].is_locked());
/// assert_eq!(out.plan.sessions().len(), 3);
/// ```
#[must_use]
pub fn rebalance(plan: &Plan, today: usize, context: &RebalanceContext) -> Rebalanced {
    // The context is part of the call contract but carries no behavior yet.
    let _ = context;

    let mut next = plan.clone();
    let deferral = defer_past_sessions(&mut next, today);
    let sessions_repacked = repack_future_sessions(&mut next, today);

    Rebalanced {
        plan: next,
        report: RebalanceReport {
            today_index: today,
            sessions_locked: deferral.sessions_locked,
            activities_carried: deferral.activities_carried,
            sessions_repacked,
        },
    }
}

/// Lock every unlocked session before `today` and carry its unfinished work
/// into the following session.
///
/// The bound `min(today, len)` is re-read on every step: when carried work
/// has to open a new session that is still in the past, that session is
/// finalized in turn, so overdue work always ends up at `today` or later.
pub fn defer_past_sessions(plan: &mut Plan, today: usize) -> DeferralReport {
    let mut report = DeferralReport::default();
    let mut idx = 0;

    while idx < today.min(plan.sessions().len()) {
        let sessions = plan.sessions_vec_mut();
        let session = &mut sessions[idx];
        if session.is_locked() {
            idx += 1;
            continue;
        }

        session.lock();
        report.sessions_locked += 1;

        let carried: Vec<Activity> = session
            .activities_vec_mut()
            .iter_mut()
            .filter_map(Activity::defer)
            .collect();

        if !carried.is_empty() {
            report.activities_carried += carried.len();
            if let Some(next) = sessions.get_mut(idx + 1) {
                prepend(next, carried);
            } else {
                plan.push_session(carried);
                report.sessions_appended += 1;
            }
        }

        idx += 1;
    }

    report
}

/// Replace every session from `today` onward with freshly packed sessions.
///
/// Activities keep their order; a session is closed as soon as the next
/// activity would push it over the daily budget. An activity larger than
/// the budget still gets a session of its own. Returns the number of
/// sessions created.
pub fn repack_future_sessions(plan: &mut Plan, today: usize) -> usize {
    let budget = u64::from(plan.daily_budget_minutes());
    let sessions = plan.sessions_vec_mut();
    if today >= sessions.len() {
        return 0;
    }

    let pending: Vec<Activity> = sessions
        .drain(today..)
        .flat_map(Session::into_activities)
        .collect();

    let mut created = 0;
    let mut bucket: Vec<Activity> = Vec::new();
    let mut bucket_minutes = 0_u64;

    for activity in pending {
        let minutes = u64::from(activity.time_needed());
        if bucket_minutes + minutes > budget && !bucket.is_empty() {
            plan.push_session(std::mem::take(&mut bucket));
            created += 1;
            bucket_minutes = 0;
        }
        bucket_minutes += minutes;
        bucket.push(activity);
    }

    if !bucket.is_empty() {
        plan.push_session(bucket);
        created += 1;
    }

    created
}

fn prepend(session: &mut Session, carried: Vec<Activity>) {
    let list = session.activities_vec_mut();
    let scheduled = std::mem::take(list);
    list.extend(carried);
    list.extend(scheduled);
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
