use std::fmt;

use crate::model::ids::ActivityId;

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Opaque quiz stage tag (remember, understand, apply, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuizStage(String);

impl QuizStage {
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self(stage.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuizStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of work an activity represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    /// A reading pass over a chapter or sub-chapter.
    Read,
    /// One quiz stage over previously read material.
    Quiz { stage: QuizStage },
}

impl ActivityKind {
    #[must_use]
    pub fn quiz(stage: impl Into<String>) -> Self {
        Self::Quiz {
            stage: QuizStage::new(stage),
        }
    }

    #[must_use]
    pub fn is_quiz(&self) -> bool {
        matches!(self, Self::Quiz { .. })
    }
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Progress state of a single activity instance.
///
/// `Deferred` is terminal: the instance stays behind in a locked session as a
/// historical record while a replica carries the work forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActivityStatus {
    #[default]
    Pending,
    Completed,
    Deferred,
}

impl ActivityStatus {
    /// True once the deferral walk has finalized this instance.
    #[must_use]
    pub fn is_processed(self) -> bool {
        matches!(self, Self::Deferred)
    }
}

//
// ─── ACTIVITY ──────────────────────────────────────────────────────────────────
//

/// One schedulable unit of work inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    activity_id: ActivityId,
    kind: ActivityKind,
    time_needed: u32,
    status: ActivityStatus,
    replica_index: u32,
}

impl Activity {
    /// Creates a fresh, pending original (replica index 0).
    #[must_use]
    pub fn new(activity_id: ActivityId, kind: ActivityKind, time_needed: u32) -> Self {
        Self {
            activity_id,
            kind,
            time_needed,
            status: ActivityStatus::Pending,
            replica_index: 0,
        }
    }

    /// Shorthand for a pending reading activity.
    #[must_use]
    pub fn read(activity_id: impl Into<String>, time_needed: u32) -> Self {
        Self::new(ActivityId::new(activity_id), ActivityKind::Read, time_needed)
    }

    /// Shorthand for a pending quiz activity.
    #[must_use]
    pub fn quiz(activity_id: impl Into<String>, stage: impl Into<String>, time_needed: u32) -> Self {
        Self::new(
            ActivityId::new(activity_id),
            ActivityKind::quiz(stage),
            time_needed,
        )
    }

    /// Rehydrate an activity from a stored document.
    #[must_use]
    pub fn from_persisted(
        activity_id: ActivityId,
        kind: ActivityKind,
        time_needed: u32,
        status: ActivityStatus,
        replica_index: u32,
    ) -> Self {
        Self {
            activity_id,
            kind,
            time_needed,
            status,
            replica_index,
        }
    }

    #[must_use]
    pub fn activity_id(&self) -> &ActivityId {
        &self.activity_id
    }

    #[must_use]
    pub fn kind(&self) -> &ActivityKind {
        &self.kind
    }

    /// Estimated minutes to complete.
    #[must_use]
    pub fn time_needed(&self) -> u32 {
        self.time_needed
    }

    #[must_use]
    pub fn status(&self) -> ActivityStatus {
        self.status
    }

    #[must_use]
    pub fn replica_index(&self) -> u32 {
        self.replica_index
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ActivityStatus::Completed
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.status == ActivityStatus::Deferred
    }

    #[must_use]
    pub fn is_replica(&self) -> bool {
        self.replica_index > 0
    }

    /// Record progress reported by the tracking side of the product.
    ///
    /// Deferred instances are historical and ignore further progress.
    pub fn mark_completed(&mut self) {
        if self.status == ActivityStatus::Pending {
            self.status = ActivityStatus::Completed;
        }
    }

    /// Finalize a pending instance and return its forward replica.
    ///
    /// Returns `None` for completed or already deferred instances, so a second
    /// call never produces a second replica.
    pub fn defer(&mut self) -> Option<Activity> {
        if self.status != ActivityStatus::Pending {
            return None;
        }
        self.status = ActivityStatus::Deferred;
        Some(Activity {
            activity_id: self.activity_id.clone(),
            kind: self.kind.clone(),
            time_needed: self.time_needed,
            status: ActivityStatus::Pending,
            replica_index: self.replica_index.saturating_add(1),
        })
    }
}
