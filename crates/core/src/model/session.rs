use crate::model::activity::Activity;

/// One calendar day of a plan.
///
/// Once `locked`, the session is historical: the rebalancing engine never
/// changes its activity list again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    label: String,
    locked: bool,
    activities: Vec<Activity>,
}

impl Session {
    /// Creates an unlocked session.
    #[must_use]
    pub fn new(label: impl Into<String>, activities: Vec<Activity>) -> Self {
        Self {
            label: label.into(),
            locked: false,
            activities,
        }
    }

    #[must_use]
    pub fn from_persisted(label: String, locked: bool, activities: Vec<Activity>) -> Self {
        Self {
            label,
            locked,
            activities,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }

    #[must_use]
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// Mutable access for progress tracking; locked sessions expose nothing.
    pub fn activities_mut(&mut self) -> Option<&mut [Activity]> {
        if self.locked {
            None
        } else {
            Some(&mut self.activities)
        }
    }

    pub(crate) fn activities_vec_mut(&mut self) -> &mut Vec<Activity> {
        &mut self.activities
    }

    pub(crate) fn into_activities(self) -> Vec<Activity> {
        self.activities
    }

    /// Sum of `time_needed` over all activities.
    #[must_use]
    pub fn total_minutes(&self) -> u64 {
        self.activities
            .iter()
            .map(|a| u64::from(a.time_needed()))
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}
