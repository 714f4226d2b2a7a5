//! Stored/wire shape of a plan.
//!
//! Documents keep the product's flat flag layout (`completed`, `deferred`,
//! `processed`) and camelCase field names; the domain model collapses the
//! flags into `ActivityStatus`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Activity, ActivityId, ActivityKind, ActivityStatus, ParseIdError, Plan, PlanId,
    Session, UserId,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] ParseIdError),

    #[error("quiz activity {activity_id} has no stage")]
    MissingQuizStage { activity_id: String },

    #[error("timestamp out of range: {seconds}s")]
    TimestampOutOfRange { seconds: i64 },
}

//
// ─── TIMESTAMPS ────────────────────────────────────────────────────────────────
//

/// Creation timestamp as it may appear in stored documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentTimestamp {
    Epoch {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    Instant(DateTime<Utc>),
    Date(NaiveDate),
}

impl DocumentTimestamp {
    /// Normalize to a UTC instant; bare dates map to midnight.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::TimestampOutOfRange` for unrepresentable epochs.
    pub fn to_utc(&self) -> Result<DateTime<Utc>, DocumentError> {
        match self {
            Self::Epoch {
                seconds,
                nanoseconds,
            } => DateTime::<Utc>::from_timestamp(*seconds, *nanoseconds)
                .ok_or(DocumentError::TimestampOutOfRange { seconds: *seconds }),
            Self::Instant(at) => Ok(*at),
            Self::Date(date) => Ok(date.and_time(chrono::NaiveTime::MIN).and_utc()),
        }
    }
}

impl From<DateTime<Utc>> for DocumentTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Instant(at)
    }
}

//
// ─── DOCUMENTS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityKindTag {
    Read,
    Quiz,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDocument {
    pub activity_id: String,
    pub kind: ActivityKindTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub time_needed: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub deferred: bool,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    pub session_label: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub activities: Vec<ActivityDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    pub id: String,
    pub user_id: String,
    pub created_at: DocumentTimestamp,
    pub daily_reading_time_used: u32,
    #[serde(default)]
    pub sessions: Vec<SessionDocument>,
}

//
// ─── CONVERSIONS ───────────────────────────────────────────────────────────────
//

fn status_from_flags(completed: bool, deferred: bool, processed: bool) -> ActivityStatus {
    if deferred || (processed && !completed) {
        ActivityStatus::Deferred
    } else if completed {
        ActivityStatus::Completed
    } else {
        ActivityStatus::Pending
    }
}

impl ActivityDocument {
    /// Convert into the domain activity.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` for an empty id or a quiz without a stage.
    pub fn into_activity(self) -> Result<Activity, DocumentError> {
        let activity_id: ActivityId = self.activity_id.parse()?;
        let kind = match (self.kind, self.stage) {
            (ActivityKindTag::Read, _) => ActivityKind::Read,
            (ActivityKindTag::Quiz, Some(stage)) => ActivityKind::quiz(stage),
            (ActivityKindTag::Quiz, None) => {
                return Err(DocumentError::MissingQuizStage {
                    activity_id: activity_id.to_string(),
                });
            }
        };
        Ok(Activity::from_persisted(
            activity_id,
            kind,
            self.time_needed,
            status_from_flags(self.completed, self.deferred, self.processed),
            self.replica_index.unwrap_or(0),
        ))
    }

    #[must_use]
    pub fn from_activity(activity: &Activity) -> Self {
        let (kind, stage) = match activity.kind() {
            ActivityKind::Read => (ActivityKindTag::Read, None),
            ActivityKind::Quiz { stage } => (ActivityKindTag::Quiz, Some(stage.to_string())),
        };
        let status = activity.status();
        Self {
            activity_id: activity.activity_id().to_string(),
            kind,
            stage,
            time_needed: activity.time_needed(),
            completed: status == ActivityStatus::Completed,
            deferred: status == ActivityStatus::Deferred,
            processed: status.is_processed(),
            replica_index: Some(activity.replica_index()).filter(|idx| *idx > 0),
        }
    }
}

impl SessionDocument {
    /// # Errors
    ///
    /// Returns the first activity conversion error.
    pub fn into_session(self) -> Result<Session, DocumentError> {
        let activities = self
            .activities
            .into_iter()
            .map(ActivityDocument::into_activity)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Session::from_persisted(
            self.session_label,
            self.locked,
            activities,
        ))
    }

    /// Completed work in a locked session was inspected when the day was
    /// finalized, so it is written back with `processed` set.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let locked = session.is_locked();
        Self {
            session_label: session.label().to_owned(),
            locked,
            activities: session
                .activities()
                .iter()
                .map(|activity| {
                    let mut doc = ActivityDocument::from_activity(activity);
                    doc.processed |= locked && doc.completed;
                    doc
                })
                .collect(),
        }
    }
}

impl PlanDocument {
    /// Validate and convert into the domain plan.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` for invalid ids, timestamps, or activities.
    pub fn into_plan(self) -> Result<Plan, DocumentError> {
        let id: PlanId = self.id.parse()?;
        let user_id: UserId = self.user_id.parse()?;
        let created_at = self.created_at.to_utc()?;
        let sessions = self
            .sessions
            .into_iter()
            .map(SessionDocument::into_session)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Plan::new(
            id,
            user_id,
            created_at,
            self.daily_reading_time_used,
            sessions,
        ))
    }

    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            id: plan.id().to_string(),
            user_id: plan.user_id().to_string(),
            created_at: plan.created_at().into(),
            daily_reading_time_used: plan.daily_budget_minutes(),
            sessions: plan
                .sessions()
                .iter()
                .map(SessionDocument::from_session)
                .collect(),
        }
    }
}

impl TryFrom<PlanDocument> for Plan {
    type Error = DocumentError;

    fn try_from(doc: PlanDocument) -> Result<Self, Self::Error> {
        doc.into_plan()
    }
}

impl From<&Plan> for PlanDocument {
    fn from(plan: &Plan) -> Self {
        Self::from_plan(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    const STORED: &str = r#"{
        "id": "plan-1",
        "userId": "user-9",
        "createdAt": { "seconds": 1700000000, "nanoseconds": 500 },
        "dailyReadingTimeUsed": 30,
        "sessions": [
            {
                "sessionLabel": "1",
                "locked": true,
                "activities": [
                    { "activityId": "ch1", "kind": "READ", "timeNeeded": 12,
                      "completed": false, "deferred": true, "processed": true },
                    { "activityId": "ch0", "kind": "QUIZ", "stage": "remember",
                      "timeNeeded": 4, "completed": true, "processed": true }
                ]
            },
            {
                "sessionLabel": "2",
                "activities": [
                    { "activityId": "ch1", "kind": "READ", "timeNeeded": 12,
                      "replicaIndex": 1 }
                ]
            }
        ]
    }"#;

    #[test]
    fn stored_document_collapses_flags() {
        let doc: PlanDocument = serde_json::from_str(STORED).unwrap();
        let plan = doc.into_plan().unwrap();

        assert_eq!(plan.daily_budget_minutes(), 30);
        assert_eq!(plan.created_at().timestamp(), 1_700_000_000);
        let day1 = &plan.sessions()[0];
        assert!(day1.is_locked());
        assert_eq!(day1.activities()[0].status(), ActivityStatus::Deferred);
        assert_eq!(day1.activities()[1].status(), ActivityStatus::Completed);
        assert_eq!(day1.activities()[1].kind(), &ActivityKind::quiz("remember"));

        let day2 = &plan.sessions()[1];
        assert!(!day2.is_locked());
        assert_eq!(day2.activities()[0].status(), ActivityStatus::Pending);
        assert_eq!(day2.activities()[0].replica_index(), 1);
    }

    #[test]
    fn processed_but_incomplete_counts_as_deferred() {
        assert_eq!(status_from_flags(false, false, true), ActivityStatus::Deferred);
        assert_eq!(status_from_flags(true, true, true), ActivityStatus::Deferred);
        assert_eq!(status_from_flags(true, false, false), ActivityStatus::Completed);
        assert_eq!(status_from_flags(false, false, false), ActivityStatus::Pending);
    }

    #[test]
    fn written_document_uses_product_field_names() {
        let mut deferred = Activity::read("ch1", 12);
        let replica = deferred.defer().unwrap();
        let plan = Plan::new(
            PlanId::new("p"),
            UserId::new("u"),
            fixed_now(),
            20,
            vec![Session::new("1", vec![deferred, replica])],
        );

        let value = serde_json::to_value(PlanDocument::from_plan(&plan)).unwrap();
        assert_eq!(value["dailyReadingTimeUsed"], 20);
        assert_eq!(value["createdAt"], "2023-11-14T22:13:20Z");

        let acts = &value["sessions"][0]["activities"];
        assert_eq!(acts[0]["deferred"], true);
        assert_eq!(acts[0]["processed"], true);
        assert!(acts[0].get("replicaIndex").is_none());
        assert_eq!(acts[1]["replicaIndex"], 1);
        assert_eq!(acts[1]["processed"], false);
        assert_eq!(acts[1]["kind"], "READ");
    }

    #[test]
    fn document_survives_a_write_read_cycle() {
        let doc: PlanDocument = serde_json::from_str(STORED).unwrap();
        let plan = doc.into_plan().unwrap();
        let json = serde_json::to_string(&PlanDocument::from_plan(&plan)).unwrap();
        let again: PlanDocument = serde_json::from_str(&json).unwrap();
        // Sub-second precision is preserved through the RFC3339 form.
        assert_eq!(again.into_plan().unwrap(), plan);
    }

    #[test]
    fn created_at_accepts_admin_sdk_and_date_forms() {
        let admin: DocumentTimestamp =
            serde_json::from_str(r#"{ "_seconds": 86400, "_nanoseconds": 0 }"#).unwrap();
        assert_eq!(admin.to_utc().unwrap().timestamp(), 86_400);

        let date: DocumentTimestamp = serde_json::from_str(r#""2024-03-01""#).unwrap();
        assert_eq!(
            date.to_utc().unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn quiz_without_stage_is_rejected() {
        let doc = ActivityDocument {
            activity_id: "q".into(),
            kind: ActivityKindTag::Quiz,
            stage: None,
            time_needed: 3,
            completed: false,
            deferred: false,
            processed: false,
            replica_index: None,
        };
        assert!(matches!(
            doc.into_activity(),
            Err(DocumentError::MissingQuizStage { .. })
        ));
    }

    #[test]
    fn completed_work_in_locked_sessions_is_written_as_processed() {
        let mut finished = Activity::read("ch1", 8);
        finished.mark_completed();
        let mut locked = Session::new("1", vec![finished.clone()]);
        locked.lock();
        let open = Session::new("2", vec![finished]);

        let doc = SessionDocument::from_session(&locked);
        assert!(doc.activities[0].completed);
        assert!(doc.activities[0].processed);
        assert_eq!(
            doc.clone().into_session().unwrap().activities()[0].status(),
            ActivityStatus::Completed
        );

        let doc = SessionDocument::from_session(&open);
        assert!(!doc.activities[0].processed);
    }

    #[test]
    fn padded_activity_id_is_written_back_unchanged() {
        let doc = ActivityDocument {
            activity_id: " ch1 ".into(),
            kind: ActivityKindTag::Read,
            stage: None,
            time_needed: 3,
            completed: false,
            deferred: false,
            processed: false,
            replica_index: None,
        };
        let activity = doc.clone().into_activity().unwrap();
        assert_eq!(ActivityDocument::from_activity(&activity), doc);
    }

    #[test]
    fn zero_budget_document_loads() {
        let mut doc: PlanDocument = serde_json::from_str(STORED).unwrap();
        doc.daily_reading_time_used = 0;
        let plan = doc.into_plan().unwrap();
        assert_eq!(plan.daily_budget_minutes(), 0);
    }
}
