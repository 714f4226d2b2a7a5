mod activity;
mod ids;
mod plan;
mod session;

pub use ids::{ActivityId, ParseIdError, PlanId, UserId};

pub use activity::{Activity, ActivityKind, ActivityStatus, QuizStage};
pub use plan::Plan;
pub use session::Session;
