mod progress;
mod service;
mod view;

// Public API of the plan subsystem.
pub use crate::error::RebalanceError;
pub use progress::PlanProgress;
pub use service::{RebalanceOutcome, RebalanceService};
pub use view::{ActivityBadge, ActivityRow, DayPosition, PlanOverview, SessionRow};
