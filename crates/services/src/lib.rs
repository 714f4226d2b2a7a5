#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod plans;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, RebalanceError};
pub use plans::{
    ActivityBadge, ActivityRow, DayPosition, PlanOverview, PlanProgress, RebalanceOutcome,
    RebalanceService, SessionRow,
};
