//! Multi-tenant project tracking: accounts, projects, weekly check-ins and feedback, risks,
//! and the audit trail, with project health recomputed as signals arrive.

pub mod domain;
pub mod memory;
pub mod portfolio;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    week_start_for, ActivityEntry, ActivityId, ActivityKind, CheckIn, CheckInId,
    CheckInSubmission, Feedback, FeedbackId, FeedbackSubmission, NewProject, NewUser, Project,
    ProjectId, ProjectStatus, ProjectUpdate, Risk, RiskId, RiskReport, RiskStatus, RiskUpdate,
    Role, User, UserId, UserView,
};
pub use memory::{InMemoryActivityLog, InMemoryTrackingStore};
pub use portfolio::{BandCounts, PortfolioSummary, ProjectDigest, StatusCounts};
pub use repository::{
    ActivityError, ActivityLog, EntryFilter, HealthUpdate, ProjectScope, RepositoryError,
    TrackingRepository,
};
pub use router::{tracking_router, TrackingState};
pub use service::{
    Clock, LoginOutcome, ProjectDetail, ProjectTrackingService, Recorded, SystemClock,
    TrackingError,
};
pub use validation::ValidationError;
