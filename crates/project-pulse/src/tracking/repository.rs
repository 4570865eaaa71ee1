use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    ActivityEntry, CheckIn, Feedback, Project, ProjectId, ProjectStatus, Risk, RiskId, RiskStatus,
    Role, User, UserId,
};

/// Role scoping applied when listing projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope {
    All,
    AssignedTo(UserId),
    OwnedBy(UserId),
}

/// Filter for check-in, feedback, and risk listings. `author` is the employee or client who
/// created the entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub project_id: Option<ProjectId>,
    pub author: Option<UserId>,
}

/// Health fields written back after a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthUpdate {
    pub health_score: u8,
    pub status: ProjectStatus,
    pub updated_at: DateTime<Utc>,
}

/// Document-store abstraction for accounts, projects, and their weekly records.
///
/// Listing methods return entries newest-first by `created_at`; ties keep the most recently
/// inserted entry first.
pub trait TrackingRepository: Send + Sync {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError>;

    fn insert_project(&self, project: Project) -> Result<Project, RepositoryError>;
    fn update_project(&self, project: Project) -> Result<(), RepositoryError>;
    fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError>;
    fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, RepositoryError>;
    /// Writes only the health fields so concurrent edits to other fields survive.
    fn write_health(&self, id: ProjectId, update: HealthUpdate) -> Result<(), RepositoryError>;
    /// Removes the project together with its check-ins, feedback, and risks.
    fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError>;

    fn insert_check_in(&self, check_in: CheckIn) -> Result<CheckIn, RepositoryError>;
    fn recent_check_ins(
        &self,
        project_id: ProjectId,
        limit: usize,
    ) -> Result<Vec<CheckIn>, RepositoryError>;
    fn list_check_ins(&self, filter: EntryFilter) -> Result<Vec<CheckIn>, RepositoryError>;
    fn check_in_exists(
        &self,
        project_id: ProjectId,
        employee_id: UserId,
        week_start: NaiveDate,
    ) -> Result<bool, RepositoryError>;

    fn insert_feedback(&self, feedback: Feedback) -> Result<Feedback, RepositoryError>;
    fn recent_feedback(
        &self,
        project_id: ProjectId,
        limit: usize,
    ) -> Result<Vec<Feedback>, RepositoryError>;
    fn list_feedback(&self, filter: EntryFilter) -> Result<Vec<Feedback>, RepositoryError>;
    fn feedback_exists(
        &self,
        project_id: ProjectId,
        client_id: UserId,
        week_start: NaiveDate,
    ) -> Result<bool, RepositoryError>;

    fn insert_risk(&self, risk: Risk) -> Result<Risk, RepositoryError>;
    fn update_risk(&self, risk: Risk) -> Result<(), RepositoryError>;
    fn fetch_risk(&self, id: RiskId) -> Result<Option<Risk>, RepositoryError>;
    fn list_risks(
        &self,
        filter: EntryFilter,
        status: Option<RiskStatus>,
    ) -> Result<Vec<Risk>, RepositoryError>;
    fn open_risks(&self, project_id: ProjectId) -> Result<Vec<Risk>, RepositoryError> {
        self.list_risks(
            EntryFilter {
                project_id: Some(project_id),
                author: None,
            },
            Some(RiskStatus::Open),
        )
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit trail sink (kept apart so it can live in a separate collection or service).
pub trait ActivityLog: Send + Sync {
    fn append(&self, entry: ActivityEntry) -> Result<(), ActivityError>;
    fn recent(
        &self,
        project_id: ProjectId,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, ActivityError>;
    fn purge(&self, project_id: ProjectId) -> Result<(), ActivityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("activity log unavailable: {0}")]
    Unavailable(String),
}
