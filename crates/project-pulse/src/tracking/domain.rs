use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::health::{
    CheckInSignal, FeedbackSignal, HealthStatus, ProjectWindow, RiskSeverity, RiskSignal,
};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

record_id!(
    /// Identifier for admin, employee, and client accounts.
    UserId
);
record_id!(ProjectId);
record_id!(CheckInId);
record_id!(FeedbackId);
record_id!(RiskId);
record_id!(ActivityId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
    Client,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Client => "client",
        }
    }
}

/// Stored account. The password hash never leaves the crate through [`UserView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Admin request to register an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password: String,
}

/// Lifecycle label stored on a project. `Completed` is only ever set by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Critical")]
    Critical,
    #[serde(rename = "Completed")]
    Completed,
}

impl ProjectStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProjectStatus::OnTrack => "On Track",
            ProjectStatus::AtRisk => "At Risk",
            ProjectStatus::Critical => "Critical",
            ProjectStatus::Completed => "Completed",
        }
    }
}

impl From<HealthStatus> for ProjectStatus {
    fn from(value: HealthStatus) -> Self {
        match value {
            HealthStatus::OnTrack => ProjectStatus::OnTrack,
            HealthStatus::AtRisk => ProjectStatus::AtRisk,
            HealthStatus::Critical => ProjectStatus::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub client_id: UserId,
    pub employee_ids: Vec<UserId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ProjectStatus,
    pub health_score: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn window(&self) -> ProjectWindow {
        ProjectWindow {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    pub fn has_employee(&self, user_id: UserId) -> bool {
        self.employee_ids.contains(&user_id)
    }

    /// Whether `user_id` in `role` may read this project and its history.
    pub fn visible_to(&self, user_id: UserId, role: Role) -> bool {
        match role {
            Role::Admin => true,
            Role::Employee => self.has_employee(user_id),
            Role::Client => self.client_id == user_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub client_id: UserId,
    pub employee_ids: Vec<UserId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Partial admin edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<UserId>,
    pub employee_ids: Option<Vec<UserId>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub project_id: ProjectId,
    pub employee_id: UserId,
    pub week_start: NaiveDate,
    pub progress_summary: String,
    pub blockers: String,
    pub confidence_level: u8,
    pub completion_percentage: f64,
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn signal(&self) -> CheckInSignal {
        CheckInSignal {
            confidence_level: self.confidence_level,
            completion_percentage: self.completion_percentage,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInSubmission {
    pub project_id: ProjectId,
    pub progress_summary: String,
    #[serde(default)]
    pub blockers: String,
    pub confidence_level: u8,
    pub completion_percentage: f64,
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub project_id: ProjectId,
    pub client_id: UserId,
    pub week_start: NaiveDate,
    pub satisfaction_rating: u8,
    pub communication_rating: u8,
    pub comments: String,
    pub issue_flagged: bool,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn signal(&self) -> FeedbackSignal {
        FeedbackSignal {
            satisfaction_rating: self.satisfaction_rating,
            communication_rating: self.communication_rating,
            issue_flagged: self.issue_flagged,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSubmission {
    pub project_id: ProjectId,
    pub satisfaction_rating: u8,
    pub communication_rating: u8,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub issue_flagged: bool,
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    Open,
    Resolved,
}

impl RiskStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RiskStatus::Open => "Open",
            RiskStatus::Resolved => "Resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub id: RiskId,
    pub project_id: ProjectId,
    pub employee_id: UserId,
    pub title: String,
    pub severity: RiskSeverity,
    pub mitigation_plan: String,
    pub status: RiskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Risk {
    pub fn signal(&self) -> RiskSignal {
        RiskSignal {
            severity: self.severity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskReport {
    pub project_id: ProjectId,
    pub title: String,
    pub severity: RiskSeverity,
    pub mitigation_plan: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskUpdate {
    pub title: Option<String>,
    pub severity: Option<RiskSeverity>,
    pub mitigation_plan: Option<String>,
    pub status: Option<RiskStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    #[serde(rename = "checkin")]
    CheckIn,
    Feedback,
    RiskCreated,
    RiskUpdated,
    StatusChange,
    HealthRecomputed,
}

/// Append-only audit entry for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Monday of the week containing `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}
