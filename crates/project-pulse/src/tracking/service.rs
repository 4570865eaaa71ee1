use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::domain::{
    week_start_for, ActivityEntry, ActivityId, ActivityKind, CheckIn, CheckInId,
    CheckInSubmission, Feedback, FeedbackId, FeedbackSubmission, NewProject, NewUser, Project,
    ProjectId, ProjectStatus, ProjectUpdate, Risk, RiskId, RiskReport, RiskStatus, RiskUpdate,
    Role, User, UserId, UserView,
};
use super::portfolio::{self, PortfolioSummary};
use super::repository::{
    ActivityError, ActivityLog, EntryFilter, HealthUpdate, ProjectScope, RepositoryError,
    TrackingRepository,
};
use super::validation::{self, ValidationError};
use crate::auth::{hash_password, verify_password, AuthError, Caller, TokenService};
use crate::config::TrackingConfig;
use crate::health::{HealthInputs, HealthReport, HealthScoreEngine, RiskSeverity};

/// Source of the current time, injectable so recompute timing is reproducible.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Successful login: the profile plus a signed session token.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: UserView,
    pub token: String,
}

/// A created or updated record together with the project health it produced.
#[derive(Debug, Clone, Serialize)]
pub struct Recorded<T> {
    #[serde(flatten)]
    pub record: T,
    pub health: HealthReport,
}

/// Project read model with the freshly computed health and resolved members.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub client: Option<UserView>,
    pub employees: Vec<UserView>,
    pub open_risks: usize,
    pub health: HealthReport,
    /// Whether this read rewrote the stored score.
    pub refreshed: bool,
}

/// Service composing the store, the audit trail, and the health engine.
pub struct ProjectTrackingService<R, L> {
    repository: Arc<R>,
    activity: Arc<L>,
    tokens: Arc<TokenService>,
    engine: HealthScoreEngine,
    config: TrackingConfig,
    clock: Arc<dyn Clock>,
}

impl<R, L> ProjectTrackingService<R, L>
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    pub fn new(
        repository: Arc<R>,
        activity: Arc<L>,
        tokens: Arc<TokenService>,
        config: TrackingConfig,
    ) -> Self {
        Self::with_clock(repository, activity, tokens, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        activity: Arc<L>,
        tokens: Arc<TokenService>,
        config: TrackingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            activity,
            tokens,
            engine: HealthScoreEngine::new(),
            config,
            clock,
        }
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        Arc::clone(&self.tokens)
    }

    // ---- accounts -------------------------------------------------------------------------

    pub fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, TrackingError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingField("email and password").into());
        }

        let user = match self.repository.find_user_by_email(&email)? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                warn!(%email, "rejected login attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, role = user.role.label(), "user signed in");
        Ok(LoginOutcome {
            user: user.view(),
            token,
        })
    }

    pub fn current_user(&self, caller: &Caller) -> Result<UserView, TrackingError> {
        self.repository
            .fetch_user(caller.user_id)?
            .map(|user| user.view())
            .ok_or(TrackingError::NotFound("User"))
    }

    pub fn list_users(
        &self,
        caller: &Caller,
        role: Option<Role>,
    ) -> Result<Vec<UserView>, TrackingError> {
        require_role(caller, &[Role::Admin])?;
        Ok(self
            .repository
            .list_users(role)?
            .iter()
            .map(User::view)
            .collect())
    }

    pub fn create_user(
        &self,
        caller: &Caller,
        new_user: NewUser,
    ) -> Result<UserView, TrackingError> {
        require_role(caller, &[Role::Admin])?;
        self.bootstrap_user(new_user)
    }

    /// Registers an account without an acting admin; used for seeding.
    pub fn bootstrap_user(&self, new_user: NewUser) -> Result<UserView, TrackingError> {
        validation::new_user(&new_user)?;
        let email = normalize_email(&new_user.email);
        if self.repository.find_user_by_email(&email)?.is_some() {
            return Err(TrackingError::Duplicate("Email already registered"));
        }

        let now = self.clock.now();
        let user = User {
            id: UserId::new(),
            email,
            name: new_user.name.trim().to_string(),
            role: new_user.role,
            password_hash: hash_password(&new_user.password)?,
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .repository
            .insert_user(user)
            .map_err(|err| match err {
                RepositoryError::Conflict => TrackingError::Duplicate("Email already registered"),
                other => other.into(),
            })?;
        info!(user_id = %stored.id, role = stored.role.label(), "user registered");
        Ok(stored.view())
    }

    // ---- projects -------------------------------------------------------------------------

    pub fn list_projects(&self, caller: &Caller) -> Result<Vec<Project>, TrackingError> {
        let scope = match caller.role {
            Role::Admin => ProjectScope::All,
            Role::Employee => ProjectScope::AssignedTo(caller.user_id),
            Role::Client => ProjectScope::OwnedBy(caller.user_id),
        };
        Ok(self.repository.list_projects(scope)?)
    }

    /// Reads a project, recomputing its health and patching the stored score when it has
    /// drifted beyond the configured tolerance.
    pub fn get_project(
        &self,
        caller: &Caller,
        project_id: ProjectId,
    ) -> Result<ProjectDetail, TrackingError> {
        let mut project = self.visible_project(caller, project_id)?;
        let inputs = self.snapshot(&project)?;
        let now = self.clock.now();
        let report = self.engine.evaluate(&inputs, now);

        let drift = report.score.abs_diff(project.health_score);
        let refreshed = drift > self.config.drift_tolerance;
        if refreshed {
            debug!(%project_id, drift, "stored health score drifted; refreshing");
            let status = self.persist_health(&project, &report, now)?;
            self.note_band_change(
                project_id,
                project.status,
                status,
                caller.user_id,
                &report,
                now,
            )?;
            project.status = status;
            project.updated_at = now;
        }
        project.health_score = report.score;

        let client = self
            .repository
            .fetch_user(project.client_id)?
            .map(|user| user.view());
        let mut employees = Vec::with_capacity(project.employee_ids.len());
        for employee_id in &project.employee_ids {
            if let Some(user) = self.repository.fetch_user(*employee_id)? {
                employees.push(user.view());
            }
        }

        Ok(ProjectDetail {
            open_risks: inputs.open_risks.len(),
            project,
            client,
            employees,
            health: report,
            refreshed,
        })
    }

    pub fn create_project(
        &self,
        caller: &Caller,
        new_project: NewProject,
    ) -> Result<Recorded<Project>, TrackingError> {
        require_role(caller, &[Role::Admin])?;
        validation::new_project(&new_project)?;
        self.ensure_account(new_project.client_id, Role::Client, "client_id")?;
        for employee_id in &new_project.employee_ids {
            self.ensure_account(*employee_id, Role::Employee, "employee_ids")?;
        }

        let now = self.clock.now();
        let mut project = Project {
            id: ProjectId::new(),
            name: new_project.name.trim().to_string(),
            description: new_project.description.trim().to_string(),
            client_id: new_project.client_id,
            employee_ids: dedup(new_project.employee_ids),
            start_date: new_project.start_date,
            end_date: new_project.end_date,
            status: ProjectStatus::OnTrack,
            health_score: 0,
            created_at: now,
            updated_at: now,
        };
        let report = self.engine.evaluate(&empty_inputs(&project), now);
        project.health_score = report.score;
        project.status = report.status.into();

        let stored = self.repository.insert_project(project)?;
        self.log(
            stored.id,
            caller.user_id,
            ActivityKind::StatusChange,
            "Project created".to_string(),
            json!({ "health_score": report.score, "status": report.status }),
            now,
        )?;
        info!(project_id = %stored.id, score = report.score, "project created");

        Ok(Recorded {
            record: stored,
            health: report,
        })
    }

    pub fn update_project(
        &self,
        caller: &Caller,
        project_id: ProjectId,
        update: ProjectUpdate,
    ) -> Result<Recorded<Project>, TrackingError> {
        require_role(caller, &[Role::Admin])?;
        let mut project = self
            .repository
            .fetch_project(project_id)?
            .ok_or(TrackingError::NotFound("Project"))?;
        validation::project_update(&update, project.start_date, project.end_date)?;

        let ProjectUpdate {
            name,
            description,
            client_id,
            employee_ids,
            start_date,
            end_date,
            status,
        } = update;

        if let Some(client_id) = client_id {
            self.ensure_account(client_id, Role::Client, "client_id")?;
            project.client_id = client_id;
        }
        if let Some(employee_ids) = employee_ids {
            for employee_id in &employee_ids {
                self.ensure_account(*employee_id, Role::Employee, "employee_ids")?;
            }
            project.employee_ids = dedup(employee_ids);
        }
        if let Some(name) = name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = description {
            project.description = description.trim().to_string();
        }

        let schedule_changed = start_date.is_some_and(|date| date != project.start_date)
            || end_date.is_some_and(|date| date != project.end_date);
        project.start_date = start_date.unwrap_or(project.start_date);
        project.end_date = end_date.unwrap_or(project.end_date);

        let now = self.clock.now();
        let previous_status = project.status;
        let report = self.engine.evaluate(&self.snapshot(&project)?, now);
        if schedule_changed {
            project.health_score = report.score;
            if project.status != ProjectStatus::Completed {
                project.status = report.status.into();
            }
        }
        if let Some(status) = status {
            project.status = status;
        }
        project.updated_at = now;

        self.repository.update_project(project.clone())?;

        if schedule_changed && status.is_none() {
            self.note_band_change(
                project_id,
                previous_status,
                project.status,
                caller.user_id,
                &report,
                now,
            )?;
        }
        if let Some(status) = status {
            self.log(
                project_id,
                caller.user_id,
                ActivityKind::StatusChange,
                format!("Project status changed to {}", status.label()),
                json!({ "status": status }),
                now,
            )?;
        }
        info!(%project_id, schedule_changed, "project updated");

        Ok(Recorded {
            record: project,
            health: report,
        })
    }

    pub fn delete_project(
        &self,
        caller: &Caller,
        project_id: ProjectId,
    ) -> Result<(), TrackingError> {
        require_role(caller, &[Role::Admin])?;
        self.repository
            .delete_project(project_id)
            .map_err(|err| match err {
                RepositoryError::NotFound => TrackingError::NotFound("Project"),
                other => other.into(),
            })?;
        self.activity.purge(project_id)?;
        info!(%project_id, "project deleted");
        Ok(())
    }

    // ---- check-ins ------------------------------------------------------------------------

    pub fn submit_check_in(
        &self,
        caller: &Caller,
        submission: CheckInSubmission,
    ) -> Result<Recorded<CheckIn>, TrackingError> {
        require_role(caller, &[Role::Employee])?;
        validation::check_in(&submission)?;
        let project = self.project_for_member(submission.project_id, caller)?;

        let now = self.clock.now();
        let week_start = week_start_for(submission.week_start.unwrap_or(now.date_naive()));
        if self
            .repository
            .check_in_exists(project.id, caller.user_id, week_start)?
        {
            return Err(TrackingError::Duplicate(
                "Check-in already submitted for this week",
            ));
        }

        let check_in = self.repository.insert_check_in(CheckIn {
            id: CheckInId::new(),
            project_id: project.id,
            employee_id: caller.user_id,
            week_start,
            progress_summary: submission.progress_summary.trim().to_string(),
            blockers: submission.blockers.trim().to_string(),
            confidence_level: submission.confidence_level,
            completion_percentage: submission.completion_percentage,
            created_at: now,
        });
        let check_in = check_in.map_err(|err| match err {
            RepositoryError::Conflict => {
                TrackingError::Duplicate("Check-in already submitted for this week")
            }
            other => other.into(),
        })?;

        self.log(
            project.id,
            caller.user_id,
            ActivityKind::CheckIn,
            "Employee submitted weekly check-in".to_string(),
            json!({
                "confidence_level": check_in.confidence_level,
                "completion_percentage": check_in.completion_percentage,
            }),
            now,
        )?;

        let health = self.recompute(project.id, caller.user_id)?;
        Ok(Recorded {
            record: check_in,
            health,
        })
    }

    pub fn list_check_ins(
        &self,
        caller: &Caller,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<CheckIn>, TrackingError> {
        let visible = self.listing_scope(caller, project_id)?;
        let filter = EntryFilter {
            project_id,
            author: caller.is(Role::Employee).then_some(caller.user_id),
        };
        let entries = self.repository.list_check_ins(filter)?;
        Ok(retain_visible(entries, &visible, |entry| entry.project_id))
    }

    // ---- feedback -------------------------------------------------------------------------

    pub fn submit_feedback(
        &self,
        caller: &Caller,
        submission: FeedbackSubmission,
    ) -> Result<Recorded<Feedback>, TrackingError> {
        require_role(caller, &[Role::Client])?;
        validation::feedback(&submission)?;
        let project = self.project_for_member(submission.project_id, caller)?;

        let now = self.clock.now();
        let week_start = week_start_for(submission.week_start.unwrap_or(now.date_naive()));
        if self
            .repository
            .feedback_exists(project.id, caller.user_id, week_start)?
        {
            return Err(TrackingError::Duplicate(
                "Feedback already submitted for this week",
            ));
        }

        let feedback = self.repository.insert_feedback(Feedback {
            id: FeedbackId::new(),
            project_id: project.id,
            client_id: caller.user_id,
            week_start,
            satisfaction_rating: submission.satisfaction_rating,
            communication_rating: submission.communication_rating,
            comments: submission.comments.trim().to_string(),
            issue_flagged: submission.issue_flagged,
            created_at: now,
        });
        let feedback = feedback.map_err(|err| match err {
            RepositoryError::Conflict => {
                TrackingError::Duplicate("Feedback already submitted for this week")
            }
            other => other.into(),
        })?;

        self.log(
            project.id,
            caller.user_id,
            ActivityKind::Feedback,
            "Client submitted feedback".to_string(),
            json!({
                "satisfaction_rating": feedback.satisfaction_rating,
                "communication_rating": feedback.communication_rating,
                "issue_flagged": feedback.issue_flagged,
            }),
            now,
        )?;

        let health = self.recompute(project.id, caller.user_id)?;
        Ok(Recorded {
            record: feedback,
            health,
        })
    }

    pub fn list_feedback(
        &self,
        caller: &Caller,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<Feedback>, TrackingError> {
        let visible = self.listing_scope(caller, project_id)?;
        let filter = EntryFilter {
            project_id,
            author: caller.is(Role::Client).then_some(caller.user_id),
        };
        let entries = self.repository.list_feedback(filter)?;
        Ok(retain_visible(entries, &visible, |entry| entry.project_id))
    }

    // ---- risks ----------------------------------------------------------------------------

    pub fn report_risk(
        &self,
        caller: &Caller,
        report: RiskReport,
    ) -> Result<Recorded<Risk>, TrackingError> {
        require_role(caller, &[Role::Employee, Role::Admin])?;
        validation::risk_report(&report)?;
        let project = self.project_for_member(report.project_id, caller)?;

        let now = self.clock.now();
        let risk = self.repository.insert_risk(Risk {
            id: RiskId::new(),
            project_id: project.id,
            employee_id: caller.user_id,
            title: report.title.trim().to_string(),
            severity: report.severity,
            mitigation_plan: report.mitigation_plan.trim().to_string(),
            status: RiskStatus::Open,
            created_at: now,
            updated_at: now,
        })?;

        self.log(
            project.id,
            caller.user_id,
            ActivityKind::RiskCreated,
            format!("Risk created: {} ({})", risk.title, risk.severity.label()),
            json!({ "risk_id": risk.id, "severity": risk.severity }),
            now,
        )?;

        let health = self.recompute(project.id, caller.user_id)?;
        Ok(Recorded {
            record: risk,
            health,
        })
    }

    pub fn update_risk(
        &self,
        caller: &Caller,
        risk_id: RiskId,
        update: RiskUpdate,
    ) -> Result<Recorded<Risk>, TrackingError> {
        require_role(caller, &[Role::Employee, Role::Admin])?;
        let mut risk = self
            .repository
            .fetch_risk(risk_id)?
            .ok_or(TrackingError::NotFound("Risk"))?;
        if !caller.is(Role::Admin) && risk.employee_id != caller.user_id {
            return Err(TrackingError::Forbidden(
                "You can only update your own risks",
            ));
        }
        validation::risk_update(&update)?;

        if let Some(title) = update.title {
            risk.title = title.trim().to_string();
        }
        if let Some(severity) = update.severity {
            risk.severity = severity;
        }
        if let Some(plan) = update.mitigation_plan {
            risk.mitigation_plan = plan.trim().to_string();
        }
        if let Some(status) = update.status {
            risk.status = status;
        }

        let now = self.clock.now();
        risk.updated_at = now;
        self.repository.update_risk(risk.clone())?;

        if let Some(status) = update.status {
            self.log(
                risk.project_id,
                caller.user_id,
                ActivityKind::RiskUpdated,
                format!("Risk status changed to {}: {}", status.label(), risk.title),
                json!({ "risk_id": risk.id, "status": status }),
                now,
            )?;
        }

        let health = self.recompute(risk.project_id, caller.user_id)?;
        Ok(Recorded { record: risk, health })
    }

    pub fn list_risks(
        &self,
        caller: &Caller,
        project_id: Option<ProjectId>,
        status: Option<RiskStatus>,
    ) -> Result<Vec<Risk>, TrackingError> {
        let visible = self.listing_scope(caller, project_id)?;
        let filter = EntryFilter {
            project_id,
            author: caller.is(Role::Employee).then_some(caller.user_id),
        };
        let risks = self.repository.list_risks(filter, status)?;
        Ok(retain_visible(risks, &visible, |risk| risk.project_id))
    }

    // ---- activity & portfolio -------------------------------------------------------------

    pub fn project_activity(
        &self,
        caller: &Caller,
        project_id: ProjectId,
    ) -> Result<Vec<ActivityEntry>, TrackingError> {
        self.visible_project(caller, project_id)?;
        Ok(self
            .activity
            .recent(project_id, self.config.activity_limit)?)
    }

    pub fn portfolio(&self, caller: &Caller) -> Result<PortfolioSummary, TrackingError> {
        require_role(caller, &[Role::Admin])?;
        let projects = self.repository.list_projects(ProjectScope::All)?;
        let now = self.clock.now();

        let mut digests = Vec::with_capacity(projects.len());
        for project in &projects {
            let latest_check_in = self
                .repository
                .recent_check_ins(project.id, 1)?
                .first()
                .map(|entry| entry.created_at);
            let open_risks = self.repository.open_risks(project.id)?;
            digests.push(portfolio::ProjectSignals {
                project,
                latest_check_in,
                open_high_risks: open_risks
                    .iter()
                    .filter(|risk| risk.severity == RiskSeverity::High)
                    .count(),
            });
        }

        Ok(portfolio::summarize(
            &digests,
            now - Duration::days(self.config.check_in_grace_days),
        ))
    }

    // ---- health ---------------------------------------------------------------------------

    /// Scores caller-supplied inputs without touching any stored project.
    pub fn preview(&self, inputs: &HealthInputs, now: Option<DateTime<Utc>>) -> HealthReport {
        self.engine
            .evaluate(inputs, now.unwrap_or_else(|| self.clock.now()))
    }

    /// Recomputes and persists the health of `project_id` from its latest bounded windows.
    pub fn recompute(
        &self,
        project_id: ProjectId,
        actor: UserId,
    ) -> Result<HealthReport, TrackingError> {
        let project = self
            .repository
            .fetch_project(project_id)?
            .ok_or(TrackingError::NotFound("Project"))?;
        let now = self.clock.now();
        let report = self.engine.evaluate(&self.snapshot(&project)?, now);

        let status = self.persist_health(&project, &report, now)?;
        self.note_band_change(project_id, project.status, status, actor, &report, now)?;
        info!(
            %project_id,
            score = report.score,
            status = report.status.label(),
            "health score recomputed"
        );
        Ok(report)
    }

    fn snapshot(&self, project: &Project) -> Result<HealthInputs, TrackingError> {
        let window = self.config.recent_window;
        let check_ins = self.repository.recent_check_ins(project.id, window)?;
        let feedback = self.repository.recent_feedback(project.id, window)?;
        let open_risks = self.repository.open_risks(project.id)?;

        Ok(HealthInputs {
            project: project.window(),
            check_ins: check_ins.iter().map(CheckIn::signal).collect(),
            feedback: feedback.iter().map(Feedback::signal).collect(),
            open_risks: open_risks.iter().map(Risk::signal).collect(),
        })
    }

    /// Writes the score; completed projects keep their status. Returns the stored status.
    fn persist_health(
        &self,
        project: &Project,
        report: &HealthReport,
        now: DateTime<Utc>,
    ) -> Result<ProjectStatus, TrackingError> {
        let status = match project.status {
            ProjectStatus::Completed => ProjectStatus::Completed,
            _ => report.status.into(),
        };
        self.repository.write_health(
            project.id,
            HealthUpdate {
                health_score: report.score,
                status,
                updated_at: now,
            },
        )?;
        Ok(status)
    }

    fn note_band_change(
        &self,
        project_id: ProjectId,
        previous: ProjectStatus,
        new_status: ProjectStatus,
        actor: UserId,
        report: &HealthReport,
        now: DateTime<Utc>,
    ) -> Result<(), TrackingError> {
        if previous == new_status {
            return Ok(());
        }
        self.log(
            project_id,
            actor,
            ActivityKind::HealthRecomputed,
            format!(
                "Health moved from {} to {} ({})",
                previous.label(),
                new_status.label(),
                report.score
            ),
            json!({ "health_score": report.score, "status": new_status }),
            now,
        )
    }

    // ---- helpers --------------------------------------------------------------------------

    fn visible_project(
        &self,
        caller: &Caller,
        project_id: ProjectId,
    ) -> Result<Project, TrackingError> {
        let project = self
            .repository
            .fetch_project(project_id)?
            .ok_or(TrackingError::NotFound("Project"))?;
        if project.visible_to(caller.user_id, caller.role) {
            Ok(project)
        } else {
            Err(TrackingError::Forbidden("Forbidden"))
        }
    }

    /// Project the caller may write against: assigned employees, the owning client, or admins.
    fn project_for_member(
        &self,
        project_id: ProjectId,
        caller: &Caller,
    ) -> Result<Project, TrackingError> {
        let project = self
            .repository
            .fetch_project(project_id)?
            .ok_or(TrackingError::NotFound("Project"))?;
        if project.visible_to(caller.user_id, caller.role) {
            Ok(project)
        } else {
            Err(TrackingError::Forbidden(
                "You are not assigned to this project",
            ))
        }
    }

    /// `None` means every project is visible to the caller.
    fn listing_scope(
        &self,
        caller: &Caller,
        project_id: Option<ProjectId>,
    ) -> Result<Option<HashSet<ProjectId>>, TrackingError> {
        if let Some(project_id) = project_id {
            self.visible_project(caller, project_id)?;
            return Ok(None);
        }
        if caller.is(Role::Admin) {
            return Ok(None);
        }
        Ok(Some(
            self.list_projects(caller)?
                .into_iter()
                .map(|project| project.id)
                .collect(),
        ))
    }

    fn ensure_account(
        &self,
        user_id: UserId,
        role: Role,
        field: &'static str,
    ) -> Result<(), TrackingError> {
        match self.repository.fetch_user(user_id)? {
            Some(user) if user.role == role => Ok(()),
            _ => Err(ValidationError::UnknownAccount {
                field,
                role: role.label(),
            }
            .into()),
        }
    }

    fn log(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        kind: ActivityKind,
        description: String,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), TrackingError> {
        self.activity.append(ActivityEntry {
            id: ActivityId::new(),
            project_id,
            user_id,
            kind,
            description,
            metadata,
            created_at: now,
        })?;
        Ok(())
    }
}

fn require_role(caller: &Caller, allowed: &[Role]) -> Result<(), TrackingError> {
    if allowed.contains(&caller.role) {
        Ok(())
    } else {
        warn!(user_id = %caller.user_id, role = caller.role.label(), "role not permitted");
        Err(TrackingError::Forbidden("Forbidden"))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn dedup(ids: Vec<UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn empty_inputs(project: &Project) -> HealthInputs {
    HealthInputs {
        project: project.window(),
        check_ins: Vec::new(),
        feedback: Vec::new(),
        open_risks: Vec::new(),
    }
}

fn retain_visible<T>(
    entries: Vec<T>,
    visible: &Option<HashSet<ProjectId>>,
    project_of: impl Fn(&T) -> ProjectId,
) -> Vec<T> {
    match visible {
        Some(ids) => entries
            .into_iter()
            .filter(|entry| ids.contains(&project_of(entry)))
            .collect(),
        None => entries,
    }
}

/// Error raised by the tracking service.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
}

impl TrackingError {
    pub fn status(&self) -> StatusCode {
        match self {
            TrackingError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackingError::Auth(err) => err.status(),
            TrackingError::Forbidden(_) => StatusCode::FORBIDDEN,
            TrackingError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackingError::Duplicate(_) => StatusCode::CONFLICT,
            TrackingError::Repository(_) | TrackingError::Activity(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TrackingError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "tracking request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
