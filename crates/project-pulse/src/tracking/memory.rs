//! Process-local store used by the API binary, the CLI demo, and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use super::domain::{
    ActivityEntry, CheckIn, Feedback, Project, ProjectId, Risk, RiskId, RiskStatus, Role, User,
    UserId,
};
use super::repository::{
    ActivityError, ActivityLog, EntryFilter, HealthUpdate, ProjectScope, RepositoryError,
    TrackingRepository,
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    projects: HashMap<ProjectId, Project>,
    check_ins: Vec<CheckIn>,
    feedback: Vec<Feedback>,
    risks: Vec<Risk>,
}

#[derive(Default, Clone)]
pub struct InMemoryTrackingStore {
    inner: Arc<Mutex<Collections>>,
}

impl InMemoryTrackingStore {
    fn collections(&self) -> Result<MutexGuard<'_, Collections>, RepositoryError> {
        self.inner
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

/// Newest-first by `created_at`; later insertions win ties.
fn newest_first<T: Clone>(
    items: &[T],
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) -> Vec<T> {
    let mut selected: Vec<T> = items.iter().rev().filter(|item| keep(*item)).cloned().collect();
    selected.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    selected
}

fn matches_filter(filter: &EntryFilter, project_id: ProjectId, author: UserId) -> bool {
    filter.project_id.map_or(true, |id| id == project_id)
        && filter.author.map_or(true, |id| id == author)
}

impl TrackingRepository for InMemoryTrackingStore {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.collections()?;
        if guard
            .users
            .iter()
            .any(|existing| existing.id == user.id || existing.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.users.push(user.clone());
        Ok(user)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.collections()?;
        Ok(guard.users.iter().find(|user| user.id == id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let guard = self.collections()?;
        Ok(guard.users.iter().find(|user| user.email == email).cloned())
    }

    fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError> {
        let guard = self.collections()?;
        Ok(guard
            .users
            .iter()
            .filter(|user| role.map_or(true, |role| user.role == role))
            .cloned()
            .collect())
    }

    fn insert_project(&self, project: Project) -> Result<Project, RepositoryError> {
        let mut guard = self.collections()?;
        if guard.projects.contains_key(&project.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.projects.insert(project.id, project.clone());
        Ok(project)
    }

    fn update_project(&self, project: Project) -> Result<(), RepositoryError> {
        let mut guard = self.collections()?;
        match guard.projects.get_mut(&project.id) {
            Some(slot) => {
                *slot = project;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        let guard = self.collections()?;
        Ok(guard.projects.get(&id).cloned())
    }

    fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, RepositoryError> {
        let guard = self.collections()?;
        let mut projects: Vec<Project> = guard
            .projects
            .values()
            .filter(|project| match scope {
                ProjectScope::All => true,
                ProjectScope::AssignedTo(user_id) => project.has_employee(user_id),
                ProjectScope::OwnedBy(user_id) => project.client_id == user_id,
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(projects)
    }

    fn write_health(&self, id: ProjectId, update: HealthUpdate) -> Result<(), RepositoryError> {
        let mut guard = self.collections()?;
        let project = guard.projects.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        project.health_score = update.health_score;
        project.status = update.status;
        project.updated_at = update.updated_at;
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError> {
        let mut guard = self.collections()?;
        if guard.projects.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        guard.check_ins.retain(|entry| entry.project_id != id);
        guard.feedback.retain(|entry| entry.project_id != id);
        guard.risks.retain(|entry| entry.project_id != id);
        Ok(())
    }

    fn insert_check_in(&self, check_in: CheckIn) -> Result<CheckIn, RepositoryError> {
        let mut guard = self.collections()?;
        if guard.check_ins.iter().any(|entry| {
            entry.project_id == check_in.project_id
                && entry.employee_id == check_in.employee_id
                && entry.week_start == check_in.week_start
        }) {
            return Err(RepositoryError::Conflict);
        }
        guard.check_ins.push(check_in.clone());
        Ok(check_in)
    }

    fn recent_check_ins(
        &self,
        project_id: ProjectId,
        limit: usize,
    ) -> Result<Vec<CheckIn>, RepositoryError> {
        let guard = self.collections()?;
        let mut entries = newest_first(
            &guard.check_ins,
            |entry| entry.project_id == project_id,
            |entry| entry.created_at,
        );
        entries.truncate(limit);
        Ok(entries)
    }

    fn list_check_ins(&self, filter: EntryFilter) -> Result<Vec<CheckIn>, RepositoryError> {
        let guard = self.collections()?;
        Ok(newest_first(
            &guard.check_ins,
            |entry| matches_filter(&filter, entry.project_id, entry.employee_id),
            |entry| entry.created_at,
        ))
    }

    fn check_in_exists(
        &self,
        project_id: ProjectId,
        employee_id: UserId,
        week_start: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let guard = self.collections()?;
        Ok(guard.check_ins.iter().any(|entry| {
            entry.project_id == project_id
                && entry.employee_id == employee_id
                && entry.week_start == week_start
        }))
    }

    fn insert_feedback(&self, feedback: Feedback) -> Result<Feedback, RepositoryError> {
        let mut guard = self.collections()?;
        if guard.feedback.iter().any(|entry| {
            entry.project_id == feedback.project_id
                && entry.client_id == feedback.client_id
                && entry.week_start == feedback.week_start
        }) {
            return Err(RepositoryError::Conflict);
        }
        guard.feedback.push(feedback.clone());
        Ok(feedback)
    }

    fn recent_feedback(
        &self,
        project_id: ProjectId,
        limit: usize,
    ) -> Result<Vec<Feedback>, RepositoryError> {
        let guard = self.collections()?;
        let mut entries = newest_first(
            &guard.feedback,
            |entry| entry.project_id == project_id,
            |entry| entry.created_at,
        );
        entries.truncate(limit);
        Ok(entries)
    }

    fn list_feedback(&self, filter: EntryFilter) -> Result<Vec<Feedback>, RepositoryError> {
        let guard = self.collections()?;
        Ok(newest_first(
            &guard.feedback,
            |entry| matches_filter(&filter, entry.project_id, entry.client_id),
            |entry| entry.created_at,
        ))
    }

    fn feedback_exists(
        &self,
        project_id: ProjectId,
        client_id: UserId,
        week_start: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let guard = self.collections()?;
        Ok(guard.feedback.iter().any(|entry| {
            entry.project_id == project_id
                && entry.client_id == client_id
                && entry.week_start == week_start
        }))
    }

    fn insert_risk(&self, risk: Risk) -> Result<Risk, RepositoryError> {
        let mut guard = self.collections()?;
        if guard.risks.iter().any(|existing| existing.id == risk.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.risks.push(risk.clone());
        Ok(risk)
    }

    fn update_risk(&self, risk: Risk) -> Result<(), RepositoryError> {
        let mut guard = self.collections()?;
        let slot = guard
            .risks
            .iter_mut()
            .find(|existing| existing.id == risk.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = risk;
        Ok(())
    }

    fn fetch_risk(&self, id: RiskId) -> Result<Option<Risk>, RepositoryError> {
        let guard = self.collections()?;
        Ok(guard.risks.iter().find(|risk| risk.id == id).cloned())
    }

    fn list_risks(
        &self,
        filter: EntryFilter,
        status: Option<RiskStatus>,
    ) -> Result<Vec<Risk>, RepositoryError> {
        let guard = self.collections()?;
        Ok(newest_first(
            &guard.risks,
            |risk| {
                matches_filter(&filter, risk.project_id, risk.employee_id)
                    && status.map_or(true, |status| risk.status == status)
            },
            |risk| risk.created_at,
        ))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryActivityLog {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl InMemoryActivityLog {
    fn entries(&self) -> Result<MutexGuard<'_, Vec<ActivityEntry>>, ActivityError> {
        self.entries
            .lock()
            .map_err(|_| ActivityError::Unavailable("activity mutex poisoned".to_string()))
    }
}

impl ActivityLog for InMemoryActivityLog {
    fn append(&self, entry: ActivityEntry) -> Result<(), ActivityError> {
        self.entries()?.push(entry);
        Ok(())
    }

    fn recent(
        &self,
        project_id: ProjectId,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, ActivityError> {
        let guard = self.entries()?;
        let mut entries = newest_first(
            guard.as_slice(),
            |entry| entry.project_id == project_id,
            |entry| entry.created_at,
        );
        entries.truncate(limit);
        Ok(entries)
    }

    fn purge(&self, project_id: ProjectId) -> Result<(), ActivityError> {
        self.entries()?.retain(|entry| entry.project_id != project_id);
        Ok(())
    }
}
