use super::common::*;
use chrono::Duration;

use crate::health::{HealthStatus, RiskSeverity};
use crate::tracking::domain::{
    ActivityKind, NewUser, ProjectStatus, ProjectUpdate, RiskStatus, RiskUpdate, Role,
};
use crate::tracking::repository::{ActivityLog, HealthUpdate, TrackingRepository};
use crate::tracking::service::TrackingError;
use crate::tracking::validation::ValidationError;

#[test]
fn new_project_starts_with_computed_health() {
    let fixture = Fixture::new();
    let created = fixture
        .service
        .create_project(&fixture.admin, fixture.new_project())
        .expect("project created");

    // 0.7 * 30 + 0.7 * 25 + 0.4 * 25 + 1 * 20 = 68.5
    assert_eq!(created.health.score, 69);
    assert_eq!(created.record.health_score, 69);
    assert_eq!(created.record.status, ProjectStatus::AtRisk);

    let activity = fixture
        .service
        .project_activity(&fixture.admin, created.record.id)
        .expect("activity readable");
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].kind, ActivityKind::StatusChange);
}

#[test]
fn signals_recompute_and_persist_health() {
    let fixture = Fixture::new();
    let project_id = fixture.project();

    let check_in = fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 5, 40.0))
        .expect("check-in accepted");
    assert_eq!(check_in.health.score, 91);
    assert_eq!(check_in.health.status, HealthStatus::OnTrack);
    assert_eq!(check_in.record.week_start, date(2025, 3, 10));

    let feedback = fixture
        .service
        .submit_feedback(&fixture.client, feedback(project_id))
        .expect("feedback accepted");
    // 0.275 * 30 + 25 + 25 + 20 = 78.25
    assert_eq!(feedback.health.score, 78);

    let risk = fixture
        .service
        .report_risk(&fixture.employee, high_risk(project_id))
        .expect("risk reported");
    // High risk leaves 0.75 of the risk weight.
    assert_eq!(risk.health.score, 73);

    let resolved = fixture
        .service
        .update_risk(
            &fixture.employee,
            risk.record.id,
            RiskUpdate {
                status: Some(RiskStatus::Resolved),
                ..RiskUpdate::default()
            },
        )
        .expect("risk resolved");
    assert_eq!(resolved.health.score, 78);

    let stored = fixture
        .store
        .fetch_project(project_id)
        .expect("store available")
        .expect("project exists");
    assert_eq!(stored.health_score, 78);
    assert_eq!(stored.status, ProjectStatus::AtRisk);

    let kinds: Vec<_> = fixture
        .service
        .project_activity(&fixture.admin, project_id)
        .expect("activity readable")
        .into_iter()
        .map(|entry| entry.kind)
        .collect();
    assert!(kinds.contains(&ActivityKind::CheckIn));
    assert!(kinds.contains(&ActivityKind::Feedback));
    assert!(kinds.contains(&ActivityKind::RiskCreated));
    assert!(kinds.contains(&ActivityKind::RiskUpdated));
    assert_eq!(
        kinds
            .iter()
            .filter(|kind| **kind == ActivityKind::HealthRecomputed)
            .count(),
        2,
        "At Risk -> On Track -> At Risk"
    );
}

#[test]
fn second_check_in_in_same_week_conflicts() {
    let fixture = Fixture::new();
    let project_id = fixture.project();

    fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 4, 30.0))
        .expect("first check-in accepted");

    let duplicate = fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 4, 35.0));
    assert!(matches!(duplicate, Err(TrackingError::Duplicate(_))));
    assert_eq!(
        duplicate.err().map(|err| err.status().as_u16()),
        Some(409)
    );

    let mut earlier = check_in(project_id, 4, 20.0);
    earlier.week_start = Some(date(2025, 3, 5));
    let accepted = fixture
        .service
        .submit_check_in(&fixture.employee, earlier)
        .expect("previous week accepted");
    assert_eq!(accepted.record.week_start, date(2025, 3, 3));
}

#[test]
fn read_refreshes_score_once_drift_exceeds_tolerance() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 5, 40.0))
        .expect("check-in accepted");

    let steady = fixture
        .service
        .get_project(&fixture.client, project_id)
        .expect("project readable");
    assert!(!steady.refreshed);
    assert_eq!(steady.project.health_score, 91);

    // Sixty days on, 40% complete against 72.5% expected falls to the lowest timeline band.
    fixture.clock.advance(Duration::days(60));
    let detail = fixture
        .service
        .get_project(&fixture.client, project_id)
        .expect("project readable");
    assert!(detail.refreshed);
    assert_eq!(detail.project.health_score, 76);
    assert_eq!(detail.project.status, ProjectStatus::AtRisk);
    assert_eq!(detail.employees.len(), 1);
    assert_eq!(
        detail.client.map(|client| client.id),
        Some(fixture.client.user_id)
    );

    let stored = fixture
        .store
        .fetch_project(project_id)
        .expect("store available")
        .expect("project exists");
    assert_eq!(stored.health_score, 76);
    assert_eq!(stored.status, ProjectStatus::AtRisk);
}

#[test]
fn small_drift_returns_fresh_score_without_writing() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    fixture
        .store
        .write_health(
            project_id,
            HealthUpdate {
                health_score: 66,
                status: ProjectStatus::AtRisk,
                updated_at: fixture_now(),
            },
        )
        .expect("health written");

    let detail = fixture
        .service
        .get_project(&fixture.admin, project_id)
        .expect("project readable");
    assert!(!detail.refreshed);
    assert_eq!(detail.project.health_score, 69);

    let stored = fixture
        .store
        .fetch_project(project_id)
        .expect("store available")
        .expect("project exists");
    assert_eq!(stored.health_score, 66);
}

#[test]
fn stale_band_is_corrected_and_logged_on_read() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    fixture
        .store
        .write_health(
            project_id,
            HealthUpdate {
                health_score: 40,
                status: ProjectStatus::Critical,
                updated_at: fixture_now(),
            },
        )
        .expect("health written");

    let detail = fixture
        .service
        .get_project(&fixture.admin, project_id)
        .expect("project readable");
    assert!(detail.refreshed);
    assert_eq!(detail.project.status, ProjectStatus::AtRisk);

    let latest = fixture
        .activity
        .recent(project_id, 1)
        .expect("activity readable");
    assert_eq!(latest[0].kind, ActivityKind::HealthRecomputed);
}

#[test]
fn schedule_edit_recomputes_and_completed_status_sticks() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 5, 40.0))
        .expect("check-in accepted");

    let shortened = fixture
        .service
        .update_project(
            &fixture.admin,
            project_id,
            ProjectUpdate {
                end_date: Some(date(2025, 3, 31)),
                ..ProjectUpdate::default()
            },
        )
        .expect("project updated");
    assert_eq!(shortened.record.health_score, 76);
    assert_eq!(shortened.record.status, ProjectStatus::AtRisk);

    let completed = fixture
        .service
        .update_project(
            &fixture.admin,
            project_id,
            ProjectUpdate {
                status: Some(ProjectStatus::Completed),
                ..ProjectUpdate::default()
            },
        )
        .expect("project completed");
    assert_eq!(completed.record.status, ProjectStatus::Completed);

    fixture.clock.advance(Duration::days(7));
    fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 5, 100.0))
        .expect("check-in accepted");
    let stored = fixture
        .store
        .fetch_project(project_id)
        .expect("store available")
        .expect("project exists");
    assert_eq!(stored.status, ProjectStatus::Completed);
}

#[test]
fn inverted_schedule_edit_is_rejected() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    let result = fixture.service.update_project(
        &fixture.admin,
        project_id,
        ProjectUpdate {
            start_date: Some(date(2025, 7, 1)),
            ..ProjectUpdate::default()
        },
    );
    assert!(matches!(
        result,
        Err(TrackingError::Validation(ValidationError::InvertedSchedule { .. }))
    ));
}

#[test]
fn roles_and_assignment_gate_writes() {
    let fixture = Fixture::new();
    let project_id = fixture.project();

    let outsider = fixture
        .service
        .submit_check_in(&fixture.outsider, check_in(project_id, 3, 10.0));
    assert!(matches!(outsider, Err(TrackingError::Forbidden(_))));

    let client = fixture
        .service
        .submit_check_in(&fixture.client, check_in(project_id, 3, 10.0));
    assert!(matches!(client, Err(TrackingError::Forbidden(_))));

    let employee_feedback = fixture
        .service
        .submit_feedback(&fixture.employee, feedback(project_id));
    assert!(matches!(employee_feedback, Err(TrackingError::Forbidden(_))));

    let employee_project = fixture
        .service
        .create_project(&fixture.employee, fixture.new_project());
    assert!(matches!(employee_project, Err(TrackingError::Forbidden(_))));

    let risk = fixture
        .service
        .report_risk(&fixture.employee, high_risk(project_id))
        .expect("risk reported");
    let foreign_update = fixture.service.update_risk(
        &fixture.outsider,
        risk.record.id,
        RiskUpdate {
            severity: Some(RiskSeverity::Low),
            ..RiskUpdate::default()
        },
    );
    assert!(matches!(foreign_update, Err(TrackingError::Forbidden(_))));
}

#[test]
fn project_members_must_hold_matching_roles() {
    let fixture = Fixture::new();
    let mut project = fixture.new_project();
    project.client_id = fixture.employee.user_id;

    let result = fixture.service.create_project(&fixture.admin, project);
    assert!(matches!(
        result,
        Err(TrackingError::Validation(ValidationError::UnknownAccount {
            field: "client_id",
            ..
        }))
    ));
}

#[test]
fn listings_are_scoped_to_the_caller() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 4, 30.0))
        .expect("check-in accepted");

    let client_projects = fixture
        .service
        .list_projects(&fixture.client)
        .expect("projects listed");
    assert_eq!(client_projects.len(), 1);
    assert!(fixture
        .service
        .list_projects(&fixture.outsider)
        .expect("projects listed")
        .is_empty());

    let client_view = fixture
        .service
        .list_check_ins(&fixture.client, None)
        .expect("check-ins listed");
    assert_eq!(client_view.len(), 1);
    assert!(fixture
        .service
        .list_check_ins(&fixture.outsider, None)
        .expect("check-ins listed")
        .is_empty());

    let filtered = fixture
        .service
        .list_check_ins(&fixture.outsider, Some(project_id));
    assert!(matches!(filtered, Err(TrackingError::Forbidden(_))));

    let users = fixture.service.list_users(&fixture.employee, None);
    assert!(matches!(users, Err(TrackingError::Forbidden(_))));
    let employees = fixture
        .service
        .list_users(&fixture.admin, Some(Role::Employee))
        .expect("users listed");
    assert_eq!(employees.len(), 2);
}

#[test]
fn deleting_project_removes_its_records() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 4, 30.0))
        .expect("check-in accepted");
    fixture
        .service
        .report_risk(&fixture.employee, high_risk(project_id))
        .expect("risk reported");

    fixture
        .service
        .delete_project(&fixture.admin, project_id)
        .expect("project deleted");

    assert!(matches!(
        fixture.service.get_project(&fixture.admin, project_id),
        Err(TrackingError::NotFound("Project"))
    ));
    assert!(fixture
        .service
        .list_check_ins(&fixture.admin, None)
        .expect("check-ins listed")
        .is_empty());
    assert!(fixture
        .service
        .list_risks(&fixture.admin, None, None)
        .expect("risks listed")
        .is_empty());
    assert!(fixture
        .activity
        .recent(project_id, 50)
        .expect("activity readable")
        .is_empty());
}

#[test]
fn portfolio_flags_high_risk_and_quiet_projects() {
    let fixture = Fixture::new();
    let project_id = fixture.project();
    fixture
        .service
        .submit_check_in(&fixture.employee, check_in(project_id, 4, 30.0))
        .expect("check-in accepted");
    fixture
        .service
        .report_risk(&fixture.employee, high_risk(project_id))
        .expect("risk reported");

    assert!(matches!(
        fixture.service.portfolio(&fixture.employee),
        Err(TrackingError::Forbidden(_))
    ));

    let summary = fixture
        .service
        .portfolio(&fixture.admin)
        .expect("portfolio readable");
    assert_eq!(summary.total_projects, 1);
    assert_eq!(summary.high_risk.len(), 1);
    assert!(summary.missing_check_ins.is_empty());

    fixture.clock.advance(Duration::days(8));
    let later = fixture
        .service
        .portfolio(&fixture.admin)
        .expect("portfolio readable");
    assert_eq!(later.missing_check_ins.len(), 1);
    assert_eq!(later.missing_check_ins[0].id, project_id);
}

#[test]
fn login_accepts_registered_credentials_only() {
    let fixture = Fixture::new();
    let registered = fixture
        .service
        .create_user(
            &fixture.admin,
            NewUser {
                email: "PM@ProjectPulse.com".to_string(),
                name: "Priya Manager".to_string(),
                role: Role::Admin,
                password: "Manager@123".to_string(),
            },
        )
        .expect("user created");
    assert_eq!(registered.email, "pm@projectpulse.com");

    let outcome = fixture
        .service
        .login(" pm@projectpulse.com ", "Manager@123")
        .expect("login succeeds");
    let caller = fixture.tokens.verify(&outcome.token).expect("token valid");
    assert_eq!(caller.user_id, registered.id);

    let rejected = fixture.service.login("pm@projectpulse.com", "wrong-password");
    assert_eq!(rejected.err().map(|err| err.status().as_u16()), Some(401));

    let duplicate = fixture.service.bootstrap_user(NewUser {
        email: "pm@projectpulse.com".to_string(),
        name: "Another".to_string(),
        role: Role::Client,
        password: "Another@123".to_string(),
    });
    assert!(matches!(duplicate, Err(TrackingError::Duplicate(_))));
}
