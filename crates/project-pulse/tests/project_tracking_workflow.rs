use std::sync::Arc;

use chrono::{Duration, Utc};
use project_pulse::auth::{Caller, TokenService};
use project_pulse::config::{AuthConfig, TrackingConfig};
use project_pulse::health::{
    compute_health_score, HealthStatus, ProjectWindow, RiskSeverity, RiskSignal,
};
use project_pulse::tracking::{
    ActivityKind, CheckInSubmission, FeedbackSubmission, InMemoryActivityLog,
    InMemoryTrackingStore, NewProject, NewUser, ProjectStatus, ProjectTrackingService,
    RiskReport, Role, TrackingError, UserView,
};

type Service = ProjectTrackingService<InMemoryTrackingStore, InMemoryActivityLog>;

fn service() -> Service {
    let tokens = Arc::new(TokenService::new(&AuthConfig {
        jwt_secret: "workflow-secret".to_string(),
        token_ttl_hours: 1,
        secure_cookies: false,
    }));
    ProjectTrackingService::new(
        Arc::new(InMemoryTrackingStore::default()),
        Arc::new(InMemoryActivityLog::default()),
        tokens,
        TrackingConfig::default(),
    )
}

fn register(service: &Service, email: &str, name: &str, role: Role) -> Caller {
    let view: UserView = service
        .bootstrap_user(NewUser {
            email: email.to_string(),
            name: name.to_string(),
            role,
            password: "Workflow@123".to_string(),
        })
        .expect("account registered");
    Caller {
        user_id: view.id,
        email: view.email,
        role: view.role,
    }
}

#[test]
fn weekly_signals_drive_project_health_end_to_end() {
    let service = service();
    let admin = register(&service, "admin@projectpulse.com", "Admin User", Role::Admin);
    let employee = register(
        &service,
        "employee@projectpulse.com",
        "John Developer",
        Role::Employee,
    );
    let client = register(
        &service,
        "client@projectpulse.com",
        "Client Representative",
        Role::Client,
    );

    let today = Utc::now().date_naive();
    let project = service
        .create_project(
            &admin,
            NewProject {
                name: "Mobile App Development".to_string(),
                description: "Native app with real-time sync".to_string(),
                client_id: client.user_id,
                employee_ids: vec![employee.user_id],
                start_date: today - Duration::days(30),
                end_date: today + Duration::days(30),
            },
        )
        .expect("project created")
        .record;

    service
        .submit_check_in(
            &employee,
            CheckInSubmission {
                project_id: project.id,
                progress_summary: "Sync engine merged".to_string(),
                blockers: String::new(),
                confidence_level: 4,
                completion_percentage: 60.0,
                week_start: None,
            },
        )
        .expect("check-in accepted");
    service
        .submit_feedback(
            &client,
            FeedbackSubmission {
                project_id: project.id,
                satisfaction_rating: 5,
                communication_rating: 4,
                comments: "Happy with the demo".to_string(),
                issue_flagged: false,
                week_start: None,
            },
        )
        .expect("feedback accepted");
    let risk = service
        .report_risk(
            &employee,
            RiskReport {
                project_id: project.id,
                title: "App store review lead time".to_string(),
                severity: RiskSeverity::Medium,
                mitigation_plan: "Submit a beta build early".to_string(),
            },
        )
        .expect("risk reported");

    // 0.875 * 30 + 0.75 * 25 + 1 * 25 + 0.85 * 20
    assert_eq!(risk.health.score, 87);
    assert_eq!(risk.health.status, HealthStatus::OnTrack);

    let detail = service
        .get_project(&client, project.id)
        .expect("client reads own project");
    assert_eq!(detail.project.health_score, 87);
    assert_eq!(detail.project.status, ProjectStatus::OnTrack);
    assert_eq!(detail.open_risks, 1);

    let activity = service
        .project_activity(&employee, project.id)
        .expect("activity readable");
    assert!(activity
        .iter()
        .any(|entry| entry.kind == ActivityKind::RiskCreated));

    let again = service.submit_feedback(
        &client,
        FeedbackSubmission {
            project_id: project.id,
            satisfaction_rating: 1,
            communication_rating: 1,
            comments: String::new(),
            issue_flagged: true,
            week_start: None,
        },
    );
    assert!(matches!(again, Err(TrackingError::Duplicate(_))));
}

#[test]
fn compute_health_score_matches_engine_bounds() {
    let today = Utc::now().date_naive();
    let window = ProjectWindow {
        start_date: today + Duration::days(10),
        end_date: today + Duration::days(70),
    };
    let risks = vec![
        RiskSignal {
            severity: RiskSeverity::High,
        };
        5
    ];

    // Not started: neutral satisfaction and confidence, full timeline, floor risk factor.
    assert_eq!(compute_health_score(&window, &[], &[], &risks), 68);
    assert_eq!(compute_health_score(&window, &[], &[], &[]), 84);
}
