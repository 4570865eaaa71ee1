use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::auth::{Caller, TokenService};
use crate::config::{AuthConfig, TrackingConfig};
use crate::health::RiskSeverity;
use crate::tracking::domain::{
    CheckInSubmission, FeedbackSubmission, NewProject, ProjectId, RiskReport, Role, User, UserId,
};
use crate::tracking::repository::TrackingRepository;
use crate::tracking::service::{Clock, ProjectTrackingService};
use crate::tracking::{InMemoryActivityLog, InMemoryTrackingStore};

pub(super) type TestService = ProjectTrackingService<InMemoryTrackingStore, InMemoryActivityLog>;

/// Clock pinned to a Wednesday in the middle of the fixture schedule.
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock lock");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub(super) fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "tracking-test-secret".to_string(),
        token_ttl_hours: 1,
        secure_cookies: false,
    }
}

pub(super) struct Fixture {
    pub service: Arc<TestService>,
    pub store: InMemoryTrackingStore,
    pub activity: InMemoryActivityLog,
    pub clock: Arc<ManualClock>,
    pub tokens: Arc<TokenService>,
    pub admin: Caller,
    pub employee: Caller,
    pub outsider: Caller,
    pub client: Caller,
}

impl Fixture {
    pub(super) fn new() -> Self {
        let store = InMemoryTrackingStore::default();
        let activity = InMemoryActivityLog::default();
        let clock = Arc::new(ManualClock::new(fixture_now()));
        let tokens = Arc::new(TokenService::new(&auth_config()));
        let service = Arc::new(ProjectTrackingService::with_clock(
            Arc::new(store.clone()),
            Arc::new(activity.clone()),
            Arc::clone(&tokens),
            TrackingConfig::default(),
            clock.clone(),
        ));

        let admin = seed_user(&store, "admin@projectpulse.com", "Admin User", Role::Admin);
        let employee = seed_user(
            &store,
            "employee@projectpulse.com",
            "John Developer",
            Role::Employee,
        );
        let outsider = seed_user(
            &store,
            "employee2@projectpulse.com",
            "Sarah Engineer",
            Role::Employee,
        );
        let client = seed_user(&store, "client@projectpulse.com", "Client Company", Role::Client);

        Self {
            service,
            store,
            activity,
            clock,
            tokens,
            admin,
            employee,
            outsider,
            client,
        }
    }

    /// Creates the standard six-month project through the admin API.
    pub(super) fn project(&self) -> ProjectId {
        self.service
            .create_project(&self.admin, self.new_project())
            .expect("project created")
            .record
            .id
    }

    pub(super) fn new_project(&self) -> NewProject {
        NewProject {
            name: "E-Commerce Platform".to_string(),
            description: "Storefront rebuild with new checkout".to_string(),
            client_id: self.client.user_id,
            employee_ids: vec![self.employee.user_id],
            start_date: date(2025, 1, 1),
            end_date: date(2025, 6, 30),
        }
    }

    pub(super) fn bearer(&self, caller: &Caller) -> String {
        let user = self
            .store
            .fetch_user(caller.user_id)
            .expect("store available")
            .expect("user seeded");
        format!("Bearer {}", self.tokens.issue(&user).expect("token issues"))
    }
}

fn seed_user(store: &InMemoryTrackingStore, email: &str, name: &str, role: Role) -> Caller {
    let now = fixture_now();
    let user = User {
        id: UserId::new(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        password_hash: String::new(),
        created_at: now,
        updated_at: now,
    };
    let stored = store.insert_user(user).expect("user inserted");
    Caller {
        user_id: stored.id,
        email: stored.email,
        role,
    }
}

pub(super) fn check_in(
    project_id: ProjectId,
    confidence_level: u8,
    completion: f64,
) -> CheckInSubmission {
    CheckInSubmission {
        project_id,
        progress_summary: "Completed payment gateway integration".to_string(),
        blockers: String::new(),
        confidence_level,
        completion_percentage: completion,
        week_start: None,
    }
}

pub(super) fn feedback(project_id: ProjectId) -> FeedbackSubmission {
    FeedbackSubmission {
        project_id,
        satisfaction_rating: 3,
        communication_rating: 2,
        comments: "Updates have been sparse".to_string(),
        issue_flagged: true,
        week_start: None,
    }
}

pub(super) fn high_risk(project_id: ProjectId) -> RiskReport {
    RiskReport {
        project_id,
        title: "Third-party API rate limits".to_string(),
        severity: RiskSeverity::High,
        mitigation_plan: "Add caching and request batching".to_string(),
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
