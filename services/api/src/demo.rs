use crate::infra::{build_service, midnight, ApiService, SeedClock};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use project_pulse::auth::Caller;
use project_pulse::config::AppConfig;
use project_pulse::error::AppError;
use project_pulse::health::{HealthInputs, HealthReport, HealthScoreEngine, RiskSeverity};
use project_pulse::tracking::{
    CheckInSubmission, FeedbackSubmission, NewProject, NewUser, PortfolioSummary, ProjectId,
    RiskReport, RiskStatus, RiskUpdate, Role, UserView,
};
use std::io::Read;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding the project window and signals; `-` reads stdin
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Evaluation date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) now: Option<NaiveDate>,
}

/// Accounts created by the demo seed.
pub(crate) struct DemoAccounts {
    pub(crate) admin: Caller,
    pub(crate) employee: Caller,
    pub(crate) employee2: Caller,
    pub(crate) client: Caller,
    pub(crate) client2: Caller,
}

/// Projects created by the demo seed, in creation order.
pub(crate) struct DemoSeed {
    pub(crate) accounts: DemoAccounts,
    pub(crate) projects: Vec<ProjectId>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = if args.input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)?
    };

    let report = score_report(&raw, args.now.map(midnight).unwrap_or_else(Utc::now))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn score_report(raw: &str, now: DateTime<Utc>) -> Result<HealthReport, AppError> {
    let inputs: HealthInputs = serde_json::from_str(raw)?;
    Ok(HealthScoreEngine::new().evaluate(&inputs, now))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let (service, clock) = build_service(&config);

    let seed = seed_demo_data(&service, &clock, today)?;
    clock.pin(at_noon(today));

    println!("Project Pulse demo ({today})");
    println!("\nProject health");
    for project_id in &seed.projects {
        let detail = service.get_project(&seed.accounts.admin, *project_id)?;
        let components = detail.health.components;
        println!(
            "- {:<32} {:>3} {:<9} sat {:.2} | conf {:.2} | timeline {:.2} | risk {:.2}",
            detail.project.name,
            detail.health.score,
            detail.project.status.label(),
            components.client_satisfaction,
            components.employee_confidence,
            components.timeline_progress,
            components.risk_factor,
        );
    }

    let summary = service.portfolio(&seed.accounts.admin)?;
    render_portfolio(&summary);

    let activity = service.project_activity(&seed.accounts.admin, seed.projects[0])?;
    println!("\nRecent activity ({} entries)", activity.len());
    for entry in activity.iter().take(5) {
        println!(
            "- {} {}",
            entry.created_at.format("%Y-%m-%d"),
            entry.description
        );
    }

    clock.release();
    Ok(())
}

fn render_portfolio(summary: &PortfolioSummary) {
    println!("\nPortfolio");
    println!(
        "  {} projects, average health {}",
        summary.total_projects,
        summary
            .average_health
            .map_or_else(|| "n/a".to_string(), |score| score.to_string())
    );
    println!(
        "  bands: {} on track, {} at risk, {} critical",
        summary.by_health.on_track, summary.by_health.at_risk, summary.by_health.critical
    );

    if summary.high_risk.is_empty() {
        println!("  no open High risks");
    }
    for digest in &summary.high_risk {
        println!(
            "  high risk: {} ({} open)",
            digest.name, digest.open_high_risks
        );
    }
    for digest in &summary.missing_check_ins {
        println!("  missing check-in: {}", digest.name);
    }
}

fn at_noon(date: NaiveDate) -> DateTime<Utc> {
    midnight(date) + Duration::hours(12)
}

fn caller(view: UserView) -> Caller {
    Caller {
        user_id: view.id,
        email: view.email,
        role: view.role,
    }
}

fn account(
    service: &ApiService,
    email: &str,
    name: &str,
    role: Role,
    password: &str,
) -> Result<Caller, AppError> {
    let view = service.bootstrap_user(NewUser {
        email: email.to_string(),
        name: name.to_string(),
        role,
        password: password.to_string(),
    })?;
    Ok(caller(view))
}

fn check_in(
    project_id: ProjectId,
    day: NaiveDate,
    summary: &str,
    blockers: &str,
    confidence_level: u8,
    completion_percentage: f64,
) -> CheckInSubmission {
    CheckInSubmission {
        project_id,
        progress_summary: summary.to_string(),
        blockers: blockers.to_string(),
        confidence_level,
        completion_percentage,
        week_start: Some(day),
    }
}

fn feedback(
    project_id: ProjectId,
    day: NaiveDate,
    ratings: (u8, u8),
    comments: &str,
    issue_flagged: bool,
) -> FeedbackSubmission {
    FeedbackSubmission {
        project_id,
        satisfaction_rating: ratings.0,
        communication_rating: ratings.1,
        comments: comments.to_string(),
        issue_flagged,
        week_start: Some(day),
    }
}

fn risk(project_id: ProjectId, title: &str, severity: RiskSeverity, plan: &str) -> RiskReport {
    RiskReport {
        project_id,
        title: title.to_string(),
        severity,
        mitigation_plan: plan.to_string(),
    }
}

/// Replays a few weeks of history for three projects through the service so every score,
/// status, and activity entry is produced by the normal write path.
pub(crate) fn seed_demo_data(
    service: &ApiService,
    clock: &SeedClock,
    today: NaiveDate,
) -> Result<DemoSeed, AppError> {
    let day = |offset: i64| today - Duration::days(offset);

    clock.pin(at_noon(day(30)));
    let accounts = DemoAccounts {
        admin: account(service, "admin@projectpulse.com", "Admin User", Role::Admin, "Admin@123")?,
        employee: account(
            service,
            "employee@projectpulse.com",
            "John Developer",
            Role::Employee,
            "Employee@123",
        )?,
        employee2: account(
            service,
            "employee2@projectpulse.com",
            "Sarah Engineer",
            Role::Employee,
            "Employee@123",
        )?,
        client: account(
            service,
            "client@projectpulse.com",
            "Client Representative",
            Role::Client,
            "Client@123",
        )?,
        client2: account(
            service,
            "client2@projectpulse.com",
            "Another Client",
            Role::Client,
            "Client@123",
        )?,
    };
    let DemoAccounts {
        admin,
        employee,
        employee2,
        client,
        client2,
    } = &accounts;

    let storefront = service
        .create_project(
            admin,
            NewProject {
                name: "E-Commerce Platform Redesign".to_string(),
                description: "Overhaul of the storefront with a modern UI and faster checkout"
                    .to_string(),
                client_id: client.user_id,
                employee_ids: vec![employee.user_id, employee2.user_id],
                start_date: day(60),
                end_date: today + Duration::days(60),
            },
        )?
        .record
        .id;
    let mobile = service
        .create_project(
            admin,
            NewProject {
                name: "Mobile App Development".to_string(),
                description: "Native iOS and Android app with real-time synchronization"
                    .to_string(),
                client_id: client.user_id,
                employee_ids: vec![employee.user_id],
                start_date: day(45),
                end_date: today + Duration::days(105),
            },
        )?
        .record
        .id;
    let crm = service
        .create_project(
            admin,
            NewProject {
                name: "CRM System Integration".to_string(),
                description: "Integration of a third-party CRM with existing infrastructure"
                    .to_string(),
                client_id: client2.user_id,
                employee_ids: vec![employee2.user_id],
                start_date: day(100),
                end_date: today + Duration::days(20),
            },
        )?
        .record
        .id;

    clock.pin(at_noon(day(16)));
    let browser_risk = service.report_risk(
        employee,
        risk(
            storefront,
            "Browser Compatibility Issues",
            RiskSeverity::Low,
            "Polyfills added; cross-browser testing in progress.",
        ),
    )?;
    service.report_risk(
        employee2,
        risk(
            crm,
            "Data Migration Complexity",
            RiskSeverity::High,
            "External consultant engaged; two weeks of buffer added.",
        ),
    )?;

    clock.pin(at_noon(day(9)));
    service.submit_check_in(
        employee,
        check_in(
            storefront,
            day(9),
            "Implemented shopping cart and product listings",
            "",
            5,
            30.0,
        ),
    )?;
    service.submit_feedback(
        client,
        feedback(
            storefront,
            day(9),
            (4, 5),
            "Slight delay but satisfied with the direction.",
            false,
        ),
    )?;
    service.update_risk(
        employee,
        browser_risk.record.id,
        RiskUpdate {
            status: Some(RiskStatus::Resolved),
            ..RiskUpdate::default()
        },
    )?;

    clock.pin(at_noon(day(2)));
    service.submit_check_in(
        employee,
        check_in(
            storefront,
            day(2),
            "Finished design mockups and started frontend implementation",
            "Waiting for client approval on final design",
            4,
            55.0,
        ),
    )?;
    service.submit_check_in(
        employee,
        check_in(
            mobile,
            day(2),
            "Development environment and base app structure in place",
            "Push notification setup is failing on Android",
            3,
            20.0,
        ),
    )?;
    service.report_risk(
        employee,
        risk(
            mobile,
            "Push Notification Implementation Delay",
            RiskSeverity::Medium,
            "Evaluating alternative push providers; decision by end of week.",
        ),
    )?;
    service.submit_check_in(
        employee2,
        check_in(
            crm,
            day(2),
            "API integration partially complete",
            "Vendor response time is slow",
            2,
            40.0,
        ),
    )?;
    service.report_risk(
        employee2,
        risk(
            crm,
            "CRM Vendor API Documentation Incomplete",
            RiskSeverity::High,
            "Support call scheduled with the vendor.",
        ),
    )?;

    clock.pin(at_noon(day(1)));
    service.submit_feedback(
        client,
        feedback(
            storefront,
            day(1),
            (5, 5),
            "Excellent progress and very responsive team.",
            false,
        ),
    )?;
    service.submit_feedback(
        client,
        feedback(
            mobile,
            day(1),
            (3, 4),
            "Concerned about the pace. Need more frequent updates.",
            true,
        ),
    )?;
    service.submit_feedback(
        client2,
        feedback(
            crm,
            day(1),
            (2, 2),
            "Multiple deadlines missed.",
            true,
        ),
    )?;

    clock.release();
    Ok(DemoSeed {
        accounts,
        projects: vec![storefront, mobile, crm],
    })
}
