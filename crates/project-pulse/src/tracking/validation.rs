use chrono::NaiveDate;

use super::domain::{
    CheckInSubmission, FeedbackSubmission, NewProject, NewUser, ProjectUpdate, RiskReport,
    RiskUpdate,
};

/// Rejected input, reported back to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Confidence level must be between 1 and 5")]
    ConfidenceOutOfRange,
    #[error("Completion percentage must be between 0 and 100")]
    CompletionOutOfRange,
    #[error("Satisfaction rating must be between 1 and 5")]
    SatisfactionOutOfRange,
    #[error("Communication rating must be between 1 and 5")]
    CommunicationOutOfRange,
    #[error("end date {end} must fall after start date {start}")]
    InvertedSchedule { start: NaiveDate, end: NaiveDate },
    #[error("email address is malformed")]
    MalformedEmail,
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("{field} must reference an existing {role} account")]
    UnknownAccount {
        field: &'static str,
        role: &'static str,
    },
}

const MIN_PASSWORD_LENGTH: usize = 8;

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

fn require_if_present(value: Option<&String>, field: &'static str) -> Result<(), ValidationError> {
    value.map_or(Ok(()), |value| require(value, field))
}

fn rating(value: u8, error: ValidationError) -> Result<(), ValidationError> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(error)
    }
}

fn schedule(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end > start {
        Ok(())
    } else {
        Err(ValidationError::InvertedSchedule { start, end })
    }
}

pub(crate) fn check_in(submission: &CheckInSubmission) -> Result<(), ValidationError> {
    require(&submission.progress_summary, "progress_summary")?;
    rating(
        submission.confidence_level,
        ValidationError::ConfidenceOutOfRange,
    )?;
    let completion = submission.completion_percentage;
    if !completion.is_finite() || !(0.0..=100.0).contains(&completion) {
        return Err(ValidationError::CompletionOutOfRange);
    }
    Ok(())
}

pub(crate) fn feedback(submission: &FeedbackSubmission) -> Result<(), ValidationError> {
    rating(
        submission.satisfaction_rating,
        ValidationError::SatisfactionOutOfRange,
    )?;
    rating(
        submission.communication_rating,
        ValidationError::CommunicationOutOfRange,
    )
}

pub(crate) fn risk_report(report: &RiskReport) -> Result<(), ValidationError> {
    require(&report.title, "title")?;
    require(&report.mitigation_plan, "mitigation_plan")
}

pub(crate) fn risk_update(update: &RiskUpdate) -> Result<(), ValidationError> {
    require_if_present(update.title.as_ref(), "title")?;
    require_if_present(update.mitigation_plan.as_ref(), "mitigation_plan")
}

pub(crate) fn new_project(project: &NewProject) -> Result<(), ValidationError> {
    require(&project.name, "name")?;
    require(&project.description, "description")?;
    if project.employee_ids.is_empty() {
        return Err(ValidationError::MissingField("employee_ids"));
    }
    schedule(project.start_date, project.end_date)
}

/// Validates an edit against the dates it would leave on the project.
pub(crate) fn project_update(
    update: &ProjectUpdate,
    current_start: NaiveDate,
    current_end: NaiveDate,
) -> Result<(), ValidationError> {
    require_if_present(update.name.as_ref(), "name")?;
    require_if_present(update.description.as_ref(), "description")?;
    if matches!(&update.employee_ids, Some(ids) if ids.is_empty()) {
        return Err(ValidationError::MissingField("employee_ids"));
    }
    schedule(
        update.start_date.unwrap_or(current_start),
        update.end_date.unwrap_or(current_end),
    )
}

pub(crate) fn new_user(user: &NewUser) -> Result<(), ValidationError> {
    require(&user.name, "name")?;
    require(&user.email, "email")?;
    let email = user.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(ValidationError::MalformedEmail),
    }
    if user.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::domain::{ProjectId, Role};

    fn submission(confidence_level: u8, completion_percentage: f64) -> CheckInSubmission {
        CheckInSubmission {
            project_id: ProjectId::new(),
            progress_summary: "Wired checkout flow".to_string(),
            blockers: String::new(),
            confidence_level,
            completion_percentage,
            week_start: None,
        }
    }

    #[test]
    fn check_in_ranges_are_enforced() {
        assert!(check_in(&submission(1, 0.0)).is_ok());
        assert!(check_in(&submission(5, 100.0)).is_ok());
        assert_eq!(
            check_in(&submission(0, 50.0)),
            Err(ValidationError::ConfidenceOutOfRange)
        );
        assert_eq!(
            check_in(&submission(6, 50.0)),
            Err(ValidationError::ConfidenceOutOfRange)
        );
        assert_eq!(
            check_in(&submission(3, 100.5)),
            Err(ValidationError::CompletionOutOfRange)
        );
        assert_eq!(
            check_in(&submission(3, f64::NAN)),
            Err(ValidationError::CompletionOutOfRange)
        );
    }

    #[test]
    fn check_in_requires_summary() {
        let mut blank = submission(3, 10.0);
        blank.progress_summary = "   ".to_string();
        assert_eq!(
            check_in(&blank),
            Err(ValidationError::MissingField("progress_summary"))
        );
    }

    #[test]
    fn feedback_ratings_are_enforced() {
        let mut submission = FeedbackSubmission {
            project_id: ProjectId::new(),
            satisfaction_rating: 4,
            communication_rating: 5,
            comments: String::new(),
            issue_flagged: false,
            week_start: None,
        };
        assert!(feedback(&submission).is_ok());

        submission.communication_rating = 0;
        assert_eq!(
            feedback(&submission),
            Err(ValidationError::CommunicationOutOfRange)
        );

        submission.satisfaction_rating = 9;
        assert_eq!(
            feedback(&submission),
            Err(ValidationError::SatisfactionOutOfRange)
        );
    }

    #[test]
    fn project_update_checks_resulting_schedule() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid");
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid");
        let update = ProjectUpdate {
            end_date: Some(start),
            ..ProjectUpdate::default()
        };
        assert_eq!(
            project_update(&update, start, end),
            Err(ValidationError::InvertedSchedule { start, end: start })
        );
        assert!(project_update(&ProjectUpdate::default(), start, end).is_ok());
    }

    #[test]
    fn new_user_requires_plausible_email_and_password() {
        let mut user = NewUser {
            email: "employee2@projectpulse.com".to_string(),
            name: "Sarah Engineer".to_string(),
            role: Role::Employee,
            password: "Employee@123".to_string(),
        };
        assert!(new_user(&user).is_ok());

        user.password = "short".to_string();
        assert_eq!(new_user(&user), Err(ValidationError::WeakPassword(8)));

        user.email = "not-an-email".to_string();
        assert_eq!(new_user(&user), Err(ValidationError::MalformedEmail));
    }
}
