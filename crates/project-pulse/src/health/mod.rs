//! Project health scoring.
//!
//! The engine folds the most recent check-ins, client feedback, and open risks for a project
//! into a single 0-100 score. It holds no state and performs no I/O, so callers can invoke it
//! from any thread and persist the resulting [`HealthReport`] however they like.

mod components;
mod timeline;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use components::{client_satisfaction, employee_confidence, risk_factor};
pub use timeline::timeline_progress;

const SATISFACTION_WEIGHT: f64 = 30.0;
const CONFIDENCE_WEIGHT: f64 = 25.0;
const TIMELINE_WEIGHT: f64 = 25.0;
const RISK_WEIGHT: f64 = 20.0;

/// Scheduled window of a project; the only project fields the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Progress signal taken from an employee check-in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckInSignal {
    pub confidence_level: u8,
    pub completion_percentage: f64,
    pub created_at: DateTime<Utc>,
}

/// Satisfaction signal taken from a client feedback entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSignal {
    pub satisfaction_rating: u8,
    pub communication_rating: u8,
    #[serde(default)]
    pub issue_flagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

impl RiskSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            RiskSeverity::Low => "Low",
            RiskSeverity::Medium => "Medium",
            RiskSeverity::High => "High",
        }
    }

    pub(crate) const fn penalty(self) -> f64 {
        match self {
            RiskSeverity::Low => 0.05,
            RiskSeverity::Medium => 0.15,
            RiskSeverity::High => 0.25,
        }
    }
}

/// Severity of a risk that is still open against the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSignal {
    pub severity: RiskSeverity,
}

/// Three-band classification derived from a health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Critical")]
    Critical,
}

impl HealthStatus {
    pub const fn label(self) -> &'static str {
        match self {
            HealthStatus::OnTrack => "On Track",
            HealthStatus::AtRisk => "At Risk",
            HealthStatus::Critical => "Critical",
        }
    }
}

/// Maps a score onto its band. Lower bounds are inclusive: 80 is on track, 60 is at risk.
pub const fn status_for_score(score: u8) -> HealthStatus {
    if score >= 80 {
        HealthStatus::OnTrack
    } else if score >= 60 {
        HealthStatus::AtRisk
    } else {
        HealthStatus::Critical
    }
}

/// Snapshot handed to the engine.
///
/// `check_ins` and `feedback` are expected newest-first and already limited to the recent
/// window; `open_risks` may arrive in any order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthInputs {
    pub project: ProjectWindow,
    #[serde(default)]
    pub check_ins: Vec<CheckInSignal>,
    #[serde(default)]
    pub feedback: Vec<FeedbackSignal>,
    #[serde(default)]
    pub open_risks: Vec<RiskSignal>,
}

/// Normalized sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthComponents {
    pub client_satisfaction: f64,
    pub employee_confidence: f64,
    pub timeline_progress: f64,
    pub risk_factor: f64,
}

impl HealthComponents {
    fn weighted_total(&self) -> f64 {
        let mut score = 0.0;
        score += self.client_satisfaction * SATISFACTION_WEIGHT;
        score += self.employee_confidence * CONFIDENCE_WEIGHT;
        score += self.timeline_progress * TIMELINE_WEIGHT;
        score += self.risk_factor * RISK_WEIGHT;
        score
    }
}

/// Engine output: the rounded score, its band, and the contributing sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthReport {
    pub score: u8,
    pub status: HealthStatus,
    pub components: HealthComponents,
}

/// Stateless evaluator for project health.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthScoreEngine;

impl HealthScoreEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scores `inputs` as of `now`.
    pub fn evaluate(&self, inputs: &HealthInputs, now: DateTime<Utc>) -> HealthReport {
        let components = HealthComponents {
            client_satisfaction: client_satisfaction(&inputs.feedback),
            employee_confidence: employee_confidence(&inputs.check_ins),
            timeline_progress: timeline_progress(&inputs.project, &inputs.check_ins, now),
            risk_factor: risk_factor(&inputs.open_risks),
        };

        let score = finalize(components.weighted_total());

        HealthReport {
            score,
            status: status_for_score(score),
            components,
        }
    }
}

/// Scores a project against the current wall clock.
pub fn compute_health_score(
    project: &ProjectWindow,
    recent_check_ins: &[CheckInSignal],
    recent_feedback: &[FeedbackSignal],
    open_risks: &[RiskSignal],
) -> u8 {
    let inputs = HealthInputs {
        project: *project,
        check_ins: recent_check_ins.to_vec(),
        feedback: recent_feedback.to_vec(),
        open_risks: open_risks.to_vec(),
    };
    HealthScoreEngine::new().evaluate(&inputs, Utc::now()).score
}

fn finalize(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
