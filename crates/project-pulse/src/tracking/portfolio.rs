use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Project, ProjectId, ProjectStatus};
use crate::health::{status_for_score, HealthStatus};

/// Per-project facts gathered by the service before summarising.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProjectSignals<'a> {
    pub project: &'a Project,
    pub latest_check_in: Option<DateTime<Utc>>,
    pub open_high_risks: usize,
}

/// Counts of projects per health band, derived from the stored score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BandCounts {
    pub on_track: usize,
    pub at_risk: usize,
    pub critical: usize,
}

/// Counts of projects per persisted status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub on_track: usize,
    pub at_risk: usize,
    pub critical: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDigest {
    pub id: ProjectId,
    pub name: String,
    pub health_score: u8,
    pub status: ProjectStatus,
    pub last_check_in: Option<DateTime<Utc>>,
    pub open_high_risks: usize,
}

/// Admin dashboard across every project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_projects: usize,
    pub average_health: Option<u8>,
    pub by_health: BandCounts,
    pub by_status: StatusCounts,
    /// Active projects without a check-in since the grace cutoff.
    pub missing_check_ins: Vec<ProjectDigest>,
    /// Projects carrying at least one open High severity risk.
    pub high_risk: Vec<ProjectDigest>,
}

pub(crate) fn summarize(
    projects: &[ProjectSignals<'_>],
    cutoff: DateTime<Utc>,
) -> PortfolioSummary {
    let mut by_health = BandCounts::default();
    let mut by_status = StatusCounts::default();
    let mut missing_check_ins = Vec::new();
    let mut high_risk = Vec::new();
    let mut score_total = 0u32;

    for signals in projects {
        let project = signals.project;
        score_total += u32::from(project.health_score);

        match status_for_score(project.health_score) {
            HealthStatus::OnTrack => by_health.on_track += 1,
            HealthStatus::AtRisk => by_health.at_risk += 1,
            HealthStatus::Critical => by_health.critical += 1,
        }
        match project.status {
            ProjectStatus::OnTrack => by_status.on_track += 1,
            ProjectStatus::AtRisk => by_status.at_risk += 1,
            ProjectStatus::Critical => by_status.critical += 1,
            ProjectStatus::Completed => by_status.completed += 1,
        }

        let stale = signals
            .latest_check_in
            .map_or(true, |created_at| created_at < cutoff);
        if stale && project.status != ProjectStatus::Completed {
            missing_check_ins.push(digest(signals));
        }
        if signals.open_high_risks > 0 {
            high_risk.push(digest(signals));
        }
    }

    let average_health = u32::try_from(projects.len())
        .ok()
        .filter(|count| *count > 0)
        .map(|count| (f64::from(score_total) / f64::from(count)).round() as u8);

    PortfolioSummary {
        total_projects: projects.len(),
        average_health,
        by_health,
        by_status,
        missing_check_ins,
        high_risk,
    }
}

fn digest(signals: &ProjectSignals<'_>) -> ProjectDigest {
    ProjectDigest {
        id: signals.project.id,
        name: signals.project.name.clone(),
        health_score: signals.project.health_score,
        status: signals.project.status,
        last_check_in: signals.latest_check_in,
        open_high_risks: signals.open_high_risks,
    }
}
