//! Per-project and per-cycle results handed to status queries and emitters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use staffline_core::{CycleId, ProjectId, ResourceId, Slot, Time};

use crate::error::Outcome;

/// What happened to one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    /// The project
    pub project_id: ProjectId,
    /// Assigned, skipped or failed
    pub outcome: Outcome,
    /// Resource per slot after the attempt (empty unless assigned)
    pub roles: BTreeMap<Slot, ResourceId>,
    /// Why the project was skipped or failed, or a note on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProjectReport {
    /// A project that ended up fully staffed.
    pub fn assigned(project_id: ProjectId, roles: BTreeMap<Slot, ResourceId>) -> Self {
        Self {
            project_id,
            outcome: Outcome::Assigned,
            roles,
            reason: None,
        }
    }

    /// A project that was skipped or failed.
    pub fn rejected(project_id: ProjectId, outcome: Outcome, reason: impl Into<String>) -> Self {
        Self {
            project_id,
            outcome,
            roles: BTreeMap::new(),
            reason: Some(reason.into()),
        }
    }

    /// Builder: attach a reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Aggregate result of one assignment cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    /// Cycle identifier
    pub cycle_id: CycleId,
    /// When the cycle started
    pub started_at: Time,
    /// When the cycle ended
    pub finished_at: Time,
    /// Eligible projects that were started
    pub attempted: usize,
    /// Projects that ended up assigned
    pub succeeded: usize,
    /// Projects skipped (validation, conflict, no candidate)
    pub skipped: usize,
    /// Projects that failed on I/O
    pub failed: usize,
    /// One line per non-success outcome
    pub errors: Vec<String>,
    /// Every project outcome, in project order
    pub reports: Vec<ProjectReport>,
    /// Whether cancellation stopped the cycle before every project was started
    pub cancelled: bool,
    /// Why the cycle was aborted before processing any project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl CycleResult {
    /// An empty result for a cycle that starts now.
    pub fn begin(cycle_id: CycleId) -> Self {
        let now = chrono::Utc::now();
        Self {
            cycle_id,
            started_at: now,
            finished_at: now,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            reports: Vec::new(),
            cancelled: false,
            aborted: None,
        }
    }

    /// Count one project outcome.
    pub fn record(&mut self, report: ProjectReport) {
        self.attempted += 1;
        match report.outcome {
            Outcome::Assigned => self.succeeded += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
        if report.outcome != Outcome::Assigned {
            let reason = report.reason.as_deref().unwrap_or("unknown");
            self.errors
                .push(format!("{} {}: {}", report.project_id, report.outcome, reason));
        }
        self.reports.push(report);
    }

    /// Stamp the end time and sort reports by project.
    pub fn finish(&mut self) {
        self.reports.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        self.finished_at = chrono::Utc::now();
    }

    /// Mark the cycle as aborted.
    pub fn abort(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.errors.push(format!("cycle aborted: {reason}"));
        self.aborted = Some(reason);
        self.finish();
    }
}
