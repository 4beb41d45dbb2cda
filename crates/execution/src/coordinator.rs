//! Assignment transaction coordinator.
//!
//! Staffs one project as an all-or-nothing unit:
//!
//! ```text
//! lock project → re-read → rank open slots → lock chosen resources
//!   → re-check capacity → commit (slots + connected) → unlock
//! ```
//!
//! The periodic cycle and manual single-project requests share one
//! coordinator, so they serialize on the same project and resource locks.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use staffline_core::{Project, ProjectId, Resource, ResourceId, Role, Slot};
use staffline_storage::RecordAdapter;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, RetryPolicy};
use crate::eligibility::{accepts_manual, is_eligible};
use crate::error::AssignError;
use crate::locks::LockTable;
use crate::ranking::{Candidate, RankingEngine};
use crate::report::ProjectReport;
use crate::retry::call_with_retry;

/// Who asked for the assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignMode {
    /// Periodic cycle; the project must pass the eligibility filter
    Automatic,
    /// Operator request for one project; only `connected` is checked
    Manual,
}

/// A successful transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    /// Every required slot and its resource
    pub roles: BTreeMap<Slot, ResourceId>,
    /// True when the slots were already filled and only `connected` was set
    pub reconciled: bool,
}

/// Runs assignment transactions against a record store.
pub struct AssignmentCoordinator<A: RecordAdapter> {
    adapter: Arc<A>,
    ranking: RankingEngine,
    locks: LockTable,
    retry: RetryPolicy,
    timeout: Duration,
    max_selection_rounds: u32,
}

impl<A: RecordAdapter> AssignmentCoordinator<A> {
    /// Create a coordinator from the engine configuration.
    pub fn new(adapter: Arc<A>, config: &EngineConfig) -> Self {
        Self {
            adapter,
            ranking: RankingEngine::new(config.weights.clone(), config.platforms.clone()),
            locks: LockTable::new(),
            retry: config.retry.clone(),
            timeout: config.adapter_timeout(),
            max_selection_rounds: config.max_selection_rounds,
        }
    }

    /// Share a lock table with other coordinators over the same store.
    pub fn with_locks(mut self, locks: LockTable) -> Self {
        self.locks = locks;
        self
    }

    /// Staff one project and describe the outcome.
    pub async fn assign(&self, project_id: &ProjectId, mode: AssignMode) -> ProjectReport {
        match self.try_assign(project_id, mode).await {
            Ok(Committed { roles, reconciled }) => {
                let report = ProjectReport::assigned(project_id.clone(), roles);
                if reconciled {
                    report.with_reason("reconciled")
                } else {
                    report
                }
            }
            Err(e) => {
                match &e {
                    AssignError::TransientIo { .. } | AssignError::FatalIo { .. } => {
                        warn!(project_id = %project_id, error = %e, "Project failed")
                    }
                    _ => info!(project_id = %project_id, reason = %e, "Project skipped"),
                }
                ProjectReport::rejected(project_id.clone(), e.outcome(), e.to_string())
            }
        }
    }

    /// Staff one project, returning the committed slots or why nothing was written.
    pub async fn try_assign(&self, project_id: &ProjectId, mode: AssignMode) -> Result<Committed, AssignError> {
        let _project_guard = self.locks.lock_project(project_id).await;

        let project = self.fetch_project(project_id).await?;
        if project.connected {
            return Err(AssignError::Conflict(format!("project {project_id} is already connected")));
        }
        let admitted = match mode {
            AssignMode::Automatic => is_eligible(&project),
            AssignMode::Manual => accepts_manual(&project),
        };
        if !admitted {
            return Err(AssignError::Validation(format!(
                "project {project_id} is not eligible for automatic assignment"
            )));
        }
        if project.required_slots().is_empty() {
            return Err(AssignError::Validation(format!("project {project_id} requires no roles")));
        }

        let open = project.open_slots();
        if open.is_empty() {
            self.call("mark_connected", || self.adapter.mark_connected(project_id))
                .await?;
            info!(project_id = %project_id, "Reconciled fully staffed project");
            return Ok(Committed {
                roles: project.assignments.clone(),
                reconciled: true,
            });
        }

        let pools = self.load_pools(&open).await?;
        let picks = self.select_and_commit(&project, &open, &pools).await?;

        info!(project_id = %project_id, roles = ?picks, "Project assigned");
        let mut roles = project.assignments.clone();
        roles.extend(picks);
        Ok(Committed {
            roles,
            reconciled: false,
        })
    }

    /// Top `top_n` candidates per required slot, without writing anything.
    pub async fn recommend(
        &self,
        project_id: &ProjectId,
        top_n: usize,
    ) -> Result<BTreeMap<Slot, Vec<Candidate>>, AssignError> {
        let project = self.fetch_project(project_id).await?;
        let pools = self.load_pools(&project.required_slots()).await?;
        Ok(self.ranking.recommend(&project, &pools, top_n))
    }

    async fn select_and_commit(
        &self,
        project: &Project,
        open: &[Slot],
        pools: &HashMap<Role, Vec<Resource>>,
    ) -> Result<BTreeMap<Slot, ResourceId>, AssignError> {
        let mut exclude: HashSet<ResourceId> = project.assignments.values().cloned().collect();

        for round in 1..=self.max_selection_rounds {
            let picks = self
                .ranking
                .pick(project, open, pools, &exclude)
                .map_err(AssignError::NoCandidate)?;

            let chosen: Vec<ResourceId> = picks.values().cloned().collect();
            let _guards = self.locks.lock_resources(&chosen).await;

            let mut filled_up = Vec::new();
            for id in &chosen {
                let fresh = self.call("load_resource", || self.adapter.load_resource(id)).await?;
                if !fresh.is_some_and(|r| self.ranking.can_take(&r, project)) {
                    filled_up.push(id.clone());
                }
            }

            if filled_up.is_empty() {
                self.commit(&project.id, &picks).await?;
                return Ok(picks);
            }

            debug!(project_id = %project.id, round, filled_up = ?filled_up, "Chosen resources filled up; reselecting");
            exclude.extend(filled_up);
        }

        Err(AssignError::Conflict(format!(
            "candidates for project {} kept filling up after {} selection rounds",
            project.id, self.max_selection_rounds
        )))
    }

    async fn commit(&self, project_id: &ProjectId, picks: &BTreeMap<Slot, ResourceId>) -> Result<(), AssignError> {
        let mut attempts = 0u32;
        let result = self
            .call("commit_assignment", || {
                attempts += 1;
                self.adapter.commit_assignment(project_id, picks)
            })
            .await;

        match result {
            // A retried commit may have landed on an earlier attempt.
            Err(AssignError::Conflict(reason)) if attempts > 1 => {
                let current = self.fetch_project(project_id).await?;
                let landed = current.connected
                    && picks.iter().all(|(slot, id)| current.assignments.get(slot) == Some(id));
                if landed {
                    debug!(project_id = %project_id, attempts, "Earlier commit attempt had landed");
                    Ok(())
                } else {
                    Err(AssignError::Conflict(reason))
                }
            }
            other => other,
        }
    }

    async fn fetch_project(&self, project_id: &ProjectId) -> Result<Project, AssignError> {
        self.call("load_project", || self.adapter.load_project(project_id))
            .await?
            .ok_or_else(|| AssignError::Validation(format!("project {project_id} not found")))
    }

    async fn load_pools(&self, slots: &[Slot]) -> Result<HashMap<Role, Vec<Resource>>, AssignError> {
        let roles: BTreeSet<Role> = slots.iter().map(|s| s.role()).collect();
        let mut pools = HashMap::with_capacity(roles.len());
        for role in roles {
            let resources = self.call("list_resources", || self.adapter.list_resources(role)).await?;
            pools.insert(role, resources);
        }
        Ok(pools)
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, AssignError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = staffline_storage::Result<T>>,
    {
        call_with_retry(&self.retry, self.timeout, operation, call).await
    }
}
