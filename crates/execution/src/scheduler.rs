//! Cycle scheduling.
//!
//! The [`Scheduler`] runs assignment cycles on demand and, once spawned,
//! at a fixed interval. At most one cycle runs at a time; a request that
//! arrives while a cycle is running is rejected with
//! [`SchedulerError::CycleBusy`] rather than queued.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use staffline_core::{CycleId, ProjectId, Slot, Time};
use staffline_storage::RecordAdapter;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::coordinator::{AssignMode, AssignmentCoordinator};
use crate::eligibility::is_eligible;
use crate::error::{AssignError, ConfigError, SchedulerError};
use crate::notify::{LogEmitter, NotificationEmitter};
use crate::ranking::Candidate;
use crate::report::{CycleResult, ProjectReport};

/// Cumulative counters across every cycle this scheduler ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Cycles started, including aborted ones
    pub total_runs: u64,
    /// Projects assigned
    pub assignments_made: u64,
    /// Projects failed on I/O
    pub failures: u64,
    /// Cycles aborted at snapshot time
    pub aborted_runs: u64,
    /// When the last cycle finished
    pub last_run: Option<Time>,
}

/// Drives assignment cycles.
pub struct Scheduler<A: RecordAdapter + 'static> {
    adapter: Arc<A>,
    coordinator: Arc<AssignmentCoordinator<A>>,
    emitter: Arc<dyn NotificationEmitter>,
    config: EngineConfig,
    cycle_lock: AsyncMutex<()>,
    shutdown: CancellationToken,
    current: Mutex<Option<CancellationToken>>,
    last_result: RwLock<Option<CycleResult>>,
    stats: Mutex<SchedulerStats>,
}

impl<A: RecordAdapter + 'static> Scheduler<A> {
    /// Create a scheduler over `adapter`. Fails if `config` is out of range.
    pub fn new(adapter: Arc<A>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            coordinator: Arc::new(AssignmentCoordinator::new(adapter.clone(), &config)),
            adapter,
            emitter: Arc::new(LogEmitter),
            config,
            cycle_lock: AsyncMutex::new(()),
            shutdown: CancellationToken::new(),
            current: Mutex::new(None),
            last_result: RwLock::new(None),
            stats: Mutex::new(SchedulerStats::default()),
        })
    }

    /// Set the notification emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn NotificationEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared coordinator.
    pub fn coordinator(&self) -> &AssignmentCoordinator<A> {
        &self.coordinator
    }

    /// Run one cycle now.
    ///
    /// Returns [`SchedulerError::CycleBusy`] if a cycle is already running
    /// and [`SchedulerError::Snapshot`] if the project list could not be
    /// fetched. Per-project problems never fail the cycle; they are counted
    /// in the returned [`CycleResult`].
    pub async fn run_cycle(&self) -> Result<CycleResult, SchedulerError> {
        let Ok(_cycle) = self.cycle_lock.try_lock() else {
            return Err(SchedulerError::CycleBusy);
        };

        let token = self.shutdown.child_token();
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        let outcome = self.execute(&token).await;
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;

        let (result, aborted) = match outcome {
            Ok(result) => (result, None),
            Err((result, reason)) => (result, Some(reason)),
        };
        self.complete(&result).await;

        match aborted {
            Some(reason) => Err(SchedulerError::Snapshot(reason)),
            None => Ok(result),
        }
    }

    async fn execute(&self, token: &CancellationToken) -> Result<CycleResult, (CycleResult, String)> {
        let mut result = CycleResult::begin(CycleId::new());
        info!(cycle_id = %result.cycle_id, "Starting assignment cycle");

        let timeout = self.config.adapter_timeout();
        let projects = match tokio::time::timeout(timeout, self.adapter.list_projects()).await {
            Ok(Ok(projects)) => projects,
            Ok(Err(e)) => {
                let reason = e.to_string();
                result.abort(reason.clone());
                return Err((result, reason));
            }
            Err(_) => {
                let reason = format!("list_projects timed out after {timeout:?}");
                result.abort(reason.clone());
                return Err((result, reason));
            }
        };

        let mut eligible: Vec<ProjectId> = projects
            .iter()
            .filter(|p| is_eligible(p))
            .map(|p| p.id.clone())
            .collect();
        eligible.sort();
        debug!(cycle_id = %result.cycle_id, total = projects.len(), eligible = eligible.len(), "Fetched snapshot");

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks = JoinSet::new();
        for project_id in eligible {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    result.cancelled = true;
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let coordinator = Arc::clone(&self.coordinator);
            tasks.spawn(async move {
                let _permit = permit;
                coordinator.assign(&project_id, AssignMode::Automatic).await
            });
        }

        if result.cancelled {
            info!(cycle_id = %result.cycle_id, in_flight = tasks.len(), "Cycle cancelled; finishing in-flight projects");
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => result.record(report),
                Err(e) => record_lost_task(&mut result, e),
            }
        }

        result.finish();
        info!(
            cycle_id = %result.cycle_id,
            attempted = result.attempted,
            succeeded = result.succeeded,
            skipped = result.skipped,
            failed = result.failed,
            cancelled = result.cancelled,
            "Cycle finished"
        );
        Ok(result)
    }

    async fn complete(&self, result: &CycleResult) {
        {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            stats.total_runs += 1;
            stats.assignments_made += result.succeeded as u64;
            stats.failures += result.failed as u64;
            if result.aborted.is_some() {
                stats.aborted_runs += 1;
            }
            stats.last_run = Some(result.finished_at);
        }
        *self.last_result.write().unwrap_or_else(|e| e.into_inner()) = Some(result.clone());

        if let Some(reason) = &result.aborted {
            error!(cycle_id = %result.cycle_id, reason = %reason, "Cycle aborted");
            return;
        }
        if result.attempted > 0 {
            if let Err(e) = self.emitter.emit(result).await {
                warn!(cycle_id = %result.cycle_id, error = %e, "Failed to deliver cycle notification");
            }
        }
    }

    /// Staff one project on operator request, outside any cycle.
    ///
    /// Shares the coordinator and its locks with running cycles.
    pub async fn assign_project(&self, project_id: &ProjectId) -> ProjectReport {
        self.coordinator.assign(project_id, AssignMode::Manual).await
    }

    /// Top candidates per required slot of one project.
    pub async fn recommend(
        &self,
        project_id: &ProjectId,
        top_n: usize,
    ) -> Result<BTreeMap<Slot, Vec<Candidate>>, AssignError> {
        self.coordinator.recommend(project_id, top_n).await
    }

    /// Result of the most recent cycle.
    pub fn last_result(&self) -> Option<CycleResult> {
        self.last_result.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Ask the running cycle to stop starting new projects.
    ///
    /// Returns false if no cycle is running.
    pub fn cancel_cycle(&self) -> bool {
        match self.current.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop the periodic loop and the running cycle. Cycles requested
    /// afterwards start no projects.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Run a cycle every `interval_secs` until shut down.
    ///
    /// The first cycle starts immediately. Ticks missed while a cycle runs
    /// are delayed, not replayed in a burst.
    pub fn spawn(self: &Arc<Self>) -> SchedulerHandle {
        let scheduler = Arc::clone(self);
        let token = self.shutdown.clone();
        let period = self.config.interval();

        let task = tokio::spawn({
            let token = token.clone();
            async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info!(interval_secs = period.as_secs(), "Scheduler started");

                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    match scheduler.run_cycle().await {
                        Ok(_) => {}
                        Err(SchedulerError::CycleBusy) => {
                            info!("Cycle already running; skipping tick")
                        }
                        Err(e) => error!(error = %e, "Scheduled cycle failed"),
                    }
                }
                info!("Scheduler stopped");
            }
        });

        SchedulerHandle { token, task }
    }
}

fn record_lost_task(result: &mut CycleResult, error: JoinError) {
    error!(cycle_id = %result.cycle_id, error = %error, "Assignment task did not complete");
    result.attempted += 1;
    result.failed += 1;
    result.errors.push(format!("assignment task did not complete: {error}"));
}

/// Handle to a spawned periodic scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request a stop; the running project transactions finish first.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.token.cancel();
        self.task.await
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Outcome;
    use crate::notify::NotifyError;
    use crate::test_support::*;
    use async_trait::async_trait;
    use staffline_core::Role;
    use staffline_storage::MemoryStore;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CycleResult>>,
    }

    #[async_trait]
    impl NotificationEmitter for Recorder {
        async fn emit(&self, result: &CycleResult) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl NotificationEmitter for Broken {
        async fn emit(&self, _result: &CycleResult) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected {
                status: 500,
                body: "chat service down".into(),
            })
        }
    }

    async fn science_store(projects: u32) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        science_team(&store, 10).await;
        for n in 1..=projects {
            store.put_project(ready_project(n, "Science")).await;
        }
        store
    }

    #[tokio::test]
    async fn test_second_cycle_assigns_nothing() {
        let store = science_store(2).await;
        let recorder = Arc::new(Recorder::default());
        let scheduler = Scheduler::new(store.clone(), EngineConfig::default())
            .unwrap()
            .with_emitter(recorder.clone());

        let first = scheduler.run_cycle().await.unwrap();
        assert_eq!((first.attempted, first.succeeded), (2, 2));
        let facts = store.assignments().await.len();

        let second = scheduler.run_cycle().await.unwrap();
        assert_eq!(second.attempted, 0);
        assert_eq!(store.assignments().await.len(), facts);

        // Only the cycle that attempted something is announced.
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
        let stats = scheduler.stats();
        assert_eq!((stats.total_runs, stats.assignments_made), (2, 2));
        assert_eq!(scheduler.last_result().unwrap().cycle_id, second.cycle_id);
    }

    #[tokio::test]
    async fn test_emitter_failure_does_not_fail_cycle() {
        let store = science_store(1).await;
        let scheduler = Scheduler::new(store.clone(), EngineConfig::default())
            .unwrap()
            .with_emitter(Arc::new(Broken));

        let result = scheduler.run_cycle().await.unwrap();
        assert_eq!((result.attempted, result.succeeded), (1, 1));
        assert!(store.load_project(&pid(1)).await.unwrap().unwrap().connected);
        assert_eq!(scheduler.last_result().unwrap().cycle_id, result.cycle_id);
        assert_eq!(scheduler.stats().assignments_made, 1);
    }

    #[tokio::test]
    async fn test_concurrent_request_is_rejected() {
        let scheduler = Scheduler::new(science_store(1).await, EngineConfig::default()).unwrap();
        let _running = scheduler.cycle_lock.try_lock().unwrap();
        assert_eq!(scheduler.run_cycle().await.unwrap_err(), SchedulerError::CycleBusy);
    }

    #[tokio::test]
    async fn test_snapshot_failure_aborts_cycle() {
        let store = Arc::new(FlakyStore::default());
        science_team(&store.inner, 3).await;
        store.inner.put_project(ready_project(1, "Science")).await;
        store.listing_down.store(true, Ordering::SeqCst);
        let scheduler = Scheduler::new(store.clone(), EngineConfig::default()).unwrap();

        let err = scheduler.run_cycle().await.unwrap_err();
        assert!(matches!(err, SchedulerError::Snapshot(ref m) if m.contains("sheet unreachable")));

        let last = scheduler.last_result().unwrap();
        assert!(last.aborted.is_some());
        assert_eq!(last.attempted, 0);
        assert_eq!(scheduler.stats().aborted_runs, 1);
        assert!(store.inner.assignments().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_lets_in_flight_project_finish() {
        let store = Arc::new(FlakyStore::default());
        science_team(&store.inner, 10).await;
        for n in 1..=3 {
            store.inner.put_project(ready_project(n, "Science")).await;
        }
        store.load_delay_ms.store(100, Ordering::SeqCst);
        let config = EngineConfig::default().with_max_concurrent(1);
        let scheduler = Arc::new(Scheduler::new(store.clone(), config).unwrap());

        let running = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run_cycle().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.cancel_cycle());

        let result = running.await.unwrap().unwrap();
        assert!(result.cancelled);
        assert_eq!((result.attempted, result.succeeded), (1, 1));
        assert!(store.inner.load_project(&pid(1)).await.unwrap().unwrap().connected);
        assert!(!store.inner.load_project(&pid(3)).await.unwrap().unwrap().connected);
        assert!(!scheduler.cancel_cycle());
    }

    #[tokio::test]
    async fn test_capacity_holds_and_no_partial_fills() {
        let store = Arc::new(MemoryStore::new());
        store.put_resource(member("W1", Role::Writer, 2, &["Science"])).await;
        store.put_resource(member("W2", Role::Writer, 1, &["ANY"])).await;
        store.put_resource(member("D1", Role::Designer, 5, &["Science"])).await;
        store.put_resource(member("C1", Role::Controller, 4, &["ANY"])).await;
        store.put_resource(member("C2", Role::Controller, 4, &["ANY"])).await;
        for n in 1..=5 {
            store.put_project(ready_project(n, "Science")).await;
        }
        let scheduler = Scheduler::new(store.clone(), EngineConfig::default()).unwrap();

        let result = scheduler.run_cycle().await.unwrap();
        assert_eq!((result.attempted, result.succeeded, result.skipped), (5, 3, 2));
        assert!(result
            .reports
            .iter()
            .filter(|r| r.outcome == Outcome::Skipped)
            .all(|r| r.reason.as_deref() == Some("no eligible candidate for role writer")));

        let records = store.snapshot().await;
        for resource in records.resources.values() {
            assert!(resource.workload <= resource.max_workload, "{} over capacity", resource.id);
            assert_eq!(resource.workload as usize, records.active_count(&resource.id));
        }
        for project in records.projects.values() {
            if project.connected {
                assert!(project.is_fully_staffed());
            } else {
                assert!(project.assignments.is_empty(), "{} partially filled", project.id);
            }
        }
    }

    #[tokio::test]
    async fn test_manual_assignment_ignores_ready_flag() {
        let store = science_store(0).await;
        let mut waiting = ready_project(9, "Science");
        waiting.ready_to_assign = false;
        store.put_project(waiting).await;
        let scheduler = Scheduler::new(store.clone(), EngineConfig::default()).unwrap();

        assert_eq!(scheduler.run_cycle().await.unwrap().attempted, 0);
        let report = scheduler.assign_project(&pid(9)).await;
        assert_eq!(report.outcome, Outcome::Assigned);
        assert_eq!(report.roles.len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = EngineConfig::default().with_max_concurrent(0);
        assert!(Scheduler::new(Arc::new(MemoryStore::new()), config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_scheduler_runs_until_stopped() {
        let store = science_store(1).await;
        let scheduler = Arc::new(Scheduler::new(store.clone(), EngineConfig::default()).unwrap());

        let handle = scheduler.spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.stats().total_runs, 1);
        assert!(store.load_project(&pid(1)).await.unwrap().unwrap().connected);

        store.put_project(ready_project(2, "Science")).await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(scheduler.stats().total_runs, 2);
        assert_eq!(scheduler.stats().assignments_made, 2);

        assert!(!handle.is_finished());
        handle.stop();
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await.unwrap();
        assert_eq!(scheduler.stats().total_runs, 2);
        assert_eq!(scheduler.run_cycle().await.unwrap().attempted, 0);
    }
}
