//! Fixtures shared by the engine tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use staffline_core::{Project, ProjectId, Resource, ResourceId, Role, Slot};
use staffline_storage::{MemoryStore, RecordAdapter, Result, StoreError};

pub(crate) fn pid(n: u32) -> ProjectId {
    ProjectId::from_number(n).unwrap()
}

pub(crate) fn rid(name: &str) -> ResourceId {
    ResourceId::new(name).unwrap()
}

pub(crate) fn ready_project(n: u32, topic: &str) -> Project {
    let mut p = Project::new(pid(n), topic);
    p.ready_to_assign = true;
    p
}

pub(crate) fn member(name: &str, role: Role, cap: u32, skills: &[&str]) -> Resource {
    Resource::new(rid(name), role, cap).with_skills(skills.iter().copied())
}

/// One writer, one designer and two controllers, all covering "Science".
pub(crate) async fn science_team(store: &MemoryStore, cap: u32) {
    store.put_resource(member("W1", Role::Writer, cap, &["Science"])).await;
    store.put_resource(member("D1", Role::Designer, cap, &["Science"])).await;
    store.put_resource(member("C1", Role::Controller, cap, &["ANY"]).with_kpi(8.0)).await;
    store.put_resource(member("C2", Role::Controller, cap, &["ANY"]).with_kpi(6.0)).await;
}

/// A store wrapper that injects failures.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    /// Commits that fail with `Unavailable` before touching the records
    pub commit_failures: AtomicU32,
    /// Commits that are applied but whose success is reported as `Unavailable`
    pub lost_acks: AtomicU32,
    /// Whether `list_projects` fails
    pub listing_down: AtomicBool,
    /// Delay added to every `load_project`, in milliseconds
    pub load_delay_ms: AtomicU64,
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl RecordAdapter for FlakyStore {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("sheet unreachable".into()));
        }
        self.inner.list_projects().await
    }

    async fn load_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.load_project(id).await
    }

    async fn list_resources(&self, role: Role) -> Result<Vec<Resource>> {
        self.inner.list_resources(role).await
    }

    async fn load_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        self.inner.load_resource(id).await
    }

    async fn commit_assignment(
        &self,
        project_id: &ProjectId,
        assignments: &BTreeMap<Slot, ResourceId>,
    ) -> Result<()> {
        if take_one(&self.commit_failures) {
            return Err(StoreError::Unavailable("write rejected".into()));
        }
        self.inner.commit_assignment(project_id, assignments).await?;
        if take_one(&self.lost_acks) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(())
    }

    async fn mark_connected(&self, project_id: &ProjectId) -> Result<()> {
        self.inner.mark_connected(project_id).await
    }
}
