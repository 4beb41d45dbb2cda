//! In-memory record store.
//!
//! Useful for tests, dry runs and as the reference for adapter semantics.

use std::collections::BTreeMap;

use async_trait::async_trait;
use staffline_core::{Assignment, Project, ProjectId, Resource, ResourceId, Role, Slot};
use tokio::sync::Mutex;
use tracing::debug;

use crate::records::RecordSet;
use crate::{RecordAdapter, Result};

/// Record store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<RecordSet>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an existing record set.
    pub fn from_records(records: RecordSet) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Insert or replace a project.
    pub async fn put_project(&self, project: Project) {
        self.records.lock().await.put_project(project);
    }

    /// Insert or replace a resource.
    pub async fn put_resource(&self, resource: Resource) {
        self.records.lock().await.put_resource(resource);
    }

    /// Close an active assignment, releasing the resource's workload slot.
    pub async fn close_assignment(&self, project_id: &ProjectId, slot: Slot) -> Result<Assignment> {
        self.records.lock().await.close(project_id, slot)
    }

    /// All assignment facts recorded so far.
    pub async fn assignments(&self) -> Vec<Assignment> {
        self.records.lock().await.assignments.clone()
    }

    /// A copy of the full record set.
    pub async fn snapshot(&self) -> RecordSet {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RecordAdapter for MemoryStore {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.records.lock().await.projects.values().cloned().collect())
    }

    async fn load_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        Ok(self.records.lock().await.projects.get(id).cloned())
    }

    async fn list_resources(&self, role: Role) -> Result<Vec<Resource>> {
        Ok(self.records.lock().await.resources_with_role(role))
    }

    async fn load_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        Ok(self.records.lock().await.resources.get(id).cloned())
    }

    async fn commit_assignment(
        &self,
        project_id: &ProjectId,
        assignments: &BTreeMap<Slot, ResourceId>,
    ) -> Result<()> {
        let facts = self.records.lock().await.commit(project_id, assignments)?;
        debug!(project_id = %project_id, facts = facts.len(), "Committed assignment");
        Ok(())
    }

    async fn mark_connected(&self, project_id: &ProjectId) -> Result<()> {
        self.records.lock().await.mark_connected(project_id)
    }
}
