//! The record set shared by the bundled stores.
//!
//! Both [`MemoryStore`](crate::MemoryStore) and [`JsonStore`](crate::JsonStore)
//! keep their data in a [`RecordSet`] and apply writes through it, so the
//! commit rules live in one place.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use staffline_core::{Assignment, Project, ProjectId, Resource, ResourceId, Role, Slot};

use crate::{Result, StoreError};

/// Projects, resources and assignment facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    /// Projects keyed by ID
    #[serde(default)]
    pub projects: BTreeMap<ProjectId, Project>,

    /// Resources keyed by ID
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, Resource>,

    /// Append-only assignment facts
    #[serde(default)]
    pub assignments: Vec<Assignment>,

    /// Assignment keys closed by staff
    #[serde(default)]
    pub closed: BTreeSet<(ProjectId, Slot)>,
}

impl RecordSet {
    /// Insert or replace a project.
    pub fn put_project(&mut self, project: Project) {
        self.projects.insert(project.id.clone(), project);
    }

    /// Insert or replace a resource.
    pub fn put_resource(&mut self, resource: Resource) {
        self.resources.insert(resource.id.clone(), resource);
    }

    /// Resources with the given role, in ID order.
    pub fn resources_with_role(&self, role: Role) -> Vec<Resource> {
        self.resources
            .values()
            .filter(|r| r.role == role)
            .cloned()
            .collect()
    }

    /// Apply an all-or-nothing commit. Nothing is changed on error.
    pub fn commit(
        &mut self,
        project_id: &ProjectId,
        assignments: &BTreeMap<Slot, ResourceId>,
    ) -> Result<Vec<Assignment>> {
        let project = self
            .projects
            .get(project_id)
            .ok_or_else(|| StoreError::NotFound(format!("project {project_id}")))?;

        if project.connected {
            return Err(StoreError::Conflict(format!("project {project_id} is already connected")));
        }
        if assignments.is_empty() {
            return Err(StoreError::Invalid("empty commit".to_string()));
        }

        let required = project.required_slots();
        let mut seen = HashSet::new();
        for (slot, resource_id) in assignments {
            if !required.contains(slot) {
                return Err(StoreError::Invalid(format!(
                    "slot {slot} is not required by project {project_id}"
                )));
            }
            if let Some(existing) = project.assignments.get(slot) {
                return Err(StoreError::Conflict(format!(
                    "slot {slot} of project {project_id} is already held by {existing}"
                )));
            }
            if !seen.insert(resource_id) {
                return Err(StoreError::Invalid(format!(
                    "resource {resource_id} given more than one slot"
                )));
            }
            let resource = self
                .resources
                .get(resource_id)
                .ok_or_else(|| StoreError::NotFound(format!("resource {resource_id}")))?;
            if resource.role != slot.role() {
                return Err(StoreError::Invalid(format!(
                    "resource {resource_id} is a {}, slot {slot} needs a {}",
                    resource.role,
                    slot.role()
                )));
            }
            if !resource.has_room(resource.max_workload) {
                return Err(StoreError::Conflict(format!(
                    "resource {resource_id} is at capacity ({}/{})",
                    resource.workload, resource.max_workload
                )));
            }
        }

        let still_open = required
            .iter()
            .filter(|slot| !project.assignments.contains_key(slot) && !assignments.contains_key(slot))
            .count();
        if still_open > 0 {
            return Err(StoreError::Invalid(format!(
                "commit leaves {still_open} required slot(s) of project {project_id} open"
            )));
        }

        // Validated; apply.
        let mut facts = Vec::with_capacity(assignments.len());
        for (slot, resource_id) in assignments {
            if let Some(resource) = self.resources.get_mut(resource_id) {
                resource.workload += 1;
            }
            facts.push(Assignment::new(project_id.clone(), *slot, resource_id.clone()));
        }
        if let Some(project) = self.projects.get_mut(project_id) {
            project.assignments.extend(assignments.iter().map(|(s, r)| (*s, r.clone())));
            project.connected = true;
        }
        self.assignments.extend(facts.iter().cloned());
        Ok(facts)
    }

    /// Flip `connected` on a fully staffed project. Idempotent.
    pub fn mark_connected(&mut self, project_id: &ProjectId) -> Result<()> {
        let project = self
            .projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::NotFound(format!("project {project_id}")))?;
        if !project.is_fully_staffed() {
            return Err(StoreError::Invalid(format!(
                "project {project_id} still has open slots"
            )));
        }
        project.connected = true;
        Ok(())
    }

    /// Close an active assignment and release the resource's workload slot.
    pub fn close(&mut self, project_id: &ProjectId, slot: Slot) -> Result<Assignment> {
        let key = (project_id.clone(), slot);
        if self.closed.contains(&key) {
            return Err(StoreError::Conflict(format!(
                "assignment {slot} of project {project_id} is already closed"
            )));
        }
        let fact = self
            .assignments
            .iter()
            .find(|a| a.key() == (project_id, slot))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("assignment {slot} of project {project_id}")))?;

        if let Some(resource) = self.resources.get_mut(&fact.resource_id) {
            resource.workload = resource.workload.saturating_sub(1);
        }
        self.closed.insert(key);
        Ok(fact)
    }

    /// Number of open assignment facts naming the resource.
    pub fn active_count(&self, resource_id: &ResourceId) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.resource_id == *resource_id)
            .filter(|a| !self.closed.contains(&(a.project_id.clone(), a.slot)))
            .count()
    }
}
