//! JSON file record store.
//!
//! Keeps the whole record set in one JSON document. Every read loads the
//! file again so edits made by other tools between cycles are picked up;
//! every write goes to a temporary file that is renamed over the original.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use staffline_core::{Assignment, Project, ProjectId, Resource, ResourceId, Role, Slot};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::records::RecordSet;
use crate::{RecordAdapter, Result, StoreError};

/// File-based JSON record store.
pub struct JsonStore {
    path: PathBuf,
    // Serializes read-modify-write cycles from this process.
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open an existing record file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if fs::metadata(&path).await.is_err() {
            return Err(StoreError::NotFound(format!("record file {}", path.display())));
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Create a record file holding `records`, replacing any existing file.
    pub async fn create(path: impl AsRef<Path>, records: &RecordSet) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        write_records(&path, records).await?;
        info!("Created record file at {}", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current record set from disk.
    pub async fn load(&self) -> Result<RecordSet> {
        read_records(&self.path).await
    }

    /// Close an active assignment, releasing the resource's workload slot.
    pub async fn close_assignment(&self, project_id: &ProjectId, slot: Slot) -> Result<Assignment> {
        self.update(|records| records.close(project_id, slot)).await
    }

    /// Insert or replace a project.
    pub async fn put_project(&self, project: Project) -> Result<()> {
        self.update(|records| {
            records.put_project(project);
            Ok(())
        })
        .await
    }

    /// Insert or replace a resource.
    pub async fn put_resource(&self, resource: Resource) -> Result<()> {
        self.update(|records| {
            records.put_resource(resource);
            Ok(())
        })
        .await
    }

    async fn update<T>(&self, apply: impl FnOnce(&mut RecordSet) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut records = read_records(&self.path).await?;
        let out = apply(&mut records)?;
        write_records(&self.path, &records).await?;
        Ok(out)
    }
}

#[async_trait]
impl RecordAdapter for JsonStore {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.load().await?.projects.into_values().collect())
    }

    async fn load_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        Ok(self.load().await?.projects.remove(id))
    }

    async fn list_resources(&self, role: Role) -> Result<Vec<Resource>> {
        Ok(self.load().await?.resources_with_role(role))
    }

    async fn load_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        Ok(self.load().await?.resources.remove(id))
    }

    async fn commit_assignment(
        &self,
        project_id: &ProjectId,
        assignments: &BTreeMap<Slot, ResourceId>,
    ) -> Result<()> {
        let facts = self
            .update(|records| records.commit(project_id, assignments))
            .await?;
        debug!(project_id = %project_id, facts = facts.len(), path = %self.path.display(), "Committed assignment");
        Ok(())
    }

    async fn mark_connected(&self, project_id: &ProjectId) -> Result<()> {
        self.update(|records| records.mark_connected(project_id)).await
    }
}

async fn read_records(path: &Path) -> Result<RecordSet> {
    match fs::read_to_string(path).await {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StoreError::NotFound(format!("record file {}", path.display())))
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_records(path: &Path, records: &RecordSet) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
