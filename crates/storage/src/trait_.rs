//! Record adapter trait abstraction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use staffline_core::{Project, ProjectId, Resource, ResourceId, Role, Slot};

/// Error type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing store could not be reached; the call may succeed later
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write lost a race with another writer
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write was malformed and will never succeed
    #[error("invalid write: {0}")]
    Invalid(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Unavailable(_))
    }
}

/// Access to the external project and resource records.
///
/// The store owns all durable state. Implementations must make
/// [`commit_assignment`](RecordAdapter::commit_assignment) all-or-nothing.
#[async_trait]
pub trait RecordAdapter: Send + Sync {
    /// Fetch every project.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Fetch one project by ID.
    async fn load_project(&self, id: &ProjectId) -> Result<Option<Project>>;

    /// Fetch every resource with the given role.
    async fn list_resources(&self, role: Role) -> Result<Vec<Resource>>;

    /// Fetch one resource by ID.
    async fn load_resource(&self, id: &ResourceId) -> Result<Option<Resource>>;

    /// Fill the given slots, append the assignment facts, bump each
    /// resource's workload and set `connected`, as one update.
    ///
    /// Returns [`StoreError::Conflict`] when the project is already connected,
    /// a slot is already taken, or a resource has no capacity left.
    async fn commit_assignment(
        &self,
        project_id: &ProjectId,
        assignments: &BTreeMap<Slot, ResourceId>,
    ) -> Result<()>;

    /// Set `connected` on a project whose required slots are all filled.
    async fn mark_connected(&self, project_id: &ProjectId) -> Result<()>;
}
