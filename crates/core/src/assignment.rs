//! Assignment facts - append-only records of who fills which slot.

use serde::{Deserialize, Serialize};

use crate::id::{ProjectId, ResourceId};
use crate::project::Slot;
use crate::Time;

/// A resource placed into a project slot. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Project the slot belongs to
    pub project_id: ProjectId,

    /// Slot that was filled
    pub slot: Slot,

    /// Resource placed in the slot
    pub resource_id: ResourceId,

    /// When the assignment was committed
    pub assigned_at: Time,
}

impl Assignment {
    /// Record an assignment made now.
    pub fn new(project_id: ProjectId, slot: Slot, resource_id: ResourceId) -> Self {
        Self {
            project_id,
            slot,
            resource_id,
            assigned_at: chrono::Utc::now(),
        }
    }

    /// Key that must be unique across all assignment facts.
    pub fn key(&self) -> (&ProjectId, Slot) {
        (&self.project_id, self.slot)
    }
}
