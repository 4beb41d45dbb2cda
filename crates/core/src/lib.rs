//! Staffline core data models.
//!
//! This crate defines the records the assignment engine reads and writes:
//! projects, the resources that staff them, and the assignment facts that
//! link the two.

#![warn(missing_docs)]

// Core identities
mod id;

// Records
mod project;
mod resource;
mod assignment;

// Re-exports
pub use id::*;

pub use project::{Project, Priority, Slot};
pub use resource::{Resource, Role, SkillMatch, SKILL_ANY, SKILL_DO_NOT_ASSIGN};
pub use assignment::Assignment;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
