//! Project model - a work item waiting for specialists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{ProjectId, ResourceId};
use crate::resource::Role;

/// Project priority tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// No priority given
    #[default]
    None,
    /// Low priority
    Low,
    /// Medium priority
    Medium,
    /// High priority (rush)
    High,
}

impl Priority {
    /// Parse a free-text priority. Unknown text maps to [`Priority::None`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::None,
        }
    }

    /// Whether this is the high-priority tier.
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.pad(s)
    }
}

/// An assignment position on a project.
///
/// Review slots are filled by controllers; each slot holds at most one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Writes the content
    Writer,
    /// Designs the media
    Designer,
    /// Quality-controls the writing
    WriterReview,
    /// Quality-controls the design
    DesignReview,
}

impl Slot {
    /// The resource role able to fill this slot.
    pub fn role(self) -> Role {
        match self {
            Self::Writer => Role::Writer,
            Self::Designer => Role::Designer,
            Self::WriterReview | Self::DesignReview => Role::Controller,
        }
    }

    /// Parse a slot name such as `writer` or `design_review`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "writer" => Some(Self::Writer),
            "designer" => Some(Self::Designer),
            "writer_review" | "writer_controller" => Some(Self::WriterReview),
            "design_review" | "design_controller" => Some(Self::DesignReview),
            _ => None,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Writer => "writer",
            Self::Designer => "designer",
            Self::WriterReview => "writer_review",
            Self::DesignReview => "design_review",
        };
        f.pad(s)
    }
}

/// A project as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    /// Project name
    #[serde(default)]
    pub name: String,

    /// Topic / category the writing falls under
    #[serde(default)]
    pub topic: String,

    /// Priority tier
    #[serde(default)]
    pub priority: Priority,

    /// Whether a writer (and writing review) is required
    #[serde(default = "default_true")]
    pub needs_writer: bool,

    /// Whether a designer (and design review) is required
    #[serde(default = "default_true")]
    pub needs_designer: bool,

    /// Set by staff once the project may be staffed
    #[serde(default)]
    pub ready_to_assign: bool,

    /// Set once every required slot is filled
    #[serde(default)]
    pub connected: bool,

    /// Staff handle this project by hand; automatic cycles leave it alone
    #[serde(default)]
    pub manual_override: bool,

    /// Current assignments per slot
    #[serde(default)]
    pub assignments: BTreeMap<Slot, ResourceId>,
}

fn default_true() -> bool {
    true
}

impl Project {
    /// Create a project that needs both a writer and a designer.
    pub fn new(id: ProjectId, topic: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            topic: topic.into(),
            priority: Priority::None,
            needs_writer: true,
            needs_designer: true,
            ready_to_assign: false,
            connected: false,
            manual_override: false,
            assignments: BTreeMap::new(),
        }
    }

    /// Slots that must be filled before the project can be connected.
    pub fn required_slots(&self) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(4);
        if self.needs_writer {
            slots.push(Slot::Writer);
        }
        if self.needs_designer {
            slots.push(Slot::Designer);
        }
        if self.needs_writer {
            slots.push(Slot::WriterReview);
        }
        if self.needs_designer {
            slots.push(Slot::DesignReview);
        }
        slots
    }

    /// Required slots that have no resource yet.
    pub fn open_slots(&self) -> Vec<Slot> {
        self.required_slots()
            .into_iter()
            .filter(|slot| !self.assignments.contains_key(slot))
            .collect()
    }

    /// Whether every required slot has a resource.
    pub fn is_fully_staffed(&self) -> bool {
        self.open_slots().is_empty()
    }
}
