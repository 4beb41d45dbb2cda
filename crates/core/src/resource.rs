//! Resource model - team members who fill project slots.

use serde::{Deserialize, Serialize};

use crate::id::ResourceId;

/// Skill that matches any topic, at a lower grade than a specialist.
pub const SKILL_ANY: &str = "ANY";

/// Skill marking a resource that must never receive automatic work.
pub const SKILL_DO_NOT_ASSIGN: &str = "DO NOT ASSIGN";

/// The role a resource plays. Each resource record has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Content writer
    Writer,
    /// Media designer
    Designer,
    /// Quality controller
    Controller,
}

impl Role {
    /// Parse a role name.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "writer" => Some(Self::Writer),
            "designer" => Some(Self::Designer),
            "controller" | "qc" => Some(Self::Controller),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Writer => "writer",
            Self::Designer => "designer",
            Self::Controller => "controller",
        };
        f.pad(s)
    }
}

/// How well a resource's skills cover a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillMatch {
    /// The resource names the topic (or the project has no topic)
    Exact,
    /// The resource accepts any topic
    Wildcard,
    /// No overlap, or the resource is marked do-not-assign
    None,
}

impl SkillMatch {
    /// Graded overlap used by ranking.
    pub fn grade(self) -> f64 {
        match self {
            Self::Exact => 1.0,
            Self::Wildcard => 0.5,
            Self::None => 0.0,
        }
    }
}

/// A team member as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique identifier
    pub id: ResourceId,

    /// Role this resource fills
    pub role: Role,

    /// Declared skills / topics
    #[serde(default)]
    pub skills: Vec<String>,

    /// Performance score, higher is better
    #[serde(default)]
    pub kpi: f64,

    /// Active, unresolved assignments
    #[serde(default)]
    pub workload: u32,

    /// Maximum number of active assignments
    pub max_workload: u32,

    /// Whether the resource takes new work at all
    #[serde(default = "default_available")]
    pub available: bool,

    /// Primary design tool, used for platform tiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

fn default_available() -> bool {
    true
}

impl Resource {
    /// Create an available resource with no workload.
    pub fn new(id: ResourceId, role: Role, max_workload: u32) -> Self {
        Self {
            id,
            role,
            skills: Vec::new(),
            kpi: 0.0,
            workload: 0,
            max_workload,
            available: true,
            platform: None,
        }
    }

    /// Builder: set skills.
    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set KPI.
    pub fn with_kpi(mut self, kpi: f64) -> Self {
        self.kpi = kpi;
        self
    }

    /// Builder: set current workload.
    pub fn with_workload(mut self, workload: u32) -> Self {
        self.workload = workload;
        self
    }

    /// Builder: set platform.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Whether the resource is flagged do-not-assign.
    pub fn is_blocked(&self) -> bool {
        self.skills
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(SKILL_DO_NOT_ASSIGN))
    }

    /// Match this resource's skills against a topic.
    pub fn skill_match(&self, topic: &str) -> SkillMatch {
        if self.is_blocked() {
            return SkillMatch::None;
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return SkillMatch::Exact;
        }
        if self.skills.iter().any(|s| s.trim().eq_ignore_ascii_case(topic)) {
            return SkillMatch::Exact;
        }
        if self.skills.iter().any(|s| s.trim().eq_ignore_ascii_case(SKILL_ANY)) {
            return SkillMatch::Wildcard;
        }
        SkillMatch::None
    }

    /// Whether one more assignment stays within `limit`.
    pub fn has_room(&self, limit: u32) -> bool {
        self.workload < limit
    }
}
