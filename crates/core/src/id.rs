//! Identifiers for Staffline entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Largest numeric project identifier accepted by the record store.
pub const MAX_PROJECT_NUMBER: u32 = 999_999;

/// Errors raised while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The project identifier is not a decimal number.
    #[error("invalid project ID: {0:?}")]
    InvalidProjectId(String),

    /// The project number does not fit the six-digit format.
    #[error("project ID must be between 0 and {MAX_PROJECT_NUMBER}, got {0}")]
    ProjectIdOutOfRange(u64),

    /// Resource names must not be blank.
    #[error("resource ID must not be empty")]
    EmptyResourceId,
}

/// Identifier of a project, kept in canonical `#NNNNNN` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Build an identifier from its numeric value.
    pub fn from_number(number: u32) -> Result<Self, IdError> {
        if number > MAX_PROJECT_NUMBER {
            return Err(IdError::ProjectIdOutOfRange(number as u64));
        }
        Ok(Self(format!("#{number:06}")))
    }

    /// Parse a loosely formatted identifier such as `42`, `#42` or `'#000042`.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let s = raw.trim();
        let s = s.strip_prefix('\'').unwrap_or(s);
        let digits = s.strip_prefix('#').unwrap_or(s).trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::InvalidProjectId(raw.to_string()));
        }
        // Only overflow can fail here.
        let number: u64 = digits.parse().unwrap_or(u64::MAX);
        if number > MAX_PROJECT_NUMBER as u64 {
            return Err(IdError::ProjectIdOutOfRange(number));
        }
        Ok(Self(format!("#{number:06}")))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// Identifier of a resource (the team member's display name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create from a name. Surrounding whitespace is dropped.
    pub fn new(name: impl AsRef<str>) -> Result<Self, IdError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(IdError::EmptyResourceId);
        }
        Ok(Self(name.to_string()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl std::str::FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

/// Unique identifier for one assignment cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(Ulid);

impl CycleId {
    /// Generate a new CycleId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
