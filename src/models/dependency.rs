use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed edge between two tasks.
///
/// `(A, B, Blocks)` and `(B, A, IsBlockedBy)` describe the same constraint:
/// A must reach a terminal status before B may complete. `RelatesTo` is
/// informational and never gates anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Uuid,
    pub from_task_id: Uuid,
    pub to_task_id: Uuid,
    pub dep_type: DependencyType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Blocks,
    IsBlockedBy,
    RelatesTo,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::IsBlockedBy => "is_blocked_by",
            Self::RelatesTo => "relates_to",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "blocks" => Some(Self::Blocks),
            "is_blocked_by" => Some(Self::IsBlockedBy),
            "relates_to" => Some(Self::RelatesTo),
            _ => None,
        }
    }
}

/// Input for creating a dependency edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDependencyInput {
    pub from_task_id: Uuid,
    pub to_task_id: Uuid,
    pub dep_type: DependencyType,
}
