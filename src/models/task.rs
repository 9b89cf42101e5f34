use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work within a feature, executed by an AI agent.
///
/// Tasks carry the finest-grained status lifecycle and are the only entities
/// that participate in the dependency graph. Completing a task may cascade
/// a status change up to its feature and project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Owning feature. `None` for unattached tasks; cascade skips them.
    pub feature_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// When true, moving this task to `completed` requires a verification
    /// block with all criteria passing and no unresolved blockers.
    pub requires_verification: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The lifecycle status of a task.
///
/// - `Pending`: Not yet started
/// - `InProgress`: Agent is actively working
/// - `Testing`: Implementation done, under test
/// - `Completed`: Finished and verified
/// - `Cancelled`: Abandoned; bypasses the completion gate
/// - `Deferred`: Parked, can resume later
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Testing,
    Completed,
    Cancelled,
    Deferred,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Testing => "testing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Deferred => "deferred",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "testing" => Some(Self::Testing),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Deferred => 1,
            Self::InProgress => 2,
            Self::Testing => 3,
            Self::Completed => 4,
            Self::Cancelled => 5,
        }
    }
}

/// Input for creating a new task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    /// Owning feature. `None` creates an unattached task.
    pub feature_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub requires_verification: bool,
}
