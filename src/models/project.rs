use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The top-level organizational unit. A project contains features, which in
/// turn contain tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// When true, moving this project to `completed` requires a verification
    /// block with all criteria passing.
    pub requires_verification: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The lifecycle status of a project.
///
/// - `Planning`: Scoping, not yet in active development
/// - `InDevelopment`: Features are being built
/// - `Completed`: All work finished
/// - `Archived`: Abandoned or shelved, kept for reference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InDevelopment,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::InDevelopment => "in_development",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(Self::Planning),
            "in_development" => Some(Self::InDevelopment),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Archived)
    }

    /// Position along the forward lifecycle, used by the permissive
    /// transition mode.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Planning => 0,
            Self::InDevelopment => 1,
            Self::Completed => 2,
            Self::Archived => 3,
        }
    }
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub requires_verification: bool,
}
