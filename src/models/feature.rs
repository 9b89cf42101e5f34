use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A system capability under a project, containing the tasks that build it.
///
/// The containment reference is optional: a feature can exist unowned and be
/// attached to a project later. Status aggregation (cascade) only runs
/// across attached children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: FeatureStatus,
    /// When true, moving this feature to `completed` requires a verification
    /// block with all criteria passing.
    pub requires_verification: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The lifecycle status of a feature.
///
/// - `Planning`: Being specified
/// - `InDevelopment`: Tasks are in flight
/// - `Validating`: Built, under acceptance review
/// - `Completed`: Done and verified
/// - `Archived`: Abandoned or shelved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Planning,
    InDevelopment,
    Validating,
    Completed,
    Archived,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::InDevelopment => "in_development",
            Self::Validating => "validating",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(Self::Planning),
            "in_development" => Some(Self::InDevelopment),
            "validating" => Some(Self::Validating),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Archived)
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Planning => 0,
            Self::InDevelopment => 1,
            Self::Validating => 2,
            Self::Completed => 3,
            Self::Archived => 4,
        }
    }
}

/// Input for creating a new feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    /// Owning project. `None` creates an unattached feature.
    pub project_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub requires_verification: bool,
}
