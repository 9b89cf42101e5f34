mod dependency;
mod feature;
mod project;
mod task;
mod verification;

pub use dependency::*;
pub use feature::*;
pub use project::*;
pub use task::*;
pub use verification::*;

/// The three work item kinds, ordered top-down by containment:
/// Project → Feature → Task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Feature,
    Task,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Feature => "feature",
            Self::Task => "task",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A work item loaded by id without knowing its kind up front.
#[derive(Debug, Clone)]
pub enum Entity {
    Project(Project),
    Feature(Feature),
    Task(Task),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Project(_) => EntityType::Project,
            Self::Feature(_) => EntityType::Feature,
            Self::Task(_) => EntityType::Task,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        match self {
            Self::Project(p) => p.id,
            Self::Feature(f) => f.id,
            Self::Task(t) => t.id,
        }
    }

    pub fn requires_verification(&self) -> bool {
        match self {
            Self::Project(p) => p.requires_verification,
            Self::Feature(f) => f.requires_verification,
            Self::Task(t) => t.requires_verification,
        }
    }

    pub fn status(&self) -> StatusValue {
        match self {
            Self::Project(p) => StatusValue::Project(p.status),
            Self::Feature(f) => StatusValue::Feature(f.status),
            Self::Task(t) => StatusValue::Task(t.status),
        }
    }
}

/// A status tagged with the entity kind it belongs to.
///
/// The transition table and completion gate operate on these so that a task
/// status is never compared against a feature's lifecycle by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusValue {
    Project(ProjectStatus),
    Feature(FeatureStatus),
    Task(TaskStatus),
}

impl StatusValue {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Project(_) => EntityType::Project,
            Self::Feature(_) => EntityType::Feature,
            Self::Task(_) => EntityType::Task,
        }
    }

    /// Parse a status string against a specific entity kind's lifecycle.
    pub fn parse(entity_type: EntityType, s: &str) -> Option<Self> {
        match entity_type {
            EntityType::Project => ProjectStatus::from_str(s).map(Self::Project),
            EntityType::Feature => FeatureStatus::from_str(s).map(Self::Feature),
            EntityType::Task => TaskStatus::from_str(s).map(Self::Task),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project(s) => s.as_str(),
            Self::Feature(s) => s.as_str(),
            Self::Task(s) => s.as_str(),
        }
    }

    /// No further forward progress is expected from a terminal status.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Project(s) => s.is_terminal(),
            Self::Feature(s) => s.is_terminal(),
            Self::Task(s) => s.is_terminal(),
        }
    }

    /// The terminal status meaning "finished successfully", as opposed to
    /// abandonment.
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Self::Project(ProjectStatus::Completed)
                | Self::Feature(FeatureStatus::Completed)
                | Self::Task(TaskStatus::Completed)
        )
    }

    /// Abandonment statuses (`cancelled` / `archived`) bypass the
    /// completion gate.
    pub fn is_abandonment(&self) -> bool {
        matches!(
            self,
            Self::Project(ProjectStatus::Archived)
                | Self::Feature(FeatureStatus::Archived)
                | Self::Task(TaskStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for StatusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
