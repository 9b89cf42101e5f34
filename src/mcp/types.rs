//! Request and response types for MCP tools.

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::status::CascadeEntry;

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TransitionStatusRequest {
    #[schemars(description = "The UUID of the project, feature, or task to transition")]
    pub entity_id: String,
    #[schemars(
        description = "The requested status. Tasks: pending, in_progress, testing, completed, cancelled, deferred. Features: planning, in_development, validating, completed, archived. Projects: planning, in_development, completed, archived."
    )]
    pub status: String,
    #[schemars(
        description = "Optional lock session id. Reuse one id across related calls so the engine recognizes re-acquisition; omit to get a fresh session per call."
    )]
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetStatusRequest {
    #[schemars(description = "The UUID of the project, feature, or task")]
    pub entity_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateProjectRequest {
    #[schemars(description = "Project name")]
    pub name: String,
    #[schemars(description = "What this project is about")]
    #[serde(default)]
    pub description: Option<String>,
    #[schemars(
        description = "Whether completing this project requires a passing verification block. Defaults to false."
    )]
    #[serde(default)]
    pub requires_verification: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFeatureRequest {
    #[schemars(description = "The UUID of the owning project, if any")]
    #[serde(default)]
    pub project_id: Option<String>,
    #[schemars(description = "Short capability name")]
    pub title: String,
    #[schemars(description = "Feature specification, constraints, acceptance notes")]
    #[serde(default)]
    pub description: Option<String>,
    #[schemars(
        description = "Whether completing this feature requires a passing verification block. Defaults to false."
    )]
    #[serde(default)]
    pub requires_verification: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTaskRequest {
    #[schemars(description = "The UUID of the owning feature, if any")]
    #[serde(default)]
    pub feature_id: Option<String>,
    #[schemars(description = "Short title describing what this task accomplishes")]
    pub title: String,
    #[schemars(description = "Detailed scope of work for the agent executing this task")]
    #[serde(default)]
    pub description: Option<String>,
    #[schemars(
        description = "Whether completing this task requires a passing verification block and resolved blockers. Defaults to false."
    )]
    #[serde(default)]
    pub requires_verification: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFeaturesRequest {
    #[schemars(description = "The UUID of the project to list features for")]
    pub project_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListTasksRequest {
    #[schemars(description = "The UUID of the feature to list tasks for")]
    pub feature_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddDependencyRequest {
    #[schemars(description = "The UUID of the source task of the edge")]
    pub from_task_id: String,
    #[schemars(description = "The UUID of the target task of the edge")]
    pub to_task_id: String,
    #[schemars(
        description = "Edge type: 'blocks' (source blocks target), 'is_blocked_by' (source is blocked by target), or 'relates_to' (informational)"
    )]
    pub dep_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetVerificationRequest {
    #[schemars(description = "The UUID of the entity to attach criteria to")]
    pub entity_id: String,
    #[schemars(description = "Acceptance criteria with their current pass/fail state")]
    pub criteria: Vec<CriterionInput>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CriterionInput {
    #[schemars(description = "What must be true for this criterion to pass")]
    pub criteria: String,
    #[schemars(description = "Whether the criterion currently passes")]
    pub pass: bool,
}

// ============================================================
// Response Types
// ============================================================

/// Wire result of `transition_status`. Expected failures (not found, invalid
/// transition, blocked completion, lock timeout) come back as
/// `success: false` with an `error_code`, never as protocol errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionStatusResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade: Option<Vec<CascadeEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub entity_id: String,
    pub entity_type: String,
    pub status: String,
    pub requires_verification: bool,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub requires_verification: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub id: String,
    pub project_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub requires_verification: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: String,
    pub feature_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub requires_verification: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureListResponse {
    pub project_id: String,
    pub features: Vec<FeatureInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub feature_id: String,
    pub tasks: Vec<TaskInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub id: String,
    pub from_task_id: String,
    pub to_task_id: String,
    pub dep_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationInfo {
    pub entity_id: String,
    pub criteria: Vec<CriterionInfo>,
    pub satisfied: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CriterionInfo {
    pub criteria: String,
    pub pass: bool,
}
