//! MCP server exposing the work item tracker to AI agents.

mod types;

pub use types::*;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use uuid::Uuid;

use crate::models::*;
use crate::status::{StatusEngine, TransitionError};

#[derive(Clone)]
pub struct McpServer {
    engine: StatusEngine,
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    pub fn new(engine: StatusEngine) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    fn parse_uuid(s: &str) -> Result<Uuid, McpError> {
        Uuid::parse_str(s)
            .map_err(|e| McpError::invalid_params(format!("Invalid UUID: {}", e), None))
    }

    // ============================================================
    // Tool logic - plain methods so integration tests can call them
    // without speaking the protocol
    // ============================================================

    /// Run a transition and fold the outcome (success or expected failure)
    /// into the structured wire response. Expected failures never escape as
    /// errors here.
    pub fn do_transition_status(
        &self,
        entity_id: &str,
        status: &str,
        session_id: Option<&str>,
    ) -> Result<TransitionStatusResponse, McpError> {
        let entity_id = Self::parse_uuid(entity_id)?;

        let response = match self.engine.transition(entity_id, status, session_id) {
            Ok(outcome) => TransitionStatusResponse {
                success: true,
                entity_type: Some(outcome.entity_type.as_str().to_string()),
                status: Some(outcome.status),
                modified_at: Some(outcome.modified_at.to_rfc3339()),
                cascade: Some(outcome.cascade),
                warnings: Some(outcome.warnings),
                error_code: None,
                error_detail: None,
            },
            Err(e) => TransitionStatusResponse {
                success: false,
                entity_type: None,
                status: None,
                modified_at: None,
                cascade: None,
                warnings: None,
                error_code: Some(e.error_code().to_string()),
                error_detail: Some(detail_of(&e)),
            },
        };

        Ok(response)
    }

    pub fn do_get_status(&self, entity_id: &str) -> Result<StatusResponse, McpError> {
        let entity_id = Self::parse_uuid(entity_id)?;

        let entity = self
            .engine
            .db()
            .resolve_entity(entity_id)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?
            .ok_or_else(|| McpError::invalid_params("Entity not found", None))?;

        let updated_at = match &entity {
            Entity::Project(p) => p.updated_at,
            Entity::Feature(f) => f.updated_at,
            Entity::Task(t) => t.updated_at,
        };

        Ok(StatusResponse {
            entity_id: entity.id().to_string(),
            entity_type: entity.entity_type().as_str().to_string(),
            status: entity.status().as_str().to_string(),
            requires_verification: entity.requires_verification(),
            updated_at: updated_at.to_rfc3339(),
        })
    }

    pub fn do_create_project(
        &self,
        name: &str,
        description: Option<&str>,
        requires_verification: bool,
    ) -> Result<ProjectInfo, McpError> {
        let project = self
            .engine
            .db()
            .create_project(CreateProjectInput {
                name: name.to_string(),
                description: description.map(|s| s.to_string()),
                requires_verification,
            })
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(project_info(project))
    }

    pub fn do_create_feature(
        &self,
        project_id: Option<&str>,
        title: &str,
        description: Option<&str>,
        requires_verification: bool,
    ) -> Result<FeatureInfo, McpError> {
        let project_id = match project_id {
            Some(pid) => Some(Self::parse_uuid(pid)?),
            None => None,
        };

        let feature = self
            .engine
            .db()
            .create_feature(CreateFeatureInput {
                project_id,
                title: title.to_string(),
                description: description.map(|s| s.to_string()),
                requires_verification,
            })
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        Ok(feature_info(feature))
    }

    pub fn do_create_task(
        &self,
        feature_id: Option<&str>,
        title: &str,
        description: Option<&str>,
        requires_verification: bool,
    ) -> Result<TaskInfo, McpError> {
        let feature_id = match feature_id {
            Some(fid) => Some(Self::parse_uuid(fid)?),
            None => None,
        };

        let task = self
            .engine
            .db()
            .create_task(CreateTaskInput {
                feature_id,
                title: title.to_string(),
                description: description.map(|s| s.to_string()),
                requires_verification,
            })
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        Ok(task_info(task))
    }

    pub fn do_list_features(&self, project_id: &str) -> Result<FeatureListResponse, McpError> {
        let project_id = Self::parse_uuid(project_id)?;
        let features = self
            .engine
            .db()
            .get_features_by_project(project_id)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(FeatureListResponse {
            project_id: project_id.to_string(),
            features: features.into_iter().map(feature_info).collect(),
        })
    }

    pub fn do_list_tasks(&self, feature_id: &str) -> Result<TaskListResponse, McpError> {
        let feature_id = Self::parse_uuid(feature_id)?;
        let tasks = self
            .engine
            .db()
            .get_tasks_by_feature(feature_id)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(TaskListResponse {
            feature_id: feature_id.to_string(),
            tasks: tasks.into_iter().map(task_info).collect(),
        })
    }

    pub fn do_add_dependency(
        &self,
        from_task_id: &str,
        to_task_id: &str,
        dep_type: &str,
    ) -> Result<DependencyInfo, McpError> {
        let from_task_id = Self::parse_uuid(from_task_id)?;
        let to_task_id = Self::parse_uuid(to_task_id)?;
        let dep_type = DependencyType::from_str(dep_type).ok_or_else(|| {
            McpError::invalid_params(
                format!(
                    "Invalid dep_type '{}'. Must be: blocks, is_blocked_by, or relates_to",
                    dep_type
                ),
                None,
            )
        })?;

        let dep = self
            .engine
            .db()
            .add_dependency(CreateDependencyInput {
                from_task_id,
                to_task_id,
                dep_type,
            })
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        Ok(DependencyInfo {
            id: dep.id.to_string(),
            from_task_id: dep.from_task_id.to_string(),
            to_task_id: dep.to_task_id.to_string(),
            dep_type: dep.dep_type.as_str().to_string(),
        })
    }

    pub fn do_set_verification(
        &self,
        entity_id: &str,
        criteria: Vec<CriterionInput>,
    ) -> Result<VerificationInfo, McpError> {
        let entity_id = Self::parse_uuid(entity_id)?;

        let block = self
            .engine
            .db()
            .set_verification(SetVerificationInput {
                entity_id,
                criteria: criteria
                    .into_iter()
                    .map(|c| VerificationCriterion {
                        criteria: c.criteria,
                        pass: c.pass,
                    })
                    .collect(),
            })
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        Ok(VerificationInfo {
            entity_id: block.entity_id.to_string(),
            satisfied: block.is_satisfied(),
            criteria: block
                .criteria
                .into_iter()
                .map(|c| CriterionInfo {
                    criteria: c.criteria,
                    pass: c.pass,
                })
                .collect(),
        })
    }
}

fn detail_of(e: &TransitionError) -> String {
    match e {
        TransitionError::Blocked { reasons } => reasons.join("; "),
        other => other.to_string(),
    }
}

fn project_info(p: Project) -> ProjectInfo {
    ProjectInfo {
        id: p.id.to_string(),
        name: p.name,
        description: p.description,
        status: p.status.as_str().to_string(),
        requires_verification: p.requires_verification,
    }
}

fn feature_info(f: Feature) -> FeatureInfo {
    FeatureInfo {
        id: f.id.to_string(),
        project_id: f.project_id.map(|u| u.to_string()),
        title: f.title,
        description: f.description,
        status: f.status.as_str().to_string(),
        requires_verification: f.requires_verification,
    }
}

fn task_info(t: Task) -> TaskInfo {
    TaskInfo {
        id: t.id.to_string(),
        feature_id: t.feature_id.map(|u| u.to_string()),
        title: t.title,
        description: t.description,
        status: t.status.as_str().to_string(),
        requires_verification: t.requires_verification,
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool_router]
impl McpServer {
    // ============================================================
    // Status Tools - The core surface
    // ============================================================

    #[tool(
        description = "Transition a project, feature, or task to a new status. Enforces the per-type lifecycle: illegal jumps are rejected, and moving to 'completed' is gated behind verification criteria, unresolved blockers, and child completion when the entity requires verification. Completing the last open task in a feature cascades the feature (and possibly the project) to 'completed' automatically; the response's 'cascade' array reports what happened to each ancestor. Always returns a JSON body with success=true/false; on failure error_code is one of RESOURCE_NOT_FOUND, VALIDATION_ERROR, LOCK_TIMEOUT, DATABASE_ERROR, INTERNAL_ERROR, and error_detail lists the specific unmet criteria or blocking task ids."
    )]
    async fn transition_status(
        &self,
        params: Parameters<TransitionStatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response =
            self.do_transition_status(&req.entity_id, &req.status, req.session_id.as_deref())?;
        json_result(&response)
    }

    #[tool(
        description = "Get the current status of a project, feature, or task by id. Returns entity_type, status, requires_verification, and the last modification timestamp."
    )]
    async fn get_status(
        &self,
        params: Parameters<GetStatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.do_get_status(&req.entity_id)?;
        json_result(&response)
    }

    // ============================================================
    // Setup Tools - Create work items
    // ============================================================

    #[tool(
        description = "Create a new project. Projects start in 'planning' and contain features. Set requires_verification=true to gate project completion behind a passing verification block."
    )]
    async fn create_project(
        &self,
        params: Parameters<CreateProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.do_create_project(
            &req.name,
            req.description.as_deref(),
            req.requires_verification,
        )?;
        json_result(&response)
    }

    #[tool(
        description = "Create a feature, optionally attached to a project. Features start in 'planning' and contain the tasks that build them. Set requires_verification=true to gate feature completion behind passing criteria and terminal child tasks."
    )]
    async fn create_feature(
        &self,
        params: Parameters<CreateFeatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.do_create_feature(
            req.project_id.as_deref(),
            &req.title,
            req.description.as_deref(),
            req.requires_verification,
        )?;
        json_result(&response)
    }

    #[tool(
        description = "Create a task, optionally attached to a feature. Tasks start in 'pending'. Set requires_verification=true to gate task completion behind passing criteria and resolved blockers."
    )]
    async fn create_task(
        &self,
        params: Parameters<CreateTaskRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.do_create_task(
            req.feature_id.as_deref(),
            &req.title,
            req.description.as_deref(),
            req.requires_verification,
        )?;
        json_result(&response)
    }

    // ============================================================
    // Discovery Tools
    // ============================================================

    #[tool(description = "List all features of a project with their current status.")]
    async fn list_features(
        &self,
        params: Parameters<ListFeaturesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.do_list_features(&req.project_id)?;
        json_result(&response)
    }

    #[tool(description = "List all tasks of a feature with their current status.")]
    async fn list_tasks(
        &self,
        params: Parameters<ListTasksRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.do_list_tasks(&req.feature_id)?;
        json_result(&response)
    }

    // ============================================================
    // Constraint Tools
    // ============================================================

    #[tool(
        description = "Add a dependency edge between two tasks. 'blocks' means the source task must reach a terminal status before the target may complete; 'is_blocked_by' is the inverse spelling; 'relates_to' is informational only."
    )]
    async fn add_dependency(
        &self,
        params: Parameters<AddDependencyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response =
            self.do_add_dependency(&req.from_task_id, &req.to_task_id, &req.dep_type)?;
        json_result(&response)
    }

    #[tool(
        description = "Attach or replace the verification block of an entity. The block lists acceptance criteria with pass/fail state; an entity with requires_verification=true can only complete when every criterion passes. Update criteria to pass=true as they are verified."
    )]
    async fn set_verification(
        &self,
        params: Parameters<SetVerificationRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.do_set_verification(&req.entity_id, req.criteria)?;
        json_result(&response)
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "waypoint".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(
                r#"Waypoint tracks hierarchical work items for AI-agent development.

HIERARCHY:
Project -> Feature -> Task. Containment is optional at each step; unattached
tasks and features are fine, they just never cascade.

LIFECYCLES:
- Task:    pending -> in_progress -> testing -> completed, with cancelled and
           deferred as branches. Cancellation is reachable from any
           non-terminal status.
- Feature: planning -> in_development -> validating -> completed, archived as
           the escape.
- Project: planning -> in_development -> completed, archived as the escape.

COMPLETION GATE:
Entities created with requires_verification=true can only move to 'completed'
when:
1. a verification block is attached and every criterion passes,
2. (tasks) no incoming 'blocks' dependency has a non-terminal source,
3. (features/projects) every child is in a terminal status.
Moving to 'cancelled' or 'archived' bypasses the gate entirely: the gate
protects "done", not "give up".

CASCADE:
Completing or cancelling the last open task of a feature automatically
advances the feature to 'completed' (and the project, when that feature was
its last open one). The transition_status response reports a per-ancestor
cascade audit; ancestors are never moved backward.

TYPICAL WORKFLOW:
1. create_project / create_feature / create_task to lay out the work
2. add_dependency to record ordering constraints between tasks
3. set_verification to attach acceptance criteria
4. transition_status to in_progress when you start, testing when implemented
5. set_verification updating criteria to pass=true as you verify them
6. transition_status to completed; read 'cascade' to see what rolled up

ERRORS:
transition_status always returns JSON with success=true/false. On failure,
error_code is RESOURCE_NOT_FOUND, VALIDATION_ERROR (illegal transition or
blocked completion, with specifics in error_detail), LOCK_TIMEOUT (another
session holds the entity; retry with backoff), DATABASE_ERROR, or
INTERNAL_ERROR."#
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(engine: StatusEngine) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(engine);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
