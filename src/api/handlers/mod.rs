use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::*;
use crate::status::{StatusEngine, TransitionError, TransitionOutcome};

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// Store-level "not found" messages are safe to expose as BAD_REQUEST;
/// everything else is logged server-side and replaced with a generic body.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("not found") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Map a transition failure to the wire contract: status code plus a JSON
/// body carrying the error code and detail.
fn transition_error(e: TransitionError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &e {
        TransitionError::NotFound(_) => StatusCode::NOT_FOUND,
        TransitionError::UnknownStatus { .. }
        | TransitionError::InvalidTransition { .. }
        | TransitionError::Blocked { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TransitionError::LockTimeout(_) => StatusCode::CONFLICT,
        TransitionError::Database(_) | TransitionError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let detail = match &e {
        TransitionError::Blocked { reasons } => reasons.join("; "),
        other => other.to_string(),
    };

    let body = serde_json::json!({
        "success": false,
        "error_code": e.error_code(),
        "error_detail": detail,
    });

    (status, Json(body))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(engine): State<StatusEngine>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    engine
        .db()
        .get_all_projects()
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_project(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, (StatusCode, String)> {
    engine
        .db()
        .get_project(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(engine): State<StatusEngine>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), (StatusCode, String)> {
    engine
        .db()
        .create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn delete_project(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = engine.db().delete_project(id).map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
    }
}

pub async fn list_project_features(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    engine
        .db()
        .get_features_by_project(id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Features
// ============================================================

pub async fn get_feature(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    engine
        .db()
        .get_feature(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Feature not found".to_string()))
}

pub async fn create_feature(
    State(engine): State<StatusEngine>,
    Json(input): Json<CreateFeatureInput>,
) -> Result<(StatusCode, Json<Feature>), (StatusCode, String)> {
    engine
        .db()
        .create_feature(input)
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(internal_error)
}

pub async fn delete_feature(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = engine.db().delete_feature(id).map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Feature not found".to_string()))
    }
}

pub async fn list_feature_tasks(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    engine
        .db()
        .get_tasks_by_feature(id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Tasks
// ============================================================

pub async fn get_task(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, (StatusCode, String)> {
    engine
        .db()
        .get_task(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))
}

pub async fn create_task(
    State(engine): State<StatusEngine>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    engine
        .db()
        .create_task(input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn delete_task(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = engine.db().delete_task(id).map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Task not found".to_string()))
    }
}

pub async fn list_task_dependencies(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Dependency>>, (StatusCode, String)> {
    engine
        .db()
        .get_dependencies_for_task(id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Dependencies
// ============================================================

pub async fn add_dependency(
    State(engine): State<StatusEngine>,
    Json(input): Json<CreateDependencyInput>,
) -> Result<(StatusCode, Json<Dependency>), (StatusCode, String)> {
    engine
        .db()
        .add_dependency(input)
        .map(|d| (StatusCode::CREATED, Json(d)))
        .map_err(internal_error)
}

// ============================================================
// Verification
// ============================================================

#[derive(Debug, Deserialize)]
pub struct SetVerificationBody {
    pub criteria: Vec<VerificationCriterion>,
}

pub async fn set_verification(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetVerificationBody>,
) -> Result<Json<VerificationBlock>, (StatusCode, String)> {
    engine
        .db()
        .set_verification(SetVerificationInput {
            entity_id: id,
            criteria: body.criteria,
        })
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_verification(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<VerificationBlock>>, (StatusCode, String)> {
    engine
        .db()
        .get_verification_blocks(id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Status transitions
// ============================================================

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub status: String,
    pub session_id: Option<String>,
}

pub async fn transition_status(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<TransitionOutcome>, (StatusCode, Json<serde_json::Value>)> {
    engine
        .transition(id, &body.status, body.session_id.as_deref())
        .map(Json)
        .map_err(transition_error)
}

pub async fn get_status(
    State(engine): State<StatusEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let entity = engine
        .db()
        .resolve_entity(id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Entity not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "entity_id": entity.id(),
        "entity_type": entity.entity_type().as_str(),
        "status": entity.status().as_str(),
        "requires_verification": entity.requires_verification(),
    })))
}
