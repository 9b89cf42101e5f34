//! Upward status cascade.
//!
//! After a task's status changes, recompute whether its feature (and in turn
//! the project) should advance. Cascade is advisory: it only ever moves an
//! ancestor forward to `completed`, it is idempotent, and a refusal by the
//! ancestor's transition table or gate produces an audit entry rather than
//! an error. Ancestor locks are taken strictly child → parent; the lock of
//! the in-flight entity is never reacquired here.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::models::{Entity, EntityType, FeatureStatus, ProjectStatus, StatusValue, Task};

use super::gate::{self, GateDecision};
use super::lock::LockCoordinator;
use super::transitions::{self, TransitionMode};

/// One ancestor's cascade outcome, reported back to the caller for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeEntry {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub from: String,
    pub to: String,
    pub changed: bool,
    /// Why the ancestor was left alone, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CascadeEntry {
    fn no_op(entity_type: EntityType, entity_id: Uuid, status: &str, reason: String) -> Self {
        Self {
            entity_type,
            entity_id,
            from: status.to_string(),
            to: status.to_string(),
            changed: false,
            reason: Some(reason),
        }
    }
}

/// Walk upward from a just-mutated task: feature first, then project.
///
/// The project step only runs when the feature actually changed; an
/// unchanged feature cannot newly satisfy the project's all-children rule.
pub fn propagate_from_task(
    db: &Database,
    locks: Option<&LockCoordinator>,
    session_id: &str,
    lock_timeout: Duration,
    mode: TransitionMode,
    task: &Task,
) -> Result<Vec<CascadeEntry>> {
    let mut entries = Vec::new();

    let Some(feature_id) = task.feature_id else {
        return Ok(entries);
    };

    let feature_entry = cascade_feature(db, locks, session_id, lock_timeout, mode, feature_id)?;
    let feature_changed = feature_entry.changed;
    entries.push(feature_entry);

    if !feature_changed {
        return Ok(entries);
    }

    let feature = db
        .get_feature(feature_id)?
        .ok_or_else(|| anyhow::anyhow!("Feature disappeared during cascade: {}", feature_id))?;
    if let Some(project_id) = feature.project_id {
        entries.push(cascade_project(
            db,
            locks,
            session_id,
            lock_timeout,
            mode,
            project_id,
        )?);
    }

    Ok(entries)
}

fn cascade_feature(
    db: &Database,
    locks: Option<&LockCoordinator>,
    session_id: &str,
    lock_timeout: Duration,
    mode: TransitionMode,
    feature_id: Uuid,
) -> Result<CascadeEntry> {
    let _guard = match locks {
        Some(coordinator) => {
            match coordinator.acquire_guard(feature_id, session_id, lock_timeout) {
                Some(guard) => Some(guard),
                None => {
                    return Ok(CascadeEntry::no_op(
                        EntityType::Feature,
                        feature_id,
                        "unknown",
                        "lock timeout on ancestor".to_string(),
                    ));
                }
            }
        }
        None => None,
    };

    let feature = db
        .get_feature(feature_id)?
        .ok_or_else(|| anyhow::anyhow!("Feature not found during cascade: {}", feature_id))?;
    let from = feature.status;

    if from.is_terminal() {
        return Ok(CascadeEntry::no_op(
            EntityType::Feature,
            feature_id,
            from.as_str(),
            format!("already {}", from.as_str()),
        ));
    }

    let tasks = db.get_tasks_by_feature(feature_id)?;
    let open = tasks.iter().filter(|t| !t.status.is_terminal()).count();
    if open > 0 {
        // Never regress a feature because of task churn; only advance when
        // every child has settled.
        return Ok(CascadeEntry::no_op(
            EntityType::Feature,
            feature_id,
            from.as_str(),
            format!("{open} child tasks still non-terminal"),
        ));
    }

    let target = FeatureStatus::Completed;
    if !transitions::is_allowed(
        StatusValue::Feature(from),
        StatusValue::Feature(target),
        mode,
    ) {
        return Ok(CascadeEntry::no_op(
            EntityType::Feature,
            feature_id,
            from.as_str(),
            format!("transition {} -> {} not allowed", from.as_str(), target.as_str()),
        ));
    }

    match gate::check_completion(db, &Entity::Feature(feature.clone()))? {
        GateDecision::Allowed => {}
        GateDecision::Blocked(reasons) => {
            return Ok(CascadeEntry::no_op(
                EntityType::Feature,
                feature_id,
                from.as_str(),
                format!("completion blocked: {}", reasons.join("; ")),
            ));
        }
    }

    db.set_feature_status(feature_id, target)?;
    tracing::debug!(feature = %feature_id, from = from.as_str(), to = target.as_str(), "cascaded feature status");

    Ok(CascadeEntry {
        entity_type: EntityType::Feature,
        entity_id: feature_id,
        from: from.as_str().to_string(),
        to: target.as_str().to_string(),
        changed: true,
        reason: None,
    })
}

fn cascade_project(
    db: &Database,
    locks: Option<&LockCoordinator>,
    session_id: &str,
    lock_timeout: Duration,
    mode: TransitionMode,
    project_id: Uuid,
) -> Result<CascadeEntry> {
    let _guard = match locks {
        Some(coordinator) => {
            match coordinator.acquire_guard(project_id, session_id, lock_timeout) {
                Some(guard) => Some(guard),
                None => {
                    return Ok(CascadeEntry::no_op(
                        EntityType::Project,
                        project_id,
                        "unknown",
                        "lock timeout on ancestor".to_string(),
                    ));
                }
            }
        }
        None => None,
    };

    let project = db
        .get_project(project_id)?
        .ok_or_else(|| anyhow::anyhow!("Project not found during cascade: {}", project_id))?;
    let from = project.status;

    if from.is_terminal() {
        return Ok(CascadeEntry::no_op(
            EntityType::Project,
            project_id,
            from.as_str(),
            format!("already {}", from.as_str()),
        ));
    }

    let features = db.get_features_by_project(project_id)?;
    let open = features.iter().filter(|f| !f.status.is_terminal()).count();
    if open > 0 {
        return Ok(CascadeEntry::no_op(
            EntityType::Project,
            project_id,
            from.as_str(),
            format!("{open} child features still non-terminal"),
        ));
    }

    let target = ProjectStatus::Completed;
    if !transitions::is_allowed(
        StatusValue::Project(from),
        StatusValue::Project(target),
        mode,
    ) {
        return Ok(CascadeEntry::no_op(
            EntityType::Project,
            project_id,
            from.as_str(),
            format!("transition {} -> {} not allowed", from.as_str(), target.as_str()),
        ));
    }

    match gate::check_completion(db, &Entity::Project(project.clone()))? {
        GateDecision::Allowed => {}
        GateDecision::Blocked(reasons) => {
            return Ok(CascadeEntry::no_op(
                EntityType::Project,
                project_id,
                from.as_str(),
                format!("completion blocked: {}", reasons.join("; ")),
            ));
        }
    }

    db.set_project_status(project_id, target)?;
    tracing::debug!(project = %project_id, from = from.as_str(), to = target.as_str(), "cascaded project status");

    Ok(CascadeEntry {
        entity_type: EntityType::Project,
        entity_id: project_id,
        from: from.as_str().to_string(),
        to: target.as_str().to_string(),
        changed: true,
        reason: None,
    })
}
