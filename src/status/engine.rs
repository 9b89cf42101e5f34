//! The status transition orchestrator.
//!
//! Sequences one transition request: lock → load → transition-table check →
//! completion gate (when the target is `completed`) → persist → cascade →
//! release. The lock guard releases on every exit path, including panics.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::Database;
use crate::models::{Entity, EntityType, StatusValue};

use super::cascade::{self, CascadeEntry};
use super::gate::{self, GateDecision};
use super::lock::LockCoordinator;
use super::transitions::{self, TransitionMode};

/// Tuning for the engine. `locking: false` drops the mutual-exclusion
/// guarantee (single-threaded/test contexts) but changes nothing else.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: TransitionMode,
    pub lock_timeout: Duration,
    pub lock_ttl: Duration,
    pub locking: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: TransitionMode::Strict,
            lock_timeout: Duration::from_secs(5),
            lock_ttl: Duration::from_secs(30),
            locking: true,
        }
    }
}

/// The closed set of transition failures. All variants map onto the
/// wire-level `error_code` contract; everything up to `LockTimeout` is an
/// expected, caller-correctable condition, while `Database` and `Internal`
/// are faults.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("entity not found: {0}")]
    NotFound(Uuid),

    #[error("unknown {entity_type} status '{status}'")]
    UnknownStatus {
        entity_type: EntityType,
        status: String,
    },

    #[error("invalid {entity_type} transition: {from} -> {to}")]
    InvalidTransition {
        entity_type: EntityType,
        from: String,
        to: String,
    },

    #[error("completion blocked: {}", reasons.join("; "))]
    Blocked { reasons: Vec<String> },

    #[error("timed out waiting for lock on entity {0}")]
    LockTimeout(Uuid),

    #[error("database error: {0}")]
    Database(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl TransitionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "RESOURCE_NOT_FOUND",
            Self::UnknownStatus { .. } | Self::InvalidTransition { .. } | Self::Blocked { .. } => {
                "VALIDATION_ERROR"
            }
            Self::LockTimeout(_) => "LOCK_TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Faults bubbling out of the store split into two wire codes: anything
/// rooted in sqlite is a `DATABASE_ERROR`, everything else (serialization,
/// violated invariants) is an `INTERNAL_ERROR`.
impl From<anyhow::Error> for TransitionError {
    fn from(e: anyhow::Error) -> Self {
        let is_store_fault = e
            .chain()
            .any(|cause| cause.downcast_ref::<rusqlite::Error>().is_some());
        if is_store_fault {
            Self::Database(e)
        } else {
            Self::Internal(e)
        }
    }
}

/// Result of a successful transition, including the per-ancestor cascade
/// audit and any warnings from swallowed cascade failures.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransitionOutcome {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub status: String,
    pub modified_at: DateTime<Utc>,
    pub cascade: Vec<CascadeEntry>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct StatusEngine {
    db: Database,
    locks: Option<Arc<LockCoordinator>>,
    config: EngineConfig,
}

impl StatusEngine {
    pub fn new(db: Database) -> Self {
        Self::with_config(db, EngineConfig::default())
    }

    pub fn with_config(db: Database, config: EngineConfig) -> Self {
        let locks = config
            .locking
            .then(|| Arc::new(LockCoordinator::new(config.lock_ttl)));
        Self { db, locks, config }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The lock coordinator, when locking is enabled. Exposed so callers
    /// (and tests) can hold locks across engine invocations.
    pub fn locks(&self) -> Option<&LockCoordinator> {
        self.locks.as_deref()
    }

    /// Transition `entity_id` to `requested` status.
    ///
    /// `session_id` scopes lock ownership; callers without one get a fresh
    /// session per invocation.
    pub fn transition(
        &self,
        entity_id: Uuid,
        requested: &str,
        session_id: Option<&str>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let session = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Guard held for the whole mutation; drops (and releases) on every
        // return path below.
        let _guard = match &self.locks {
            Some(coordinator) => Some(
                coordinator
                    .acquire_guard(entity_id, &session, self.config.lock_timeout)
                    .ok_or(TransitionError::LockTimeout(entity_id))?,
            ),
            None => None,
        };

        let entity = self
            .db
            .resolve_entity(entity_id)?
            .ok_or(TransitionError::NotFound(entity_id))?;
        let from = entity.status();

        let to = StatusValue::parse(entity.entity_type(), requested).ok_or_else(|| {
            TransitionError::UnknownStatus {
                entity_type: entity.entity_type(),
                status: requested.to_string(),
            }
        })?;

        if !transitions::is_allowed(from, to, self.config.mode) {
            return Err(TransitionError::InvalidTransition {
                entity_type: entity.entity_type(),
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        if from == to {
            // Legal no-op; nothing persisted, nothing cascaded.
            return Ok(TransitionOutcome {
                entity_type: entity.entity_type(),
                entity_id,
                status: to.as_str().to_string(),
                modified_at: modified_at_of(&entity),
                cascade: Vec::new(),
                warnings: Vec::new(),
            });
        }

        if to.is_completion() {
            match gate::check_completion(&self.db, &entity)? {
                GateDecision::Allowed => {}
                GateDecision::Blocked(reasons) => {
                    return Err(TransitionError::Blocked { reasons });
                }
            }
        }

        let modified_at = self.persist(entity_id, to)?;
        tracing::debug!(
            entity = %entity_id,
            entity_type = entity.entity_type().as_str(),
            from = from.as_str(),
            to = to.as_str(),
            "status transition applied"
        );

        // Cascade is best-effort: a failure here never fails the primary
        // mutation, it is demoted to a warning.
        let mut warnings = Vec::new();
        let cascade = match &entity {
            Entity::Task(task) => {
                match cascade::propagate_from_task(
                    &self.db,
                    self.locks.as_deref(),
                    &session,
                    self.config.lock_timeout,
                    self.config.mode,
                    task,
                ) {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!(entity = %entity_id, error = %e, "cascade failed");
                        warnings.push(format!("cascade failed: {e}"));
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };

        Ok(TransitionOutcome {
            entity_type: entity.entity_type(),
            entity_id,
            status: to.as_str().to_string(),
            modified_at,
            cascade,
            warnings,
        })
    }

    fn persist(&self, entity_id: Uuid, to: StatusValue) -> Result<DateTime<Utc>, TransitionError> {
        let modified_at = match to {
            StatusValue::Task(status) => self.db.set_task_status(entity_id, status)?,
            StatusValue::Feature(status) => self.db.set_feature_status(entity_id, status)?,
            StatusValue::Project(status) => self.db.set_project_status(entity_id, status)?,
        };
        Ok(modified_at)
    }
}

fn modified_at_of(entity: &Entity) -> DateTime<Utc> {
    match entity {
        Entity::Project(p) => p.updated_at,
        Entity::Feature(f) => f.updated_at,
        Entity::Task(t) => t.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_faults_map_to_database_error() {
        let e = anyhow::Error::new(rusqlite::Error::QueryReturnedNoRows)
            .context("loading task row");
        let err: TransitionError = e.into();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn non_store_faults_map_to_internal_error() {
        let err: TransitionError = anyhow::anyhow!("criteria serialization failed").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
