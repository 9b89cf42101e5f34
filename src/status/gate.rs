//! The completion prerequisite gate.
//!
//! Decides whether an entity may move into `completed`, independent of the
//! transition table. Abandonment (`cancelled`/`archived`) never passes
//! through here: verification and dependency gates protect "done" semantics,
//! not "give up" semantics.

use anyhow::Result;

use crate::db::Database;
use crate::models::Entity;

/// Outcome of the prerequisite check. `Blocked` is an expected, caller-
/// correctable condition carrying the specific unmet reasons, not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Blocked(Vec<String>),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Check whether `entity` may complete.
///
/// An entity with `requires_verification = false` passes unconditionally;
/// the dependency and child-status scans only apply to gated entities.
/// Otherwise every attached verification criterion must pass, a task must
/// have no non-terminal blockers, and a feature/project must have only
/// terminal children.
pub fn check_completion(db: &Database, entity: &Entity) -> Result<GateDecision> {
    if !entity.requires_verification() {
        return Ok(GateDecision::Allowed);
    }

    let mut reasons = Vec::new();

    let blocks = db.get_verification_blocks(entity.id())?;
    if blocks.is_empty() {
        reasons.push(
            "no verification block attached; completion requires passing criteria".to_string(),
        );
    }
    for block in &blocks {
        if block.criteria.is_empty() {
            reasons.push("verification block has no criteria".to_string());
            continue;
        }
        for unmet in block.unmet() {
            reasons.push(format!("unmet criterion: {unmet}"));
        }
    }

    match entity {
        Entity::Task(task) => {
            for blocker in db.incoming_blocking_tasks(task.id)? {
                if !blocker.status.is_terminal() {
                    reasons.push(format!(
                        "blocked by task {} ({}, status {})",
                        blocker.id,
                        blocker.title,
                        blocker.status.as_str()
                    ));
                }
            }
        }
        Entity::Feature(feature) => {
            let tasks = db.get_tasks_by_feature(feature.id)?;
            let open = tasks.iter().filter(|t| !t.status.is_terminal()).count();
            if open > 0 {
                reasons.push(format!(
                    "{open} of {} child tasks not in a terminal status",
                    tasks.len()
                ));
            }
        }
        Entity::Project(project) => {
            let features = db.get_features_by_project(project.id)?;
            let open = features.iter().filter(|f| !f.status.is_terminal()).count();
            if open > 0 {
                reasons.push(format!(
                    "{open} of {} child features not in a terminal status",
                    features.len()
                ));
            }
        }
    }

    if reasons.is_empty() {
        Ok(GateDecision::Allowed)
    } else {
        Ok(GateDecision::Blocked(reasons))
    }
}
