//! The per-entity-type status transition table.
//!
//! Pure data and lookups: no I/O, no clocks, no instances. The engine asks
//! `is_allowed(from, to, mode)` and everything else follows from the edge
//! tables below.

use serde::{Deserialize, Serialize};

use crate::models::{FeatureStatus, ProjectStatus, StatusValue, TaskStatus};

/// Which rule set governs transitions.
///
/// `Strict` admits only the enumerated lifecycle edges plus the universal
/// escape to `cancelled`/`archived` from any non-terminal status. `Permissive`
/// is the legacy mode: any forward (ordinal-non-decreasing) move from a
/// non-terminal status is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    Strict,
    Permissive,
}

const TASK_EDGES: &[(TaskStatus, &[TaskStatus])] = &[
    (
        TaskStatus::Pending,
        &[TaskStatus::InProgress, TaskStatus::Deferred],
    ),
    (
        TaskStatus::InProgress,
        &[TaskStatus::Testing, TaskStatus::Completed, TaskStatus::Deferred],
    ),
    (
        TaskStatus::Testing,
        &[TaskStatus::Completed, TaskStatus::InProgress],
    ),
    (
        TaskStatus::Deferred,
        &[TaskStatus::Pending, TaskStatus::InProgress],
    ),
];

const FEATURE_EDGES: &[(FeatureStatus, &[FeatureStatus])] = &[
    (FeatureStatus::Planning, &[FeatureStatus::InDevelopment]),
    (
        FeatureStatus::InDevelopment,
        &[FeatureStatus::Validating, FeatureStatus::Completed],
    ),
    (
        FeatureStatus::Validating,
        &[FeatureStatus::Completed, FeatureStatus::InDevelopment],
    ),
];

const PROJECT_EDGES: &[(ProjectStatus, &[ProjectStatus])] = &[
    (ProjectStatus::Planning, &[ProjectStatus::InDevelopment]),
    (ProjectStatus::InDevelopment, &[ProjectStatus::Completed]),
];

/// Whether `from → to` is a legal transition under `mode`.
///
/// Statuses of mismatched entity kinds never transition into each other.
/// Self-transition is always legal and treated as a no-op by the engine.
pub fn is_allowed(from: StatusValue, to: StatusValue, mode: TransitionMode) -> bool {
    if from.entity_type() != to.entity_type() {
        return false;
    }
    if from == to {
        return true;
    }
    if from.is_terminal() {
        return false;
    }
    // Abandonment is reachable from every non-terminal status in both modes.
    if to.is_abandonment() {
        return true;
    }

    match mode {
        TransitionMode::Permissive => ordinal(to) >= ordinal(from),
        TransitionMode::Strict => match (from, to) {
            (StatusValue::Task(f), StatusValue::Task(t)) => edge(TASK_EDGES, f, t),
            (StatusValue::Feature(f), StatusValue::Feature(t)) => edge(FEATURE_EDGES, f, t),
            (StatusValue::Project(f), StatusValue::Project(t)) => edge(PROJECT_EDGES, f, t),
            _ => false,
        },
    }
}

fn edge<S: PartialEq + Copy>(table: &[(S, &[S])], from: S, to: S) -> bool {
    table
        .iter()
        .find(|(f, _)| *f == from)
        .map(|(_, targets)| targets.contains(&to))
        .unwrap_or(false)
}

fn ordinal(s: StatusValue) -> u8 {
    match s {
        StatusValue::Project(p) => p.ordinal(),
        StatusValue::Feature(f) => f.ordinal(),
        StatusValue::Task(t) => t.ordinal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK_STATUSES: &[TaskStatus] = &[
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Testing,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
        TaskStatus::Deferred,
    ];

    #[test]
    fn self_transition_is_always_allowed() {
        for mode in [TransitionMode::Strict, TransitionMode::Permissive] {
            for s in TASK_STATUSES {
                let v = StatusValue::Task(*s);
                assert!(is_allowed(v, v, mode), "{s:?} -> {s:?} under {mode:?}");
            }
        }
    }

    #[test]
    fn strict_follows_task_lifecycle() {
        let allowed = |f, t| {
            is_allowed(
                StatusValue::Task(f),
                StatusValue::Task(t),
                TransitionMode::Strict,
            )
        };

        assert!(allowed(TaskStatus::Pending, TaskStatus::InProgress));
        assert!(allowed(TaskStatus::InProgress, TaskStatus::Testing));
        assert!(allowed(TaskStatus::Testing, TaskStatus::Completed));
        assert!(allowed(TaskStatus::InProgress, TaskStatus::Completed));

        assert!(!allowed(TaskStatus::Pending, TaskStatus::Completed));
        assert!(!allowed(TaskStatus::Pending, TaskStatus::Testing));
        assert!(!allowed(TaskStatus::Completed, TaskStatus::InProgress));
    }

    #[test]
    fn cancellation_is_reachable_from_any_non_terminal_status() {
        for s in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Testing,
            TaskStatus::Deferred,
        ] {
            assert!(is_allowed(
                StatusValue::Task(s),
                StatusValue::Task(TaskStatus::Cancelled),
                TransitionMode::Strict,
            ));
        }
        assert!(!is_allowed(
            StatusValue::Task(TaskStatus::Completed),
            StatusValue::Task(TaskStatus::Cancelled),
            TransitionMode::Strict,
        ));
    }

    #[test]
    fn permissive_allows_forward_jumps_but_not_regressions() {
        assert!(is_allowed(
            StatusValue::Task(TaskStatus::Pending),
            StatusValue::Task(TaskStatus::Completed),
            TransitionMode::Permissive,
        ));
        assert!(!is_allowed(
            StatusValue::Task(TaskStatus::Testing),
            StatusValue::Task(TaskStatus::Pending),
            TransitionMode::Permissive,
        ));
    }

    #[test]
    fn mismatched_entity_kinds_never_transition() {
        assert!(!is_allowed(
            StatusValue::Task(TaskStatus::Completed),
            StatusValue::Feature(FeatureStatus::Completed),
            TransitionMode::Permissive,
        ));
    }

    #[test]
    fn feature_completion_is_reachable_from_in_development() {
        // Cascade lands features on completed without an explicit
        // validating step.
        assert!(is_allowed(
            StatusValue::Feature(FeatureStatus::InDevelopment),
            StatusValue::Feature(FeatureStatus::Completed),
            TransitionMode::Strict,
        ));
    }

    #[test]
    fn archived_is_terminal_for_projects() {
        assert!(!is_allowed(
            StatusValue::Project(ProjectStatus::Archived),
            StatusValue::Project(ProjectStatus::InDevelopment),
            TransitionMode::Strict,
        ));
    }
}
