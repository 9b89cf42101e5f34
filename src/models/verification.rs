use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured acceptance criteria attached to an entity.
///
/// When an entity has `requires_verification = true`, completion requires at
/// least one block with every criterion passing. No block at all counts as
/// "not satisfied", never as vacuously satisfied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationBlock {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub criteria: Vec<VerificationCriterion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One pass/fail acceptance criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCriterion {
    pub criteria: String,
    pub pass: bool,
}

impl VerificationBlock {
    /// True when the block has criteria and every one of them passes.
    pub fn is_satisfied(&self) -> bool {
        !self.criteria.is_empty() && self.criteria.iter().all(|c| c.pass)
    }

    /// Criteria descriptions that have not passed yet.
    pub fn unmet(&self) -> Vec<&str> {
        self.criteria
            .iter()
            .filter(|c| !c.pass)
            .map(|c| c.criteria.as_str())
            .collect()
    }
}

/// Input for attaching (or replacing) an entity's verification block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetVerificationInput {
    pub entity_id: Uuid,
    pub criteria: Vec<VerificationCriterion>,
}
