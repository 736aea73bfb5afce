//! Per-step failure policy.

use serde::{Deserialize, Serialize};

use sym_core::config::ConsistencyMode;

/// A fallible pipeline step.
///
/// Classification is absent: the classifier degrades to `Undefined`
/// instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Transcribe,
    CreateComment,
    SetSentiment,
    Embed,
    VectorUpsert,
    SetCustomerDetails,
    VectorMetadataUpdate,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Transcribe,
        Step::CreateComment,
        Step::SetSentiment,
        Step::Embed,
        Step::VectorUpsert,
        Step::SetCustomerDetails,
        Step::VectorMetadataUpdate,
    ];
}

/// What a failure in a step does to the enclosing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// The failure aborts the call and is returned to the caller.
    Required,
    /// The failure is logged and reported, and the call continues.
    BestEffort,
}

/// Maps every step to its policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    mode: ConsistencyMode,
}

impl PolicyTable {
    pub fn new(mode: ConsistencyMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ConsistencyMode {
        self.mode
    }

    pub fn policy(&self, step: Step) -> StepPolicy {
        match (self.mode, step) {
            (ConsistencyMode::Strict, _) => StepPolicy::Required,
            (_, Step::Transcribe | Step::CreateComment | Step::SetCustomerDetails) => {
                StepPolicy::Required
            }
            (
                ConsistencyMode::BestEffort,
                Step::SetSentiment | Step::Embed | Step::VectorUpsert | Step::VectorMetadataUpdate,
            ) => StepPolicy::BestEffort,
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(ConsistencyMode::BestEffort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_table() {
        let table = PolicyTable::default();
        assert_eq!(table.policy(Step::Transcribe), StepPolicy::Required);
        assert_eq!(table.policy(Step::CreateComment), StepPolicy::Required);
        assert_eq!(table.policy(Step::SetCustomerDetails), StepPolicy::Required);
        assert_eq!(table.policy(Step::SetSentiment), StepPolicy::BestEffort);
        assert_eq!(table.policy(Step::Embed), StepPolicy::BestEffort);
        assert_eq!(table.policy(Step::VectorUpsert), StepPolicy::BestEffort);
        assert_eq!(table.policy(Step::VectorMetadataUpdate), StepPolicy::BestEffort);
    }

    #[test]
    fn test_strict_table_requires_everything() {
        let table = PolicyTable::new(ConsistencyMode::Strict);
        for step in Step::ALL {
            assert_eq!(table.policy(step), StepPolicy::Required, "{:?}", step);
        }
    }

    #[test]
    fn test_step_serializes_snake_case() {
        let json = serde_json::to_string(&Step::VectorMetadataUpdate).unwrap();
        assert_eq!(json, "\"vector_metadata_update\"");
    }
}
