// Pipeline state: the latest accepted output of every stage

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Substituted for the existing code of a stage 4 prompt when no earlier
/// step has been generated.
pub const NO_EXISTING_CODE: &str = "// No existing code yet";

/// Separator between concatenated code steps
const CODE_SEPARATOR: &str = "\n\n";

/// Every stage output for one session.
///
/// Serializes to a plain JSON object; the code maps use step numbers as
/// (string) keys, e.g. `{"generated_code": {"1": "..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineState {
    pub project_request: Option<String>,
    pub project_rules: Option<String>,
    pub starter_template: Option<String>,
    pub technical_specification: Option<String>,
    pub implementation_plan: Option<String>,
    pub generated_code: BTreeMap<u32, String>,
    pub optimization_plan: Option<String>,
    pub optimized_code: BTreeMap<u32, String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing code for stage 4: steps strictly before `step`
    pub fn code_before(&self, step: u32) -> String {
        let joined = join_code(self.generated_code.range(..step).map(|(_, code)| code));
        if joined.is_empty() {
            NO_EXISTING_CODE.to_string()
        } else {
            joined
        }
    }

    /// Existing code for stage 5: every generated step
    pub fn all_generated_code(&self) -> String {
        join_code(self.generated_code.values())
    }

    /// Existing code for stage 6: all generated code, then optimized steps
    /// strictly before `step`
    pub fn optimization_context(&self, step: u32) -> String {
        join_code(
            self.generated_code
                .values()
                .chain(self.optimized_code.range(..step).map(|(_, code)| code)),
        )
    }

    pub fn has_generated_code(&self) -> bool {
        !self.generated_code.is_empty()
    }
}

fn join_code<'a>(parts: impl Iterator<Item = &'a String>) -> String {
    parts
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(CODE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(pairs: &[(u32, &str)]) -> BTreeMap<u32, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_code_before_skips_gaps_and_later_steps() {
        let state = PipelineState {
            generated_code: code(&[(1, "A"), (3, "C"), (4, "D")]),
            ..Default::default()
        };
        assert_eq!(state.code_before(3), "A");
        assert_eq!(state.code_before(4), "A\n\nC");
        assert_eq!(state.code_before(10), "A\n\nC\n\nD");
    }

    #[test]
    fn test_code_before_uses_sentinel_when_nothing_precedes() {
        let state = PipelineState {
            generated_code: code(&[(2, "B")]),
            ..Default::default()
        };
        assert_eq!(state.code_before(1), NO_EXISTING_CODE);
        assert_eq!(PipelineState::new().code_before(5), NO_EXISTING_CODE);
    }

    #[test]
    fn test_all_generated_code_is_ordered_by_step() {
        let state = PipelineState {
            generated_code: code(&[(10, "J"), (2, "B"), (1, "A")]),
            ..Default::default()
        };
        assert_eq!(state.all_generated_code(), "A\n\nB\n\nJ");
    }

    #[test]
    fn test_optimization_context_appends_prior_optimized_steps() {
        let state = PipelineState {
            generated_code: code(&[(1, "A"), (2, "B")]),
            optimized_code: code(&[(1, "X"), (2, "Y")]),
            ..Default::default()
        };
        assert_eq!(state.optimization_context(2), "A\n\nB\n\nX");
        assert_eq!(state.optimization_context(1), "A\n\nB");
    }

    #[test]
    fn test_optimization_context_without_generated_code() {
        let state = PipelineState {
            optimized_code: code(&[(1, "X")]),
            ..Default::default()
        };
        assert_eq!(state.optimization_context(2), "X");
        assert_eq!(state.optimization_context(1), "");
    }

    #[test]
    fn test_snapshot_json_uses_string_step_keys() {
        let state = PipelineState {
            project_request: Some("req".into()),
            generated_code: code(&[(1, "A")]),
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["generated_code"]["1"], "A");
        assert_eq!(json["project_request"], "req");
        assert!(json["optimization_plan"].is_null());

        let restored: PipelineState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_partial_json_rehydrates_with_defaults() {
        let state: PipelineState =
            serde_json::from_str(r#"{"implementation_plan": "plan"}"#).unwrap();
        assert_eq!(state.implementation_plan.as_deref(), Some("plan"));
        assert!(state.generated_code.is_empty());
    }
}
