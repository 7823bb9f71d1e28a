//! The persisted pipeline state record and its transition helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::agent::AgentId;
use crate::phase::Phase;

/// What happened at a point in the pipeline's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Started,
    OutputSaved,
    Approved,
    Rejected,
    Entered,
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HistoryAction::Started => "started",
            HistoryAction::OutputSaved => "output_saved",
            HistoryAction::Approved => "approved",
            HistoryAction::Rejected => "rejected",
            HistoryAction::Entered => "entered",
        };
        write!(f, "{}", name)
    }
}

/// One append-only audit event. Never mutated or reordered; used for
/// audit/debugging, not for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub phase: Phase,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The authoritative state of one pipeline run.
///
/// The in-memory copy is owned exclusively by the controller for its
/// process lifetime, but the on-disk copy is a shared resource also
/// written by the autonomous worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Minted fresh on start and on reset; ties history to one run.
    pub run_id: Uuid,
    pub current_phase: Phase,
    /// Set once at pipeline start, immutable until reset. Absent while idle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    /// One entry per agent that has completed its stage at least once.
    /// Keys only gain; a retried agent's entry is overwritten, never removed.
    #[serde(default)]
    pub outputs: BTreeMap<AgentId, String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PipelineState {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            current_phase: Phase::Idle,
            task_description: None,
            outputs: BTreeMap::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl PipelineState {
    /// Append a history entry. History only ever grows.
    pub fn record(&mut self, phase: Phase, action: HistoryAction, detail: Option<String>) {
        self.history.push(HistoryEntry {
            phase,
            action,
            timestamp: Utc::now(),
            detail,
        });
    }

    /// Record `content` as `agent`'s output and advance to its review phase.
    ///
    /// This is the single transition rule behind both the controller's
    /// `save_output` and the worker surface's `submit`: both processes must
    /// produce the same post-state for the same input, so the rule lives
    /// here once. The caller is responsible for persisting the output blob
    /// and the record afterwards.
    pub fn apply_output(&mut self, agent: AgentId, content: &str) {
        self.outputs.insert(agent, content.to_string());
        self.record(
            self.current_phase,
            HistoryAction::OutputSaved,
            Some(agent.to_string()),
        );

        let review = agent.review_phase();
        self.current_phase = review;
        self.record(review, HistoryAction::Entered, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle_and_empty() {
        let state = PipelineState::default();
        assert_eq!(state.current_phase, Phase::Idle);
        assert!(state.task_description.is_none());
        assert!(state.outputs.is_empty());
        assert!(state.history.is_empty());
        assert_eq!(state.created_at, state.updated_at);
    }

    #[test]
    fn test_record_appends_in_order() {
        let mut state = PipelineState::default();
        state.record(Phase::Planning, HistoryAction::Started, None);
        state.record(Phase::Planning, HistoryAction::OutputSaved, Some("planner".into()));

        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].action, HistoryAction::Started);
        assert_eq!(state.history[1].action, HistoryAction::OutputSaved);
        assert_eq!(state.history[1].detail.as_deref(), Some("planner"));
    }

    #[test]
    fn test_apply_output_records_and_advances_to_review() {
        let mut state = PipelineState::default();
        state.current_phase = Phase::Planning;

        state.apply_output(AgentId::Planner, "the plan");

        assert_eq!(state.current_phase, Phase::PlanReview);
        assert_eq!(state.outputs.get(&AgentId::Planner).unwrap(), "the plan");
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].phase, Phase::Planning);
        assert_eq!(state.history[0].action, HistoryAction::OutputSaved);
        assert_eq!(state.history[1].phase, Phase::PlanReview);
        assert_eq!(state.history[1].action, HistoryAction::Entered);
    }

    #[test]
    fn test_apply_output_from_testing_is_terminal() {
        let mut state = PipelineState::default();
        state.current_phase = Phase::Testing;

        state.apply_output(AgentId::Test, "all green");

        assert_eq!(state.current_phase, Phase::Completed);
        assert_eq!(state.outputs.get(&AgentId::Test).unwrap(), "all green");
    }

    #[test]
    fn test_apply_output_overwrites_on_retry() {
        let mut state = PipelineState::default();
        state.current_phase = Phase::Implementing;
        state.apply_output(AgentId::Implementer, "first attempt");

        // Rejection sends the pipeline back to implementing; the old output
        // stays until the next save overwrites it.
        state.current_phase = Phase::Implementing;
        state.apply_output(AgentId::Implementer, "second attempt");

        assert_eq!(state.outputs.len(), 1);
        assert_eq!(
            state.outputs.get(&AgentId::Implementer).unwrap(),
            "second attempt"
        );
    }

    #[test]
    fn test_state_serialization_round_trip() {
        let mut state = PipelineState::default();
        state.current_phase = Phase::Planning;
        state.task_description = Some("Add auth".into());
        state.record(Phase::Planning, HistoryAction::Started, Some("Add auth".into()));
        state.apply_output(AgentId::Planner, "plan text");

        let json = serde_json::to_string_pretty(&state).unwrap();
        let parsed: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_outputs_serialize_keyed_by_agent_name() {
        let mut state = PipelineState::default();
        state.current_phase = Phase::Planning;
        state.apply_output(AgentId::Planner, "plan text");

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""planner":"plan text""#));
    }
}
