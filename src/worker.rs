//! Tool surface for the autonomous worker process.
//!
//! The worker runs in its own OS process and never holds an in-process
//! controller: every operation here goes straight to the persisted store.
//! Submitting output applies the identical review-phase transition the
//! controller's `save_output` applies — the rule is shared through
//! `PipelineState::apply_output`, so the two paths cannot drift apart.
//! The interactive process learns about a submission through the
//! synchronization watcher, not from us.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::agent::AgentId;
use crate::errors::PipelineError;
use crate::phase::Phase;
use crate::pipeline::PipelineState;
use crate::store::PipelineStore;

/// Store-backed operations exposed to the worker tool.
pub struct WorkerSurface {
    store: PipelineStore,
}

/// Snapshot handed to the worker when it asks for the task.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub run_id: uuid::Uuid,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_agent: Option<AgentId>,
    pub awaiting_decision: bool,
    /// Agents whose output has been recorded at least once.
    pub outputs_recorded: Vec<AgentId>,
}

impl WorkerSurface {
    pub fn new(workspace: &Path) -> Self {
        Self {
            store: PipelineStore::new(workspace),
        }
    }

    /// Read the task description and pipeline status.
    pub fn status(&self) -> WorkerStatus {
        let state = self.store.load();
        WorkerStatus {
            run_id: state.run_id,
            phase: state.current_phase,
            task_description: state.task_description.clone(),
            active_agent: state.current_phase.active_agent(),
            awaiting_decision: state.current_phase.awaits_decision(),
            outputs_recorded: state.outputs.keys().copied().collect(),
        }
    }

    /// Read one agent's recorded output blob.
    pub fn read_output(&self, agent: AgentId) -> Option<String> {
        self.store.read_output(agent)
    }

    /// Read every recorded output blob.
    pub fn read_all_outputs(&self) -> BTreeMap<AgentId, String> {
        self.store.read_all_outputs()
    }

    /// Record `agent`'s output and advance the pipeline to its review
    /// phase, directly against the store.
    ///
    /// Guards mirror the controller's: the submitting agent must be the
    /// one the current phase makes active. Returns the post-transition
    /// state on success.
    pub fn submit(&self, agent: AgentId, content: &str) -> Result<PipelineState, PipelineError> {
        let mut state = self.store.load();

        match state.current_phase.active_agent() {
            Some(active) if active == agent => {}
            Some(_) => {
                // some other agent's stage is running
                return Err(PipelineError::InvalidTransition {
                    phase: state.current_phase,
                    action: "submit",
                });
            }
            None => {
                return Err(PipelineError::NoActiveAgent {
                    phase: state.current_phase,
                });
            }
        }

        self.store.save_output(agent, content)?;
        state.apply_output(agent, content);
        self.store.save(&mut state)?;
        Ok(state)
    }
}
