//! Change notifications emitted by the pipeline controller.
//!
//! Observers register callbacks on the controller itself; there is no
//! ambient or global emitter. Events are serializable so watch mode can log
//! them as structured lines.

use serde::Serialize;

use crate::agent::AgentId;
use crate::phase::Phase;

/// An event emitted after a controller mutation completes (including its
/// persist). Observers must not re-enter the controller from the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The pipeline entered a new phase (or re-announced its phase after a
    /// reload). `agent` is the newly active agent, if the phase has one.
    PhaseChanged {
        phase: Phase,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent: Option<AgentId>,
    },
    /// An agent's output was recorded durably.
    OutputSaved { agent: AgentId },
    /// The pipeline was reset to its default state.
    PipelineReset,
}

impl PipelineEvent {
    /// Build a `PhaseChanged` for the given phase, deriving the agent.
    pub fn phase_changed(phase: Phase) -> Self {
        PipelineEvent::PhaseChanged {
            phase,
            agent: phase.active_agent(),
        }
    }
}

/// An observer callback registered on the controller.
pub type Observer = Box<dyn Fn(&PipelineEvent) + Send>;
