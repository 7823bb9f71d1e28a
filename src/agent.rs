//! Agent roles and their static definitions.
//!
//! Four agents carry the pipeline, one per work phase. The definitions are
//! static configuration — the state machine never mutates them — and the
//! model labels exist only for the prompt generator.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// A logical agent role, responsible for exactly one work phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Planner,
    Implementer,
    Reviewer,
    Test,
}

/// Static definition of one agent: where it works, where its output goes
/// for review, and what upstream output it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentDefinition {
    pub id: AgentId,
    /// Human-readable role title for prompts and status output.
    pub title: &'static str,
    /// The phase in which this agent is active.
    pub work_phase: Phase,
    /// The phase entered once this agent's output is recorded. For the
    /// test agent this is `completed` — its review is the terminal gate.
    pub review_phase: Phase,
    /// Other agents whose output this agent requires as input.
    pub requires: &'static [AgentId],
    /// Default model label. Opaque to the state machine.
    pub model: &'static str,
}

const PLANNER: AgentDefinition = AgentDefinition {
    id: AgentId::Planner,
    title: "Planner",
    work_phase: Phase::Planning,
    review_phase: Phase::PlanReview,
    requires: &[],
    model: "opus",
};

const IMPLEMENTER: AgentDefinition = AgentDefinition {
    id: AgentId::Implementer,
    title: "Implementer",
    work_phase: Phase::Implementing,
    review_phase: Phase::ImplReview,
    requires: &[AgentId::Planner],
    model: "sonnet",
};

const REVIEWER: AgentDefinition = AgentDefinition {
    id: AgentId::Reviewer,
    title: "Reviewer",
    work_phase: Phase::Reviewing,
    review_phase: Phase::ReviewDone,
    requires: &[AgentId::Planner, AgentId::Implementer],
    model: "opus",
};

const TEST: AgentDefinition = AgentDefinition {
    id: AgentId::Test,
    title: "Test runner",
    work_phase: Phase::Testing,
    review_phase: Phase::Completed,
    requires: &[AgentId::Implementer, AgentId::Reviewer],
    model: "sonnet",
};

impl AgentId {
    /// All agents in pipeline order.
    pub fn all() -> [AgentId; 4] {
        [
            AgentId::Planner,
            AgentId::Implementer,
            AgentId::Reviewer,
            AgentId::Test,
        ]
    }

    /// The static definition for this agent.
    pub fn definition(self) -> &'static AgentDefinition {
        match self {
            AgentId::Planner => &PLANNER,
            AgentId::Implementer => &IMPLEMENTER,
            AgentId::Reviewer => &REVIEWER,
            AgentId::Test => &TEST,
        }
    }

    /// The review phase entered after this agent records output.
    pub fn review_phase(self) -> Phase {
        self.definition().review_phase
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentId::Planner => "planner",
            AgentId::Implementer => "implementer",
            AgentId::Reviewer => "reviewer",
            AgentId::Test => "test",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for AgentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planner" => Ok(AgentId::Planner),
            "implementer" => Ok(AgentId::Implementer),
            "reviewer" => Ok(AgentId::Reviewer),
            "test" => Ok(AgentId::Test),
            _ => anyhow::bail!(
                "Unknown agent '{}'. Valid agents: planner, implementer, reviewer, test",
                s
            ),
        }
    }
}
