//! Phase table for the handoff pipeline.
//!
//! This module provides:
//! - `Phase` — the closed set of pipeline states
//! - The fixed linear approval order and the retry targets for each gate
//! - Predicates distinguishing work, review, and terminal phases
//!
//! The table is pure data: every transition decision the state machine makes
//! resolves through the functions here, so an illegal phase is
//! unrepresentable rather than a string that silently falls through a map.

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

/// One discrete state of the pipeline state machine.
///
/// The pipeline walks a fixed linear order, with a human gate after every
/// work phase:
///
/// ```text
/// idle → planning → plan_review → implementing → impl_review
///      → reviewing → review_done → testing → completed
/// ```
///
/// `testing` has no separate review phase: the test agent's output
/// transitions straight to `completed`, and approve/reject apply to
/// `testing` itself as if it were a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Planning,
    PlanReview,
    Implementing,
    ImplReview,
    Reviewing,
    ReviewDone,
    Testing,
    Completed,
}

/// The fixed linear order traversed by approvals. `idle` is not part of the
/// order; it is only ever left through `start`.
const APPROVAL_ORDER: [Phase; 8] = [
    Phase::Planning,
    Phase::PlanReview,
    Phase::Implementing,
    Phase::ImplReview,
    Phase::Reviewing,
    Phase::ReviewDone,
    Phase::Testing,
    Phase::Completed,
];

impl Phase {
    /// The agent responsible for this phase, if it is a work phase.
    /// Review, idle, and terminal phases have no active agent.
    pub fn active_agent(self) -> Option<AgentId> {
        match self {
            Phase::Planning => Some(AgentId::Planner),
            Phase::Implementing => Some(AgentId::Implementer),
            Phase::Reviewing => Some(AgentId::Reviewer),
            Phase::Testing => Some(AgentId::Test),
            _ => None,
        }
    }

    /// Whether an agent is actively responsible for this phase.
    pub fn is_work(self) -> bool {
        self.active_agent().is_some()
    }

    /// Whether this phase awaits a human accept/reject decision.
    ///
    /// `testing` is included: its review is folded into the phase itself,
    /// so approve/reject apply there directly.
    pub fn awaits_decision(self) -> bool {
        matches!(
            self,
            Phase::PlanReview | Phase::ImplReview | Phase::ReviewDone | Phase::Testing
        )
    }

    /// The phase immediately following this one in the linear order.
    ///
    /// Returns `completed` when this phase is last or not part of the
    /// order, so approval from any edge of the table lands terminal rather
    /// than wrapping.
    pub fn next_after_approval(self) -> Phase {
        APPROVAL_ORDER
            .iter()
            .position(|p| *p == self)
            .and_then(|i| APPROVAL_ORDER.get(i + 1))
            .copied()
            .unwrap_or(Phase::Completed)
    }

    /// Where a rejection at this gate sends the pipeline.
    ///
    /// A failed plan review retries planning, but every later gate —
    /// `impl_review`, `review_done`, and `testing` — retries *implementing*.
    /// Review and test are trusted as deterministic re-evaluations; the
    /// code under them is what changes. Non-gate phases map to themselves.
    pub fn retry_target(self) -> Phase {
        match self {
            Phase::PlanReview => Phase::Planning,
            Phase::ImplReview => Phase::Implementing,
            Phase::ReviewDone => Phase::Implementing,
            Phase::Testing => Phase::Implementing,
            other => other,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Planning => "planning",
            Phase::PlanReview => "plan_review",
            Phase::Implementing => "implementing",
            Phase::ImplReview => "impl_review",
            Phase::Reviewing => "reviewing",
            Phase::ReviewDone => "review_done",
            Phase::Testing => "testing",
            Phase::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(Phase::Idle),
            "planning" => Ok(Phase::Planning),
            "plan_review" => Ok(Phase::PlanReview),
            "implementing" => Ok(Phase::Implementing),
            "impl_review" => Ok(Phase::ImplReview),
            "reviewing" => Ok(Phase::Reviewing),
            "review_done" => Ok(Phase::ReviewDone),
            "testing" => Ok(Phase::Testing),
            "completed" => Ok(Phase::Completed),
            _ => anyhow::bail!("Unknown phase '{}'", s),
        }
    }
}
