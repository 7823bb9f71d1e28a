//! The pipeline state machine.
//!
//! The controller owns the in-memory state, applies transitions, enforces
//! legality, appends history, persists after every mutation, and notifies
//! registered observers. Guards are enforced inside every operation — the
//! `can_*` predicates exist for callers to decide what to offer, never as a
//! substitute for the guard.

use std::path::Path;

use tracing::debug;

use crate::agent::AgentId;
use crate::errors::{PipelineError, StoreError};
use crate::events::{Observer, PipelineEvent};
use crate::phase::Phase;
use crate::pipeline::state::{HistoryAction, PipelineState};
use crate::store::PipelineStore;

/// Placeholder recorded when a gate is rejected without feedback.
const NO_FEEDBACK: &str = "(no feedback given)";

pub struct PipelineController {
    store: PipelineStore,
    state: PipelineState,
    observers: Vec<Observer>,
}

impl PipelineController {
    /// Open the controller over a workspace, loading whatever state is
    /// persisted (or the default state if none is).
    pub fn open(workspace: &Path) -> Self {
        let store = PipelineStore::new(workspace);
        let state = store.load();
        Self {
            store,
            state,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    /// Register an observer. The controller is the sole owner of its
    /// subscriber list; observers are invoked synchronously after each
    /// mutation has persisted.
    pub fn subscribe(&mut self, observer: impl Fn(&PipelineEvent) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&self, event: PipelineEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }

    // =========================================
    // Query helpers
    // =========================================

    pub fn can_start(&self) -> bool {
        matches!(self.state.current_phase, Phase::Idle | Phase::Completed)
    }

    pub fn can_approve(&self) -> bool {
        self.state.current_phase.awaits_decision()
    }

    pub fn can_reject(&self) -> bool {
        self.can_approve()
    }

    pub fn is_agent_active(&self) -> bool {
        self.state.current_phase.is_work()
    }

    pub fn active_agent(&self) -> Option<AgentId> {
        self.state.current_phase.active_agent()
    }

    // =========================================
    // Mutating operations
    // =========================================

    /// Begin a new pipeline run. Legal only from `idle` or `completed`.
    pub fn start(&mut self, task_description: &str) -> Result<(), PipelineError> {
        if !self.can_start() {
            return Err(PipelineError::InvalidTransition {
                phase: self.state.current_phase,
                action: "start",
            });
        }

        let mut state = PipelineState::default();
        state.task_description = Some(task_description.to_string());
        state.current_phase = Phase::Planning;
        state.record(
            Phase::Planning,
            HistoryAction::Started,
            Some(task_description.to_string()),
        );
        self.state = state;
        self.persist()?;

        debug!(task = task_description, "pipeline started");
        self.emit(PipelineEvent::phase_changed(Phase::Planning));
        Ok(())
    }

    /// Record the active agent's output and advance to its review phase.
    /// Legal only while a work phase is active.
    pub fn save_output(&mut self, content: &str) -> Result<(), PipelineError> {
        let Some(agent) = self.state.current_phase.active_agent() else {
            return Err(PipelineError::NoActiveAgent {
                phase: self.state.current_phase,
            });
        };

        // Blob first: the standalone file is the worker integration point
        // and must exist whenever the record claims the output does.
        self.store.save_output(agent, content)?;
        self.state.apply_output(agent, content);
        self.persist()?;

        debug!(%agent, phase = %self.state.current_phase, "output recorded");
        self.emit(PipelineEvent::OutputSaved { agent });
        self.emit(PipelineEvent::phase_changed(self.state.current_phase));
        Ok(())
    }

    /// Accept the gated output and advance along the linear order.
    /// Legal only at a review gate (or `testing`, whose gate is itself).
    pub fn approve(&mut self) -> Result<(), PipelineError> {
        if !self.can_approve() {
            return Err(PipelineError::InvalidTransition {
                phase: self.state.current_phase,
                action: "approve",
            });
        }

        let from = self.state.current_phase;
        let next = from.next_after_approval();
        self.state.record(from, HistoryAction::Approved, None);
        self.state.current_phase = next;
        self.state.record(next, HistoryAction::Entered, None);
        self.persist()?;

        debug!(from = %from, to = %next, "gate approved");
        self.emit(PipelineEvent::phase_changed(next));
        Ok(())
    }

    /// Reject the gated output and return to the retry target. The retried
    /// agent's previous output is kept until its next save overwrites it.
    pub fn reject(&mut self, feedback: Option<&str>) -> Result<(), PipelineError> {
        if !self.can_reject() {
            return Err(PipelineError::InvalidTransition {
                phase: self.state.current_phase,
                action: "reject",
            });
        }

        let from = self.state.current_phase;
        let target = from.retry_target();
        let detail = feedback
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(NO_FEEDBACK)
            .to_string();
        self.state.record(from, HistoryAction::Rejected, Some(detail));
        self.state.current_phase = target;
        self.state.record(target, HistoryAction::Entered, None);
        self.persist()?;

        debug!(from = %from, to = %target, "gate rejected");
        self.emit(PipelineEvent::phase_changed(target));
        Ok(())
    }

    /// Delete every persisted artifact and return to the default state.
    /// Unconditionally legal.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        self.store.clear()?;
        self.state = PipelineState::default();
        self.persist()?;

        debug!("pipeline reset");
        self.emit(PipelineEvent::PipelineReset);
        self.emit(PipelineEvent::phase_changed(Phase::Idle));
        Ok(())
    }

    /// Replace in-memory state with whatever is persisted and re-announce.
    ///
    /// This is the sole mechanism for observing writes made by the worker
    /// process. Any unpersisted in-memory state is discarded — there should
    /// be none, since every mutating operation persists before returning.
    pub fn reload(&mut self) {
        self.state = self.store.load();
        self.emit(PipelineEvent::phase_changed(self.state.current_phase));
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.store.save(&mut self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn make_controller() -> (PipelineController, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        (PipelineController::open(dir.path()), dir)
    }

    /// Subscribe a recording observer and return the shared event log.
    fn record_events(controller: &mut PipelineController) -> Arc<Mutex<Vec<PipelineEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        controller.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    // =========================================
    // start
    // =========================================

    #[test]
    fn test_start_from_idle_enters_planning() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();

        assert_eq!(controller.state().current_phase, Phase::Planning);
        assert_eq!(
            controller.state().task_description.as_deref(),
            Some("Add auth")
        );
        assert_eq!(controller.active_agent(), Some(AgentId::Planner));
    }

    #[test]
    fn test_start_illegal_mid_pipeline() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();

        let err = controller.start("Something else").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                phase: Phase::Planning,
                action: "start"
            }
        ));
        // guard failure made no mutation
        assert_eq!(
            controller.state().task_description.as_deref(),
            Some("Add auth")
        );
    }

    #[test]
    fn test_start_legal_again_after_completion() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        for _ in 0..4 {
            controller.save_output("done").unwrap();
            if controller.can_approve() && controller.state().current_phase != Phase::Completed {
                controller.approve().unwrap();
            }
        }
        assert_eq!(controller.state().current_phase, Phase::Completed);

        controller.start("Next task").unwrap();
        assert_eq!(controller.state().current_phase, Phase::Planning);
        assert!(controller.state().outputs.is_empty());
    }

    #[test]
    fn test_start_mints_a_fresh_run() {
        let (mut controller, _dir) = make_controller();
        controller.start("First").unwrap();
        let first_run = controller.state().run_id;
        controller.reset().unwrap();
        controller.start("Second").unwrap();
        assert_ne!(controller.state().run_id, first_run);
        assert_eq!(controller.state().history.len(), 1);
    }

    // =========================================
    // save_output
    // =========================================

    #[test]
    fn test_save_output_advances_to_review_and_persists_blob() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan text").unwrap();

        assert_eq!(controller.state().current_phase, Phase::PlanReview);
        assert_eq!(
            controller.state().outputs.get(&AgentId::Planner).unwrap(),
            "plan text"
        );
        assert_eq!(
            controller.store().read_output(AgentId::Planner).as_deref(),
            Some("plan text")
        );
    }

    #[test]
    fn test_save_output_without_active_agent_fails() {
        let (mut controller, _dir) = make_controller();
        let err = controller.save_output("text").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NoActiveAgent { phase: Phase::Idle }
        ));

        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();
        let err = controller.save_output("more").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NoActiveAgent {
                phase: Phase::PlanReview
            }
        ));
    }

    #[test]
    fn test_save_output_fires_output_saved_then_phase_changed() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        let events = record_events(&mut controller);

        controller.save_output("plan text").unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            PipelineEvent::OutputSaved {
                agent: AgentId::Planner
            }
        );
        assert_eq!(events[1], PipelineEvent::phase_changed(Phase::PlanReview));
    }

    // =========================================
    // approve / reject
    // =========================================

    #[test]
    fn test_approve_advances_along_the_order() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();

        controller.approve().unwrap();
        assert_eq!(controller.state().current_phase, Phase::Implementing);
        assert_eq!(controller.active_agent(), Some(AgentId::Implementer));
    }

    #[test]
    fn test_approve_illegal_outside_gates() {
        let (mut controller, _dir) = make_controller();
        let err = controller.approve().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));

        controller.start("Add auth").unwrap();
        let err = controller.approve().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                phase: Phase::Planning,
                action: "approve"
            }
        ));
    }

    #[test]
    fn test_reject_returns_to_retry_target_and_keeps_output() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();
        controller.approve().unwrap();
        controller.save_output("impl v1").unwrap();
        assert_eq!(controller.state().current_phase, Phase::ImplReview);

        controller.reject(Some("needs refactor")).unwrap();

        assert_eq!(controller.state().current_phase, Phase::Implementing);
        // prior output retained until the next save overwrites it
        assert_eq!(
            controller
                .state()
                .outputs
                .get(&AgentId::Implementer)
                .unwrap(),
            "impl v1"
        );
        let rejected = controller
            .state()
            .history
            .iter()
            .rev()
            .find(|e| e.action == HistoryAction::Rejected)
            .unwrap();
        assert_eq!(rejected.detail.as_deref(), Some("needs refactor"));
    }

    #[test]
    fn test_reject_without_feedback_records_placeholder() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();
        controller.reject(None).unwrap();

        let rejected = controller
            .state()
            .history
            .iter()
            .rev()
            .find(|e| e.action == HistoryAction::Rejected)
            .unwrap();
        assert_eq!(rejected.detail.as_deref(), Some(NO_FEEDBACK));
        assert_eq!(controller.state().current_phase, Phase::Planning);
    }

    #[test]
    fn test_reject_lands_exactly_on_retry_target() {
        // Walking each gate: reject must land on precisely what the phase
        // table says, with no divergence between the two paths.
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();

        controller.save_output("plan").unwrap();
        let gate = controller.state().current_phase;
        controller.reject(None).unwrap();
        assert_eq!(controller.state().current_phase, gate.retry_target());

        controller.save_output("plan v2").unwrap();
        controller.approve().unwrap();
        controller.save_output("impl").unwrap();
        let gate = controller.state().current_phase;
        controller.reject(None).unwrap();
        assert_eq!(controller.state().current_phase, gate.retry_target());
    }

    #[test]
    fn test_testing_gate_rejection_retries_implementing() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();
        controller.approve().unwrap();
        controller.save_output("impl").unwrap();
        controller.approve().unwrap();
        controller.save_output("review notes").unwrap();
        controller.approve().unwrap();
        assert_eq!(controller.state().current_phase, Phase::Testing);

        controller.reject(Some("3 failures")).unwrap();
        assert_eq!(controller.state().current_phase, Phase::Implementing);
    }

    // =========================================
    // Full scenario walks
    // =========================================

    #[test]
    fn test_scenario_full_walk_with_illegal_probes() {
        let (mut controller, _dir) = make_controller();

        controller.start("Add auth").unwrap();
        assert_eq!(controller.state().current_phase, Phase::Planning);

        controller.save_output("plan text").unwrap();
        assert_eq!(controller.state().current_phase, Phase::PlanReview);
        assert_eq!(
            controller.state().outputs.get(&AgentId::Planner).unwrap(),
            "plan text"
        );

        controller.approve().unwrap();
        assert_eq!(controller.state().current_phase, Phase::Implementing);

        // implementing is not a gate: reject is illegal here
        let err = controller.reject(Some("needs refactor")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));

        controller.save_output("impl text").unwrap();
        controller.reject(Some("needs refactor")).unwrap();
        assert_eq!(controller.state().current_phase, Phase::Implementing);
        assert_eq!(
            controller
                .state()
                .outputs
                .get(&AgentId::Implementer)
                .unwrap(),
            "impl text"
        );
    }

    #[test]
    fn test_scenario_testing_save_output_completes() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();
        controller.approve().unwrap();
        controller.save_output("impl").unwrap();
        controller.approve().unwrap();
        controller.save_output("review").unwrap();
        controller.approve().unwrap();
        assert_eq!(controller.state().current_phase, Phase::Testing);

        controller.save_output("all green").unwrap();
        assert_eq!(controller.state().current_phase, Phase::Completed);

        // completed is terminal: approve fails, start succeeds
        let err = controller.approve().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
        controller.start("Next feature").unwrap();
        assert_eq!(controller.state().current_phase, Phase::Planning);
    }

    // =========================================
    // reset / reload
    // =========================================

    #[test]
    fn test_reset_clears_everything_regardless_of_progress() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();
        controller.approve().unwrap();
        controller.save_output("impl").unwrap();

        controller.reset().unwrap();

        assert_eq!(controller.state().current_phase, Phase::Idle);
        assert!(controller.state().outputs.is_empty());
        assert!(controller.state().history.is_empty());
        assert!(controller.state().task_description.is_none());
        assert!(controller.store().read_output(AgentId::Planner).is_none());
    }

    #[test]
    fn test_reset_fires_pipeline_reset_then_phase_changed() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        let events = record_events(&mut controller);

        controller.reset().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], PipelineEvent::PipelineReset);
        assert_eq!(events[1], PipelineEvent::phase_changed(Phase::Idle));
    }

    #[test]
    fn test_reload_observes_external_write() {
        let dir = tempdir().unwrap();
        let mut controller = PipelineController::open(dir.path());
        controller.start("Add auth").unwrap();

        // a second process writes the store directly
        let other_store = PipelineStore::new(dir.path());
        let mut external = other_store.load();
        external.apply_output(AgentId::Planner, "external plan");
        other_store.save(&mut external).unwrap();

        assert_eq!(controller.state().current_phase, Phase::Planning);
        controller.reload();
        assert_eq!(controller.state().current_phase, Phase::PlanReview);
        assert_eq!(
            controller.state().outputs.get(&AgentId::Planner).unwrap(),
            "external plan"
        );
    }

    #[test]
    fn test_reload_is_idempotent_without_external_writes() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        controller.save_output("plan").unwrap();

        controller.reload();
        let first = controller.state().clone();
        controller.reload();
        assert_eq!(controller.state(), &first);
    }

    #[test]
    fn test_reload_announces_current_phase() {
        let (mut controller, _dir) = make_controller();
        controller.start("Add auth").unwrap();
        let events = record_events(&mut controller);

        controller.reload();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], PipelineEvent::phase_changed(Phase::Planning));
    }
}
