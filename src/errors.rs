//! Typed error hierarchy for the handoff pipeline.
//!
//! Two top-level enums cover the two subsystems:
//! - `PipelineError` — state-machine guard violations and persistence failures
//! - `StoreError` — durable-store read/write failures
//!
//! Store *read* corruption is deliberately absent: an unreadable pipeline
//! record degrades to the default state inside `PipelineStore::load` and is
//! never surfaced to callers.

use thiserror::Error;

use crate::phase::Phase;

/// Errors from the pipeline state machine.
///
/// Guard violations are fail-fast: the operation makes no mutation, appends
/// no history, and persists nothing. Callers are expected to consult the
/// `can_*` predicates first, but the guards hold either way.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot {action} while the pipeline is in the {phase} phase")]
    InvalidTransition { phase: Phase, action: &'static str },

    #[error("no agent is active in the {phase} phase")]
    NoActiveAgent { phase: Phase },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the persisted store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Unwritable {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    ClearFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode pipeline record: {0}")]
    Encode(#[from] serde_json::Error),
}
