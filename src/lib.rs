//! Human-gated multi-agent pipeline coordinator.
//!
//! Four agents — planner, implementer, reviewer, test — each own one work
//! phase of a fixed linear pipeline, with a human accept/reject gate after
//! every stage. State is persisted to a shared `.handoff/` store that an
//! autonomous worker process writes directly; the controller reconciles
//! through a debounced filesystem watcher.

pub mod agent;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod inactivity;
pub mod phase;
pub mod pipeline;
pub mod prompts;
pub mod store;
pub mod watcher;
pub mod worker;
