//! Pipeline state machine: the persisted record and its controller.

mod controller;
mod state;

pub use controller::PipelineController;
pub use state::{HistoryAction, HistoryEntry, PipelineState};
