//! The persisted store: durable, shared, lock-free pipeline state.
//!
//! Layout under the workspace:
//!
//! ```text
//! .handoff/
//! ├── pipeline.json    # The structured state record
//! └── outputs/         # One text blob per agent, named by agent id
//!     ├── planner.md
//!     └── ...
//! ```
//!
//! The store is the only channel between the interactive controller process
//! and the autonomous worker process. There is no locking, versioning, or
//! optimistic-concurrency token: racing whole-record saves are
//! last-write-wins, with the later writer silently discarding the earlier
//! writer's structured-record changes. Output blobs are keyed per agent and
//! so escape that loss, but a racing record write can still revert the
//! phase. Accepted: the actors are human-paced.
//!
//! Agent output is durable twice — inside the record's `outputs` map and as
//! a standalone blob. The blob is the integration point for the worker
//! process, which may write it without holding the full record.

use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::agent::AgentId;
use crate::errors::StoreError;
use crate::pipeline::PipelineState;

/// The name of the persisted-store directory inside a workspace.
pub const STORE_DIR: &str = ".handoff";

const RECORD_FILE: &str = "pipeline.json";
const OUTPUTS_DIR: &str = "outputs";

/// Read/write access to one workspace's persisted pipeline area.
#[derive(Debug, Clone)]
pub struct PipelineStore {
    root: PathBuf,
}

impl PipelineStore {
    pub fn new(workspace: &Path) -> Self {
        Self {
            root: workspace.join(STORE_DIR),
        }
    }

    /// The store root (`<workspace>/.handoff`), watched for external writes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self) -> PathBuf {
        self.root.join(RECORD_FILE)
    }

    fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }

    pub fn output_path(&self, agent: AgentId) -> PathBuf {
        self.outputs_dir().join(format!("{}.md", agent))
    }

    /// Create the directory skeleton without touching existing contents.
    pub fn ensure_layout(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.outputs_dir()).map_err(|source| StoreError::Unwritable {
            path: self.outputs_dir(),
            source,
        })
    }

    /// Load the persisted state, or the default state if nothing exists or
    /// the record is unreadable.
    ///
    /// Corruption degrading to a fresh pipeline is the documented data-loss
    /// policy, not an error path: this method never fails.
    pub fn load(&self) -> PipelineState {
        let path = self.record_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return PipelineState::default(),
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "pipeline record unreadable; starting from a fresh pipeline"
                );
                PipelineState::default()
            }
        }
    }

    /// Overwrite the structured record in full, refreshing `updated_at`.
    ///
    /// Whole-record overwrite, never a diff: a concurrent writer's changes
    /// to the record are discarded wholesale (last write wins).
    pub fn save(&self, state: &mut PipelineState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Unwritable {
            path: self.root.clone(),
            source,
        })?;

        state.updated_at = Utc::now();
        let json = serde_json::to_string_pretty(state)?;

        let path = self.record_path();
        fs::write(&path, json).map_err(|source| StoreError::Unwritable { path, source })
    }

    /// Write one agent's output blob, independent of the structured record.
    pub fn save_output(&self, agent: AgentId, content: &str) -> Result<(), StoreError> {
        let dir = self.outputs_dir();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Unwritable {
            path: dir,
            source,
        })?;

        let path = self.output_path(agent);
        fs::write(&path, content).map_err(|source| StoreError::Unwritable { path, source })
    }

    /// Read one agent's output blob, if it has ever been written.
    pub fn read_output(&self, agent: AgentId) -> Option<String> {
        fs::read_to_string(self.output_path(agent)).ok()
    }

    /// Read every recorded output blob.
    pub fn read_all_outputs(&self) -> BTreeMap<AgentId, String> {
        AgentId::all()
            .into_iter()
            .filter_map(|agent| self.read_output(agent).map(|content| (agent, content)))
            .collect()
    }

    /// Remove the entire persisted area and recreate an empty skeleton.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|source| StoreError::ClearFailed {
                path: self.root.clone(),
                source,
            })?;
        }
        self.ensure_layout()
    }
}
