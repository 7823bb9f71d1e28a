//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                                          |
//! |------------|-----------------------------------------------------------|
//! | `pipeline` | `Start`, `Status`, `Submit`, `Approve`, `Reject`,         |
//! |            | `History`, `Reset`, `Prompt`                              |
//! | `agent`    | `Agent` (the worker tool surface)                         |
//! | `watch`    | `Watch`                                                   |
//! | `config`   | `Config`                                                  |

pub mod agent;
pub mod config;
pub mod pipeline;
pub mod watch;

pub use agent::cmd_agent;
pub use config::cmd_config;
pub use pipeline::{
    cmd_approve, cmd_history, cmd_prompt, cmd_reject, cmd_reset, cmd_start, cmd_status, cmd_submit,
};
pub use watch::cmd_watch;
