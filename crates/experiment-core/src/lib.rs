//! Experiment Core - foundation for experiment bookkeeping
//!
//! Provides the error type, shared types, the flag registry, flag file
//! persistence and small helpers used around a training run.

pub mod config;
pub mod device;
pub mod error;
pub mod flags;
pub mod format;
pub mod json;
pub mod revision;
pub mod telemetry;
pub mod types;

pub use config::ToolConfig;
pub use device::set_gpu;
pub use error::{Error, NotAvailable, Result};
pub use flags::{
    assert_all_flags_parsed, merge_override, set_flags, set_flags_if_notebook, FlagKind,
    FlagRegistry, FlagSpec,
};
pub use format::format_integer;
pub use json::{json_load, json_store};
pub use revision::{git_revision_hash, git_revision_hash_in};
pub use types::*;
