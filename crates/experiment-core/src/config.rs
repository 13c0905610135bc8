//! Tool configuration types

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// File-layout and environment conventions used by the run-folder manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Name of the flag file inside each run folder
    pub flag_file_name: String,

    /// Children of the checkpoint root starting with one of these are ignored
    pub reserved_prefixes: Vec<char>,

    /// Marker preceding the iteration number in checkpoint file names
    pub checkpoint_marker: String,

    /// Companion suffix stripped before matching checkpoint names
    pub index_suffix: String,

    /// Flag file key holding the source revision
    pub revision_key: String,

    /// Record the source revision when creating a run folder
    pub record_revision: bool,

    /// Environment variable restricting device visibility
    pub device_env_var: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            flag_file_name: "flags.json".to_string(),
            reserved_prefixes: vec!['_', '.'],
            checkpoint_marker: ".ckpt-".to_string(),
            index_suffix: ".index".to_string(),
            revision_key: "git_commit".to_string(),
            record_revision: true,
            device_env_var: "CUDA_VISIBLE_DEVICES".to_string(),
        }
    }
}

impl ToolConfig {
    /// Load overrides from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Returns true if a checkpoint-root child with this name is ignored
    pub fn is_reserved(&self, name: &str) -> bool {
        name.chars()
            .next()
            .is_some_and(|c| self.reserved_prefixes.contains(&c))
    }
}
