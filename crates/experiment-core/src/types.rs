//! Core type definitions shared across the experiment crates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Run folder number (folder names are `1`, `2`, ...)
pub type RunNumber = u64;

/// Training iteration embedded in a checkpoint file name
pub type Iteration = u64;

/// A single flag value as persisted in the flag file
pub type FlagValue = serde_json::Value;

/// Flat mapping of flag name to value; sorted so that serialization and
/// display are stable
pub type FlagSet = BTreeMap<String, FlagValue>;

/// Checkpoint files of one run folder, keyed by iteration
pub type CheckpointIndex = BTreeMap<Iteration, PathBuf>;

/// A selected or freshly allocated run folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFolder {
    /// Folder path (`<root>/<number>`)
    pub path: PathBuf,

    /// Folder number
    pub number: RunNumber,

    /// True if this folder was selected for resuming rather than created
    pub resumed: bool,

    /// Checkpoint to resume the model from, if any
    pub resume_checkpoint: Option<PathBuf>,

    /// Active flags after parsing (and restoring, on resume)
    pub flags: FlagSet,
}

impl RunFolder {
    /// Folder path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Split into `(run_folder_path, resume_checkpoint)`
    pub fn into_parts(self) -> (PathBuf, Option<PathBuf>) {
        (self.path, self.resume_checkpoint)
    }
}
