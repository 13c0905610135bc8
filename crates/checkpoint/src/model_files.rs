//! Checkpoint file discovery
//!
//! Checkpoint files carry their training iteration in the name, e.g.
//! `model.ckpt-1500` with an optional `model.ckpt-1500.index` companion.

use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

use experiment_core::{CheckpointIndex, Error, Iteration, Result, ToolConfig};
use regex::Regex;
use tracing::{debug, instrument};

/// Extract the iteration number from a checkpoint file name.
///
/// The iteration is the text between the last `-` and the first `.` after it.
pub fn extract_itr_from_modelfile(path: impl AsRef<Path>) -> Result<Iteration> {
    let text = path.as_ref().to_string_lossy();
    let (_, tail) = text
        .rsplit_once('-')
        .ok_or_else(|| Error::parse(&*text, "no '-' before the iteration number"))?;
    let segment = tail.split('.').next().unwrap_or_default();

    segment
        .parse::<Iteration>()
        .map_err(|_| Error::parse(&*text, format!("'{}' is not an iteration number", segment)))
}

/// Scans run folders for checkpoint files
#[derive(Debug, Clone)]
pub struct CheckpointScanner {
    pattern: Regex,
    index_suffix: String,
}

impl CheckpointScanner {
    /// Build a scanner for the marker and index suffix in `config`
    pub fn new(config: &ToolConfig) -> Result<Self> {
        let pattern = Regex::new(&format!("{}[0-9]+$", regex::escape(&config.checkpoint_marker)))
            .map_err(|e| {
                Error::configuration(format!(
                    "invalid checkpoint marker '{}': {}",
                    config.checkpoint_marker, e
                ))
            })?;
        Ok(Self {
            pattern,
            index_suffix: config.index_suffix.clone(),
        })
    }

    /// Returns the checkpoint name `file_name` refers to, with the index
    /// suffix stripped, or `None` if it is not a checkpoint file
    pub fn checkpoint_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let stripped = file_name
            .strip_suffix(self.index_suffix.as_str())
            .unwrap_or(file_name);
        self.pattern.is_match(stripped).then_some(stripped)
    }

    /// Map iteration number to checkpoint path for every checkpoint in `folder`.
    ///
    /// `x.ckpt-N` and `x.ckpt-N.index` collapse onto the path of the
    /// non-index form. When different names share an iteration the
    /// lexicographically smallest one is kept.
    #[instrument(skip_all, fields(folder = %folder.display()))]
    pub fn find_model_files(&self, folder: &Path) -> Result<CheckpointIndex> {
        let mut names = Vec::new();
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(?name, "Skipping non UTF-8 entry"),
            }
        }
        names.sort();

        let mut index = CheckpointIndex::new();
        for name in &names {
            let Some(checkpoint) = self.checkpoint_name(name) else {
                continue;
            };
            let iteration = extract_itr_from_modelfile(checkpoint)?;
            let path = folder.join(checkpoint);

            match index.entry(iteration) {
                Entry::Vacant(slot) => {
                    slot.insert(path);
                }
                Entry::Occupied(kept) if *kept.get() != path => {
                    debug!(iteration, kept = %kept.get().display(), skipped = %name, "Duplicate iteration");
                }
                Entry::Occupied(_) => {}
            }
        }

        debug!(count = index.len(), "Found checkpoint files");
        Ok(index)
    }

    /// Path of the checkpoint with the highest iteration in `folder`
    pub fn latest(&self, folder: &Path) -> Result<Option<PathBuf>> {
        Ok(self
            .find_model_files(folder)?
            .into_iter()
            .next_back()
            .map(|(_, path)| path))
    }
}

/// [`CheckpointScanner::find_model_files`] with the default naming scheme
pub fn find_model_files(folder: impl AsRef<Path>) -> Result<CheckpointIndex> {
    CheckpointScanner::new(&ToolConfig::default())?.find_model_files(folder.as_ref())
}
