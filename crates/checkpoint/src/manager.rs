//! Checkpoint directory manager
//!
//! Allocates numbered run folders under a checkpoint root, or selects the
//! latest one when resuming, and reconciles flags with the run's flag file.

use std::fs;
use std::path::{Path, PathBuf};

use experiment_core::{
    git_revision_hash_in, json_load, json_store, merge_override, Error, FlagSet, Result, RunFolder,
    RunNumber, ToolConfig,
};
use tracing::{debug, info, instrument, warn};

use crate::model_files::CheckpointScanner;
use crate::session::ExperimentSession;
use crate::source::ResolvedSource;

/// Checkpoint directory manager configuration
#[derive(Debug, Clone)]
pub struct CheckpointDirConfig {
    /// Checkpoint root holding the numbered run folders
    pub root: PathBuf,

    /// Naming and layout conventions
    pub tool: ToolConfig,

    /// Directory whose repository revision is recorded in new flag files
    pub revision_dir: PathBuf,
}

impl CheckpointDirConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tool: ToolConfig::default(),
            revision_dir: PathBuf::from("."),
        }
    }
}

/// Allocates and selects run folders under one checkpoint root
#[derive(Debug, Clone)]
pub struct CheckpointDirManager {
    config: CheckpointDirConfig,
    scanner: CheckpointScanner,
}

impl CheckpointDirManager {
    pub fn new(config: CheckpointDirConfig) -> Result<Self> {
        let scanner = CheckpointScanner::new(&config.tool)?;
        Ok(Self { config, scanner })
    }

    /// Checkpoint root
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Prepare the run folder for this job.
    ///
    /// Without `resume` a new folder numbered one past the highest existing
    /// run is created, flags are parsed and stored in its flag file, and both
    /// config files are copied next to it. With `resume` the highest
    /// existing folder is selected, its flag file is overlaid on the parsed
    /// flags, and the latest checkpoint in it is reported.
    #[instrument(skip_all, fields(root = %self.config.root.display(), resume = resume))]
    pub fn init_checkpoint(
        &self,
        session: &mut ExperimentSession,
        data_config: &str,
        model_config: &str,
        resume: bool,
    ) -> Result<RunFolder> {
        self.ensure_root(resume)?;

        let existing = self.run_numbers()?;
        let number = match (existing.last(), resume) {
            (Some(&latest), true) => latest,
            (Some(&latest), false) => latest + 1,
            (None, true) => {
                return Err(Error::configuration(format!(
                    "nothing to resume: no runs in checkpoint root '{}'",
                    self.config.root.display()
                )));
            }
            (None, false) => 1,
        };
        let path = self.config.root.join(number.to_string());

        let sources = [
            session.catalog.resolve(model_config)?,
            session.catalog.resolve(data_config)?,
        ];

        for source in &sources {
            info!(source = %source.source.name(), "Loading flags from config");
            session
                .registry
                .declare_all(source.source.declare_flags())?;
        }
        let parsed = session.parse_flags()?;
        session.assert_all_flags_parsed()?;

        if !resume {
            fs::create_dir(&path)?;
            info!(run = number, path = %path.display(), "Created run folder");
        } else {
            info!(run = number, path = %path.display(), "Resuming run folder");
        }

        let flag_path = path.join(&self.config.tool.flag_file_name);
        let (flags, resume_checkpoint) = if resume {
            let restored = self.restore_flags(&flag_path, &path)?;
            let merged = merge_override(parsed, restored);
            session.registry.restore(merged.clone());

            let resume_checkpoint = self.scanner.latest(&path)?;
            match &resume_checkpoint {
                Some(ckpt) => info!(checkpoint = %ckpt.display(), "Resuming from checkpoint"),
                None => warn!(path = %path.display(), "No checkpoint to resume from"),
            }
            (merged, resume_checkpoint)
        } else {
            let flags = self.record_revision(parsed);
            json_store(&flag_path, &flags)?;
            debug!(path = %flag_path.display(), count = flags.len(), "Stored flags");

            self.copy_sources(&sources, &path)?;
            (flags, None)
        };

        Ok(RunFolder {
            path,
            number,
            resumed: resume,
            resume_checkpoint,
            flags,
        })
    }

    /// Run numbers present under the root, ascending
    pub fn run_numbers(&self) -> Result<Vec<RunNumber>> {
        let mut numbers = Vec::new();
        for entry in fs::read_dir(&self.config.root)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if self.config.tool.is_reserved(&name) {
                continue;
            }

            // only canonical names, so `01` or `+1` never alias run 1
            let number = name
                .parse::<RunNumber>()
                .ok()
                .filter(|n| n.to_string() == name)
                .ok_or_else(|| {
                    Error::configuration(format!(
                        "unexpected entry '{}' in checkpoint root '{}'",
                        name,
                        self.config.root.display()
                    ))
                })?;
            numbers.push(number);
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    fn ensure_root(&self, resume: bool) -> Result<()> {
        let root = &self.config.root;
        if !root.exists() {
            if resume {
                return Err(Error::configuration(format!(
                    "cannot resume: root missing, checkpoint dir '{}' doesn't exist",
                    root.display()
                )));
            }
            fs::create_dir_all(root)?;
            debug!(root = %root.display(), "Created checkpoint root");
        } else if !root.is_dir() {
            return Err(Error::configuration(format!(
                "checkpoint dir '{}' is not a directory",
                root.display()
            )));
        }
        Ok(())
    }

    fn restore_flags(&self, flag_path: &Path, run_folder: &Path) -> Result<FlagSet> {
        json_load(flag_path).map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Error::configuration(format!(
                    "cannot resume: run folder '{}' has no flag file '{}'",
                    run_folder.display(),
                    self.config.tool.flag_file_name
                ))
            }
            other => other,
        })
    }

    fn record_revision(&self, mut flags: FlagSet) -> FlagSet {
        if !self.config.tool.record_revision {
            return flags;
        }

        match git_revision_hash_in(&self.config.revision_dir) {
            Ok(hash) => {
                flags.insert(self.config.tool.revision_key.clone(), hash.into());
            }
            Err(e) => debug!(reason = %e, "Not recording source revision"),
        }
        flags
    }

    fn copy_sources(&self, sources: &[ResolvedSource], run_folder: &Path) -> Result<()> {
        for source in sources {
            let Some(src) = &source.file else {
                debug!(source = %source.source.name(), "Built-in config, nothing to copy");
                continue;
            };
            let Some(file_name) = src.file_name() else {
                continue;
            };

            let dst = run_folder.join(file_name);
            fs::copy(src, &dst)?;
            debug!(src = %src.display(), dst = %dst.display(), "Copied config");
        }
        Ok(())
    }
}

/// [`CheckpointDirManager::init_checkpoint`] with the default layout
pub fn init_checkpoint(
    session: &mut ExperimentSession,
    root: impl Into<PathBuf>,
    data_config: &str,
    model_config: &str,
    resume: bool,
) -> Result<RunFolder> {
    CheckpointDirManager::new(CheckpointDirConfig::new(root))?.init_checkpoint(
        session,
        data_config,
        model_config,
        resume,
    )
}
