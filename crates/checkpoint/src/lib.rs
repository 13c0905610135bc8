//! Checkpoint directory management for training runs
//!
//! Allocates numbered run folders, reconciles flags with each run's flag
//! file, and finds the checkpoint to resume a model from.

pub mod manager;
pub mod model_files;
pub mod session;
pub mod source;

pub use manager::{init_checkpoint, CheckpointDirConfig, CheckpointDirManager};
pub use model_files::{extract_itr_from_modelfile, find_model_files, CheckpointScanner};
pub use session::ExperimentSession;
pub use source::{ConfigCatalog, ConfigSource, JsonConfigSource, Loaded, ResolvedSource};
