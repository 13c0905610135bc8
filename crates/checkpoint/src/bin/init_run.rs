//! Run folder initialization entry point
//!
//! Usage: `init-run <root> <data_config> <model_config> [--resume] [--flag=value ...]`
//!
//! Prints the run folder and the checkpoint to resume from, if any.

use checkpoint::{CheckpointDirConfig, CheckpointDirManager, ConfigCatalog, ExperimentSession};
use experiment_core::telemetry::{init_tracing, DEFAULT_FILTER};
use experiment_core::{format_integer, ToolConfig};

const USAGE: &str =
    "usage: init-run <root> <data_config> <model_config> [--resume] [--tool_config=PATH] [--flag=value ...]";

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(DEFAULT_FILTER);

    let mut positional = Vec::new();
    let mut passthrough = Vec::new();
    let mut resume = false;
    let mut tool_config = None;

    for arg in std::env::args().skip(1) {
        if arg == "--resume" {
            resume = true;
        } else if let Some(path) = arg.strip_prefix("--tool_config=") {
            tool_config = Some(path.to_string());
        } else if positional.len() < 3 && !arg.starts_with("--") {
            positional.push(arg);
        } else {
            passthrough.push(arg);
        }
    }

    let [root, data_config, model_config]: [String; 3] = positional
        .try_into()
        .map_err(|_| USAGE.to_string())?;

    let mut config = CheckpointDirConfig::new(root);
    if let Some(path) = tool_config {
        config.tool = ToolConfig::from_json_file(path)?;
    }

    let manager = CheckpointDirManager::new(config)?;
    let mut session = ExperimentSession::new(ConfigCatalog::new(), passthrough);
    let run = manager.init_checkpoint(&mut session, &data_config, &model_config, resume)?;
    session.registry.print_flags();

    println!("{}", run.path.display());
    match &run.resume_checkpoint {
        Some(ckpt) => {
            let iteration = checkpoint::extract_itr_from_modelfile(ckpt)?;
            tracing::info!(
                "Resuming from iteration {}",
                format_integer(i128::from(iteration), 3)?
            );
            println!("{}", ckpt.display());
        }
        None => tracing::info!("Starting from scratch"),
    }

    Ok(())
}
