//! End-to-end training simulation test
//!
//! Simulates a training script that:
//! - allocates a run folder and stores its flags
//! - writes checkpoints every few steps and gets interrupted
//! - is restarted with `resume` and continues from the latest checkpoint
//!   with the flags of the original run

use anyhow::Result;
use checkpoint::{
    extract_itr_from_modelfile, CheckpointDirConfig, CheckpointDirManager, ConfigCatalog,
    ExperimentSession,
};
use experiment_core::{format_integer, FlagSet, RunFolder};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Simulates the training loop writing checkpoints into a run folder
struct SimulatedTrainer<'a> {
    run_folder: &'a Path,
    save_every: u64,
}

impl SimulatedTrainer<'_> {
    fn train(&self, from: u64, until: u64) -> Result<()> {
        for step in from + 1..=until {
            if step % self.save_every == 0 {
                let ckpt = self.run_folder.join(format!("model.ckpt-{}", step));
                fs::write(&ckpt, step.to_le_bytes())?;
                fs::write(self.run_folder.join(format!("model.ckpt-{}.index", step)), b"")?;
            }
        }
        Ok(())
    }
}

fn manager(root: &Path) -> Result<CheckpointDirManager> {
    let mut config = CheckpointDirConfig::new(root);
    config.tool.record_revision = false;
    Ok(CheckpointDirManager::new(config)?)
}

fn start(
    root: &Path,
    configs: (&str, &str),
    args: &[&str],
    resume: bool,
) -> Result<(ExperimentSession, RunFolder)> {
    let mut session = ExperimentSession::new(
        ConfigCatalog::new(),
        args.iter().map(|a| a.to_string()).collect(),
    );
    let run = manager(root)?.init_checkpoint(&mut session, configs.0, configs.1, resume)?;
    Ok((session, run))
}

#[test]
fn test_interrupted_training_resumes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data.json");
    let model = temp_dir.path().join("model.json");
    fs::write(&data, r#"{"batch_size": 32}"#)?;
    fs::write(&model, r#"{"learning_rate": 0.1, "max_steps": 2500}"#)?;
    let configs = (data.to_str().unwrap(), model.to_str().unwrap());
    let root = temp_dir.path().join("runs");

    // First launch with a custom learning rate, interrupted at step 1250
    let (_, run) = start(&root, configs, &["--learning_rate=0.05"], false)?;
    assert_eq!(run.number, 1);
    let trainer = SimulatedTrainer {
        run_folder: &run.path,
        save_every: 500,
    };
    trainer.train(0, 1250)?;

    // Relaunch without flags: restored flags and checkpoint win
    let (session, resumed) = start(&root, configs, &[], true)?;
    assert_eq!(resumed.path, run.path);
    let ckpt = resumed.resume_checkpoint.clone().expect("checkpoint to resume from");
    let step = extract_itr_from_modelfile(&ckpt)?;
    assert_eq!(step, 1000);
    assert_eq!(fs::read(&ckpt)?, 1000u64.to_le_bytes());
    assert_eq!(session.registry.get("learning_rate"), Some(&json!(0.05)));

    let max_steps = resumed.flags["max_steps"].as_u64().unwrap();
    trainer.train(step, max_steps)?;

    let (_, finished) = start(&root, configs, &[], true)?;
    let last = finished.resume_checkpoint.unwrap();
    assert_eq!(extract_itr_from_modelfile(&last)?, 2500);
    assert_eq!(format_integer(2500, 3)?, "2 500");

    Ok(())
}

#[test]
fn test_parallel_experiments_in_sequence() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data.json");
    let model = temp_dir.path().join("model.json");
    fs::write(&data, r#"{"seed": 0}"#)?;
    fs::write(&model, r#"{"width": 16}"#)?;
    let configs = (data.to_str().unwrap(), model.to_str().unwrap());
    let root = temp_dir.path().join("runs");

    // A sweep launched one job after the other gets consecutive folders
    for (i, seed) in [3, 1, 4, 1, 5].iter().enumerate() {
        let flag = format!("--seed={}", seed);
        let (_, run) = start(&root, configs, &[flag.as_str()], false)?;
        assert_eq!(run.number, i as u64 + 1);

        let stored: FlagSet = experiment_core::json_load(run.path.join("flags.json"))?;
        assert_eq!(stored["seed"], json!(seed));
    }

    // Scratch folders do not disturb numbering
    fs::create_dir(root.join("_tensorboard"))?;
    let (_, run) = start(&root, configs, &[], false)?;
    assert_eq!(run.number, 6);

    Ok(())
}
