use anyhow::Result;
use checkpoint::{
    find_model_files, init_checkpoint, ConfigCatalog, ConfigSource, ExperimentSession, Loaded,
};
use experiment_core::{json_load, Error, FlagSet, FlagSpec};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Helper to write a data config and a model config as JSON flag defaults
fn write_configs(dir: &Path) -> Result<(String, String)> {
    let data = dir.join("mnist_data.json");
    let model = dir.join("mlp_model.json");
    fs::write(&data, r#"{"batch_size": 32, "dataset": "mnist"}"#)?;
    fs::write(&model, r#"{"hidden": [256, 128], "learning_rate": 0.0001}"#)?;
    Ok((
        data.to_string_lossy().to_string(),
        model.to_string_lossy().to_string(),
    ))
}

fn session(args: &[&str]) -> ExperimentSession {
    ExperimentSession::new(
        ConfigCatalog::new(),
        args.iter().map(|a| a.to_string()).collect(),
    )
}

#[test]
fn test_run_folder_lifecycle() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (data, model) = write_configs(temp_dir.path())?;
    let root = temp_dir.path().join("checkpoints");

    // 1. Empty root: first run is folder 1
    let (path, ckpt) = init_checkpoint(&mut session(&[]), &root, &data, &model, false)?.into_parts();
    assert_eq!(path, root.join("1"));
    assert!(ckpt.is_none());
    assert!(path.join("flags.json").is_file());
    assert!(path.join("mnist_data.json").is_file());
    assert!(path.join("mlp_model.json").is_file());

    // 2. Second fresh run is folder 2
    let (path, ckpt) = init_checkpoint(
        &mut session(&["--batch_size=128"]),
        &root,
        &data,
        &model,
        false,
    )?
    .into_parts();
    assert_eq!(path, root.join("2"));
    assert!(ckpt.is_none());

    // 3. Resume without checkpoints selects folder 2
    let mut resumed = session(&[]);
    let run = init_checkpoint(&mut resumed, &root, &data, &model, true)?;
    assert_eq!(run.path, root.join("2"));
    assert!(run.resume_checkpoint.is_none());
    assert_eq!(resumed.registry.get("batch_size"), Some(&json!(128)));

    // 4. Resume picks the latest checkpoint once the training loop wrote some
    for step in [1000, 5000, 3000] {
        fs::write(root.join("2").join(format!("model.ckpt-{}", step)), b"")?;
        fs::write(root.join("2").join(format!("model.ckpt-{}.index", step)), b"")?;
    }
    let run = init_checkpoint(&mut session(&[]), &root, &data, &model, true)?;
    assert_eq!(
        run.resume_checkpoint,
        Some(root.join("2").join("model.ckpt-5000"))
    );
    assert!(!root.join("3").exists());

    Ok(())
}

#[test]
fn test_flag_file_contents() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (data, model) = write_configs(temp_dir.path())?;
    let root = temp_dir.path().join("checkpoints");

    let run = init_checkpoint(
        &mut session(&["--hidden=[64]", "--dataset", "svhn"]),
        &root,
        &data,
        &model,
        false,
    )?;

    let stored: FlagSet = json_load(run.path.join("flags.json"))?;
    assert_eq!(stored["hidden"], json!([64]));
    assert_eq!(stored["dataset"], json!("svhn"));
    assert_eq!(stored["batch_size"], json!(32));
    if let Some(commit) = stored.get("git_commit") {
        assert!(commit.is_string());
    }

    let text = fs::read_to_string(run.path.join("flags.json"))?;
    assert!(text.starts_with("{\n    \"batch_size\": 32,"));

    Ok(())
}

#[test]
fn test_resume_errors() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (data, model) = write_configs(temp_dir.path())?;
    let root = temp_dir.path().join("checkpoints");

    let err = init_checkpoint(&mut session(&[]), &root, &data, &model, true).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));

    fs::create_dir_all(root.join(".cache"))?;
    let err = init_checkpoint(&mut session(&[]), &root, &data, &model, true).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));

    Ok(())
}

struct Classifier;

impl ConfigSource for Classifier {
    fn name(&self) -> &str {
        "classifier"
    }

    fn declare_flags(&self) -> Vec<FlagSpec> {
        vec![
            FlagSpec::integer("n_classes", 10, "number of output classes"),
            FlagSpec::boolean("batch_norm", false, "use batch normalization"),
        ]
    }

    fn load(&self, flags: &FlagSet) -> experiment_core::Result<Loaded> {
        let n_classes = flags["n_classes"].as_u64().unwrap_or_default();
        Ok(Box::new(n_classes))
    }
}

#[test]
fn test_built_in_source_and_load() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (data, _) = write_configs(temp_dir.path())?;
    let root = temp_dir.path().join("checkpoints");

    let mut catalog = ConfigCatalog::new();
    catalog.register(Classifier);
    let mut session = ExperimentSession::new(
        catalog,
        vec!["--n_classes=100".to_string(), "--batch_norm".to_string()],
    );

    let run = init_checkpoint(&mut session, &root, &data, "models.classifier", false)?;
    assert_eq!(run.flags["n_classes"], json!(100));
    assert_eq!(run.flags["batch_norm"], json!(true));
    // built-in sources have no file to copy
    let copied: Vec<PathBuf> = fs::read_dir(&run.path)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    assert_eq!(copied.len(), 2);

    let loaded = session.load("classifier")?;
    assert_eq!(*loaded.downcast::<u64>().unwrap(), 100);

    Ok(())
}

#[test]
fn test_find_model_files_standalone() -> Result<()> {
    let temp_dir = TempDir::new()?;
    for name in ["a.ckpt-5", "a.ckpt-5.index", "b.ckpt-12", "checkpoint"] {
        fs::write(temp_dir.path().join(name), b"")?;
    }

    let files = find_model_files(temp_dir.path())?;
    assert_eq!(files.keys().copied().collect::<Vec<_>>(), vec![5, 12]);
    assert_eq!(files[&5], temp_dir.path().join("a.ckpt-5"));
    assert_eq!(files[&12], temp_dir.path().join("b.ckpt-12"));

    Ok(())
}
