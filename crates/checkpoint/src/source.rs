//! Config sources
//!
//! A config source declares the flags a dataset or model needs and can
//! optionally build the runtime object from the parsed flags. Sources are
//! either JSON files of flag defaults or built-in sources registered in a
//! [`ConfigCatalog`] under a name.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use experiment_core::{json_load, Error, FlagKind, FlagSet, FlagSpec, Result};
use tracing::debug;

/// Runtime object built by [`ConfigSource::load`]
pub type Loaded = Box<dyn Any + Send>;

/// A unit of configuration: declares flags, optionally builds an object
pub trait ConfigSource: Send + Sync {
    /// Source name, used in logs and for catalog lookups
    fn name(&self) -> &str;

    /// Flags this source contributes to the registry
    fn declare_flags(&self) -> Vec<FlagSpec>;

    /// File backing this source, copied into new run folders
    fn source_file(&self) -> Option<&Path> {
        None
    }

    /// Build the runtime object (dataset, model, ...) from parsed flags
    fn load(&self, _flags: &FlagSet) -> Result<Loaded> {
        Err(Error::configuration(format!(
            "config '{}' does not provide a load entry point",
            self.name()
        )))
    }
}

/// Config source read from a JSON object of flag defaults.
///
/// Flag kinds are inferred from the default values. Keys starting with `_`
/// are treated as comments.
#[derive(Debug, Clone)]
pub struct JsonConfigSource {
    name: String,
    path: PathBuf,
    specs: Vec<FlagSpec>,
}

impl JsonConfigSource {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults: FlagSet = json_load(path).map_err(|e| match e {
            Error::Serialization(reason) => Error::configuration(format!(
                "config {} is not a JSON object of flag defaults: {}",
                path.display(),
                reason
            )),
            other => other,
        })?;

        let specs = defaults
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, default)| {
                let kind = FlagKind::infer(&default);
                FlagSpec::new(name, kind, default, "")
            })
            .collect();

        Ok(Self {
            name: module_name(&path.to_string_lossy()).to_string(),
            path: path.to_path_buf(),
            specs,
        })
    }
}

impl ConfigSource for JsonConfigSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_flags(&self) -> Vec<FlagSpec> {
        self.specs.clone()
    }

    fn source_file(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// A config source together with the file it was resolved from
#[derive(Clone)]
pub struct ResolvedSource {
    pub source: Arc<dyn ConfigSource>,
    pub file: Option<PathBuf>,
}

impl std::fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSource")
            .field("name", &self.source.name())
            .field("file", &self.file)
            .finish()
    }
}

/// Named collection of built-in config sources
#[derive(Clone, Default)]
pub struct ConfigCatalog {
    sources: BTreeMap<String, Arc<dyn ConfigSource>>,
}

impl ConfigCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own name, replacing any previous one
    pub fn register(&mut self, source: impl ConfigSource + 'static) -> &mut Self {
        let name = source.name().to_string();
        debug!(source = %name, "Registered config source");
        self.sources.insert(name, Arc::new(source));
        self
    }

    /// Registered source names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Resolve a config by file path or by name.
    ///
    /// `.json` paths must exist and are read as flag defaults. Anything else
    /// is looked up in the catalog, first verbatim, then by its module name
    /// (`configs/mnist.rs` and `configs.mnist` both resolve `mnist`).
    pub fn resolve(&self, path_or_name: &str) -> Result<ResolvedSource> {
        let path = Path::new(path_or_name);

        if path_or_name.ends_with(".json") {
            if !path.is_file() {
                return Err(Error::configuration(format!(
                    "File {} does not exist.",
                    path_or_name
                )));
            }
            return Ok(ResolvedSource {
                source: Arc::new(JsonConfigSource::from_file(path)?),
                file: Some(path.to_path_buf()),
            });
        }

        let source = self
            .sources
            .get(path_or_name)
            .or_else(|| self.sources.get(module_name(path_or_name)))
            .cloned()
            .ok_or_else(|| {
                Error::configuration(format!(
                    "no config source named '{}' (known: {})",
                    path_or_name,
                    self.names().collect::<Vec<_>>().join(", ")
                ))
            })?;

        let file = source
            .source_file()
            .map(Path::to_path_buf)
            .or_else(|| path.is_file().then(|| path.to_path_buf()));

        Ok(ResolvedSource { source, file })
    }
}

/// Last component of a path or dotted module name, without extension
fn module_name(path_or_name: &str) -> &str {
    let base = path_or_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path_or_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if is_file_extension(ext) => stem.rsplit('.').next().unwrap_or(stem),
        _ => base.rsplit('.').next().unwrap_or(base),
    }
}

fn is_file_extension(ext: &str) -> bool {
    matches!(ext, "rs" | "json" | "toml" | "yaml" | "yml" | "py")
}
