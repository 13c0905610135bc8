//! Experiment session: the flag registry, config catalog and pending
//! command-line arguments of one experiment, passed explicitly to every
//! operation that reads or changes flags.

use experiment_core::{
    assert_all_flags_parsed, set_flags_if_notebook, FlagRegistry, FlagSet, Result,
};
use tracing::{debug, info};

use crate::source::{ConfigCatalog, Loaded, ResolvedSource};

/// Flag state of one experiment
pub struct ExperimentSession {
    /// Declared flags and their active values
    pub registry: FlagRegistry,

    /// Built-in config sources
    pub catalog: ConfigCatalog,

    /// Arguments not yet consumed by flag parsing
    pub args: Vec<String>,

    /// Running inside an interactive notebook
    pub is_notebook: bool,
}

impl ExperimentSession {
    pub fn new(catalog: ConfigCatalog, args: Vec<String>) -> Self {
        Self {
            registry: FlagRegistry::new(),
            catalog,
            args,
            is_notebook: false,
        }
    }

    /// Session over the process arguments (without the program name)
    pub fn from_env(catalog: ConfigCatalog) -> Self {
        Self::new(catalog, std::env::args().skip(1).collect())
    }

    /// Resolve a config source and declare its flags
    pub fn declare_source(&mut self, path_or_name: &str) -> Result<ResolvedSource> {
        let resolved = self.catalog.resolve(path_or_name)?;
        info!(source = %resolved.source.name(), "Loading flags from {}", path_or_name);
        self.registry.declare_all(resolved.source.declare_flags())?;
        Ok(resolved)
    }

    /// Parse declared flags out of the pending arguments, keeping only the
    /// unrecognized remainder
    pub fn parse_flags(&mut self) -> Result<FlagSet> {
        let remainder = self.registry.parse_args(&self.args)?;
        debug!(remaining = remainder.len(), "Parsed flags");
        self.args = remainder;
        Ok(self.registry.values())
    }

    /// Fail if any pending argument still looks like a flag
    pub fn assert_all_flags_parsed(&self) -> Result<()> {
        assert_all_flags_parsed(&self.args)
    }

    /// Queue flags for the next parse, but only inside a notebook
    pub fn set_flags_if_notebook(&mut self, flags: &FlagSet) -> bool {
        set_flags_if_notebook(self.is_notebook, &mut self.args, flags)
    }

    /// Resolve a config, parse its flags and build its runtime object
    pub fn load(&mut self, path_or_name: &str) -> Result<Loaded> {
        let resolved = self.declare_source(path_or_name)?;
        let location = resolved
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<built-in>".to_string());
        info!("Loading '{}' from {}", resolved.source.name(), location);

        let flags = self.parse_flags()?;
        resolved.source.load(&flags)
    }
}
