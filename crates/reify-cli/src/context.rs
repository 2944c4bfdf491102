//! Shared command state: configuration, runtime and output

use anyhow::Context as _;
use reify_core::{Catalog, Reifier, ReifyConfig};

use crate::output::{resolve_color_choice, StyledOutput};
use crate::GlobalArgs;

/// `--config` if given, else `reify.toml` in the working directory
pub fn load_config(global: &GlobalArgs) -> anyhow::Result<ReifyConfig> {
    match &global.config {
        Some(path) => ReifyConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => {
            let cwd = std::env::current_dir()?;
            Ok(ReifyConfig::discover(&cwd)?)
        }
    }
}

/// Everything a command needs
pub struct Context {
    pub config: ReifyConfig,
    pub reifier: Reifier,
    pub out: StyledOutput,
}

impl Context {
    /// Fresh runtime with the configured and command-line catalogs installed
    pub fn new(config: ReifyConfig, global: &GlobalArgs) -> anyhow::Result<Self> {
        let reifier = Reifier::new();
        let mut catalog = Catalog::default();
        for path in config.catalog_files().iter().chain(&global.catalogs) {
            let loaded = Catalog::from_file(path)
                .with_context(|| format!("loading catalog {}", path.display()))?;
            tracing::debug!(catalog = %path.display(), types = loaded.types.len(), "loaded catalog");
            catalog.merge(loaded);
        }
        let installed = catalog.install(reifier.types())?;
        tracing::info!(types = installed.len(), "catalog types installed");
        if !reifier.dispatchers().contains(&config.stubs.default_dispatcher) {
            tracing::warn!(
                dispatcher = %config.stubs.default_dispatcher,
                "default dispatcher is not registered"
            );
        }

        Ok(Self {
            config,
            reifier,
            out: StyledOutput::new(resolve_color_choice(global.color.as_deref())),
        })
    }
}
