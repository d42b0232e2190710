//! Command implementations.

mod info;
mod probe;
mod run;
mod validate;
mod xtalk;

pub use info::run_info;
pub use probe::run_probe;
pub use run::run_pipeline;
pub use validate::run_validate;
pub use xtalk::run_xtalk;

use anyhow::{Context, Result};
use contracts::SessionBlueprint;
use std::path::Path;

/// Load and validate a configuration file
pub(crate) fn load_blueprint(path: &Path) -> Result<SessionBlueprint> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
