//! Optional per-project configuration, read from `.backspec/config.toml`.
//!
//! Everything here has a working default; a missing file is not an error.

use crate::core::document::STATE_DIR;
use crate::core::error::BackspecError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "config.toml";

/// Region used by `init` when neither flag nor config provides one.
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Default region for freshly initialized documents.
    pub region: Option<String>,
    /// When true, new tables are created with `dynamicPrefix: false` and the
    /// provisioning side uses their names verbatim.
    pub suppress_table_prefix: bool,
}

impl ProjectConfig {
    pub fn load(project_dir: &Path) -> Result<ProjectConfig, BackspecError> {
        let path = project_dir.join(STATE_DIR).join(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(ProjectConfig::default());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn default_region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}
