use crate::descriptor::PluginSet;
use crate::error::PluginResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Quire configuration file format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base for relative plugin locators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub plugins: PluginSet,

    /// Show entry titles when printing history
    #[serde(default)]
    pub history_titles: bool,
}

impl Config {
    /// Load `quire.config.json` from a directory, or defaults if there is none
    pub fn load(dir: &Path) -> PluginResult<Self> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
    }

    pub fn load_file(path: &Path) -> PluginResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, dir: &Path) -> PluginResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(DEFAULT_CONFIG_NAME), content)?;
        Ok(())
    }

    pub fn base_url(&self) -> PluginResult<Option<Url>> {
        Ok(self.base_url.as_deref().map(Url::parse).transpose()?)
    }
}
