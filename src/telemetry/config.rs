use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use super::error::ConfigError;

/// Connection settings for the PostgREST endpoint.
#[derive(Deserialize, Clone)]
pub struct UpdaterConfig {
    /// Project base URL, e.g. `https://<ref>.supabase.co`.
    pub supabase_url: String,
    pub supabase_key: String,
}

// The key is a bearer credential; keep it out of logs.
impl std::fmt::Debug for UpdaterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .finish()
    }
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialUpdaterConfig {
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
}

impl PartialUpdaterConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl UpdaterConfig {
    /// Loads `.env`, then the optional TOML file, then `SUPABASE_URL` /
    /// `SUPABASE_KEY` from the environment. Environment wins over file.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) => {
                let path = Path::new(path_str);
                info!(path = %path.display(), "Loading config file.");
                PartialUpdaterConfig::from_file(path)?
            }
            None => PartialUpdaterConfig::default(),
        };

        let env_config: PartialUpdaterConfig = envy::from_env::<PartialUpdaterConfig>()
            .map_err(|e| ConfigError::Environment(e.to_string()))?;

        Self::from_layers(file_config, env_config)
    }

    pub fn from_layers(
        file_config: PartialUpdaterConfig,
        env_config: PartialUpdaterConfig,
    ) -> Result<Self, ConfigError> {
        let supabase_url = env_config
            .supabase_url
            .or(file_config.supabase_url)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let supabase_key = env_config
            .supabase_key
            .or(file_config.supabase_key)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SUPABASE_KEY"))?;

        Ok(UpdaterConfig {
            supabase_url: supabase_url.trim().trim_end_matches('/').to_string(),
            supabase_key: supabase_key.trim().to_string(),
        })
    }
}
