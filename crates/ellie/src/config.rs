//! Configuration file support.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/ellie/config.toml`. The
//! `[moves]` section holds the API credential, `[defaults]` holds export
//! parameters applied before the command line ones.

use std::path::{Path, PathBuf};

use moves_client::config::Credentials;
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::plugin::PluginConfig;

const TEMPLATE: &str = r#"# ellie configuration

[moves]
# Create an app at https://dev.moves-app.com/apps and use
# http://localhost:3000/auth as its redirect URI.
client_id = ""
client_secret = ""
redirect_uri = "http://localhost:3000/auth"
access_token = ""
# base_url = "https://api.moves-app.com"

[defaults]
# Export parameters used when the command line does not set them.
# output = "DayOneExport"
# days = 7
# tag = "moves-import"
"#;

/// The `[moves]` section. Environment variables take precedence over each field.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MovesSection {
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
    #[serde(default, alias = "clientSecret")]
    pub client_secret: Option<String>,
    #[serde(default, alias = "redirectUri")]
    pub redirect_uri: Option<String>,
    #[serde(default, alias = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,
}

impl MovesSection {
    fn lookup(&self, env_key: &str) -> Option<String> {
        match env_key {
            "MOVES_CLIENT_ID" => self.client_id.clone(),
            "MOVES_CLIENT_SECRET" => self.client_secret.clone(),
            "MOVES_REDIRECT_URI" => self.redirect_uri.clone(),
            "MOVES_ACCESS_TOKEN" => self.access_token.clone(),
            "MOVES_BASE_URL" => self.base_url.clone(),
            _ => None,
        }
    }
}

/// Application configuration. Unknown sections (`mongoconnection`) are ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub moves: Option<MovesSection>,
    #[serde(default)]
    pub defaults: PluginConfig,
}

impl AppConfig {
    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ellie")
            .join("config.toml")
    }

    /// Load configuration from a specific path. A missing file is a configuration error.
    pub fn load_from(path: &Path) -> ExportResult<Self> {
        if !path.exists() {
            return Err(ExportError::ConfigInvalid(format!(
                "no config file at {path:?}, run `ellie init` first"
            )));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        tracing::info!("loaded config from {:?}", path);
        Ok(config)
    }

    pub fn credentials(&self) -> ExportResult<Credentials> {
        self.credentials_with(|k| std::env::var(k).ok())
    }

    /// Credentials from `env` layered over the `[moves]` section.
    pub fn credentials_with<F>(&self, mut env: F) -> ExportResult<Credentials>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let section = self.moves.as_ref().ok_or_else(|| {
            ExportError::ConfigInvalid("your config file has no [moves] section".into())
        })?;
        Credentials::from_env_with(|k| {
            env(k)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| section.lookup(k))
        })
        .map_err(|e| ExportError::ConfigInvalid(e.to_string()))
    }

    /// Write a commented template to `path`. Never replaces an existing file.
    pub fn write_template(path: &Path) -> ExportResult<()> {
        if path.exists() {
            return Err(ExportError::ConfigInvalid(format!(
                "config file already exists at {path:?}, delete it to recreate"
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, TEMPLATE)?;
        Ok(())
    }
}
