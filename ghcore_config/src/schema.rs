use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ghcore_entities::{FieldScope, InitMode};
use ghcore_search::SearchConfig;
use tracing::info;

const CONFIG_DIR: &str = "ghcore";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default = "GitHubConfig::default_api_url")]
    pub api_url: String,
    #[serde(default = "GitHubConfig::default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "GitHubConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "GitHubConfig::default_user_agent")]
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            api_url: Self::default_api_url(),
            graphql_url: Self::default_graphql_url(),
            timeout_secs: Self::default_timeout_secs(),
            user_agent: Self::default_user_agent(),
        }
    }
}

impl GitHubConfig {
    fn default_api_url() -> String {
        "https://api.github.com".to_string()
    }

    fn default_graphql_url() -> String {
        "https://api.github.com/graphql".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }

    fn default_user_agent() -> String {
        format!("ghcore/{}", env!("CARGO_PKG_VERSION"))
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// No event-log store is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "DatabaseConfig::default_table")]
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: Self::default_table(),
        }
    }
}

impl DatabaseConfig {
    fn default_table() -> String {
        "opensource.events".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// Entries kept by the result cache; 0 disables caching.
    #[serde(default = "SearchSettings::default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "SearchSettings::default_api_commit_fallback")]
    pub api_commit_fallback: bool,
    #[serde(default)]
    pub init_mode: InitMode,
    #[serde(default)]
    pub include_value_fields: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            cache_capacity: Self::default_cache_capacity(),
            api_commit_fallback: Self::default_api_commit_fallback(),
            init_mode: InitMode::default(),
            include_value_fields: false,
        }
    }
}

impl SearchSettings {
    const fn default_cache_capacity() -> usize {
        4096
    }

    const fn default_api_commit_fallback() -> bool {
        true
    }

    #[must_use]
    pub const fn search_config(&self) -> SearchConfig {
        SearchConfig {
            init_mode: self.init_mode,
            field_scope: if self.include_value_fields {
                FieldScope::IdentifyingAndValue
            } else {
                FieldScope::Identifying
            },
            api_commit_fallback: self.api_commit_fallback,
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "github": {
    "tokens": ["your-github-token-here"],
    "api_url": "https://api.github.com",
    "graphql_url": "https://api.github.com/graphql",
    "timeout_secs": 30
  },
  "database": {
    "table": "opensource.events"
  },
  "search": {
    "cache_capacity": 4096,
    "api_commit_fallback": true,
    "init_mode": "build_id",
    "include_value_fields": false
  }
}"#;

impl Config {
    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'ghcore init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Write the config template under `~/ghcore`.
    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        Self::create_config_in(&config_dir)
    }

    /// Write the config template into `dir`, refusing to overwrite.
    pub fn create_config_in(dir: &Path) -> anyhow::Result<PathBuf> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;
        info!("Created config file at: {}", config_path.display());
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ghcore-config-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::create_dir_all(&dir);
        dir
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Empty object is valid config")]
    fn missing_sections_take_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parses");
        assert_eq!(config, Config::default());
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.timeout(), Duration::from_secs(30));
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.table, "opensource.events");
        assert_eq!(config.search.cache_capacity, 4096);
        assert!(config.search.api_commit_fallback);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Literal config is valid")]
    fn search_settings_map_to_search_config() {
        let config: Config = serde_json::from_str(
            r#"{"search": {"init_mode": "build_all_fields", "include_value_fields": true, "api_commit_fallback": false}}"#,
        )
        .expect("parses");
        let search = config.search.search_config();
        assert_eq!(search.init_mode, InitMode::BuildAllFields);
        assert_eq!(search.field_scope, FieldScope::IdentifyingAndValue);
        assert!(!search.api_commit_fallback);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Scratch directory is writable")]
    fn template_loads_and_is_not_overwritten() {
        let dir = scratch_dir("template");
        let path = Config::create_config_in(&dir).expect("template written");

        let config = Config::load_from(&path).expect("template parses");
        assert_eq!(config.github.tokens, vec!["your-github-token-here".to_string()]);
        assert_eq!(config.search.init_mode, InitMode::BuildId);

        assert!(Config::create_config_in(&dir).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
