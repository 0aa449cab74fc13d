use crate::debounce::DEFAULT_REVEAL_DELAY;
use crate::diff::DEFAULT_ADD_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub config_version: u32,
    pub base_url: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_store: Option<String>,
    pub add_limit: usize,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: 1,
            base_url: "http://127.0.0.1:8000".to_string(),
            user_id: String::new(),
            default_store: None,
            add_limit: DEFAULT_ADD_LIMIT,
            search_debounce_ms: DEFAULT_REVEAL_DELAY.as_millis() as u64,
            request_timeout_secs: 30,
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => config_path()?,
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let parsed = toml::from_str::<AppConfig>(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;

        Ok(parsed)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => config_path()?,
        };
        ensure_parent_dir(&path)?;

        let body = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, body)
            .with_context(|| format!("failed to write config: {}", path.display()))?;

        Ok(path)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_file {
            return Ok(path.clone());
        }
        let base = dirs::data_local_dir().context("could not resolve data directory")?;
        Ok(base.join("curator-tui").join("curator-tui.log"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not resolve config directory")?;
    Ok(base.join("curator-tui").join("config.toml"))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}
