use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote sentence endpoint. Unset means the bundled offline coach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_url: Option<String>,
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_max_sentence_chars")]
    pub max_sentence_chars: usize,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_oracle_timeout_secs() -> u64 {
    20
}
fn default_history_limit() -> usize {
    5
}
fn default_max_sentence_chars() -> usize {
    200
}
fn default_theme() -> String {
    "terminal-default".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oracle_url: None,
            oracle_timeout_secs: default_oracle_timeout_secs(),
            history_limit: default_history_limit(),
            max_sentence_chars: default_max_sentence_chars(),
            theme: default_theme(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keycoach")
            .join("config.toml")
    }

    /// Clamp numeric fields into their supported ranges and drop a blank URL.
    pub fn validate(&mut self) {
        self.oracle_timeout_secs = self.oracle_timeout_secs.clamp(1, 120);
        self.history_limit = self.history_limit.clamp(2, 10);
        self.max_sentence_chars = self.max_sentence_chars.clamp(150, 200);
        if self
            .oracle_url
            .as_deref()
            .is_some_and(|u| u.trim().is_empty())
        {
            self.oracle_url = None;
        }
        if self.theme.trim().is_empty() {
            self.theme = default_theme();
        }
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}
