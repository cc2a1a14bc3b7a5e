// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Engine configuration
//!
//! Resolution order: explicit file, then `PROPOSAL_ANALYZER_CONFIG`, then
//! defaults. Environment overrides are applied on top of whichever was loaded.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_ENV: &str = "PROPOSAL_ANALYZER_CONFIG";
pub const TIMEOUT_ENV: &str = "PROPOSAL_ANALYZER_TIMEOUT_MS";
pub const MAX_CONCURRENCY_ENV: &str = "PROPOSAL_ANALYZER_MAX_CONCURRENCY";
pub const LOG_ENV: &str = "PROPOSAL_ANALYZER_LOG";

const DEFAULT_ANALYZER_TIMEOUT_MS: u64 = 60_000;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                key: "log_format".to_string(),
                value: other.to_string(),
                reason: "expected 'pretty' or 'json'".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline for a single analyzer invocation, in milliseconds
    pub analyzer_timeout_ms: u64,

    /// Upper bound on analyzers running at once; unbounded when unset
    pub max_concurrency: Option<usize>,

    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout_ms: DEFAULT_ANALYZER_TIMEOUT_MS,
            max_concurrency: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl EngineConfig {
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }

    /// Rounds up to whole milliseconds, never below 1 ms
    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.analyzer_timeout_ms = u64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Loads the effective configuration from the process environment
    pub fn resolve(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::resolve_with(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::resolve`] with an injectable variable lookup
    pub fn resolve_with<F>(config_path: Option<PathBuf>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = if let Some(path) = config_path {
            Self::load_from_file(path)?
        } else if let Some(path) = lookup(CONFIG_ENV) {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        config.apply_overrides(lookup)
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.analyzer_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: TIMEOUT_ENV.to_string(),
                value: raw.clone(),
                reason: "expected a whole number of milliseconds".to_string(),
            })?;
        }

        if let Some(raw) = lookup(MAX_CONCURRENCY_ENV) {
            let parsed: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: MAX_CONCURRENCY_ENV.to_string(),
                value: raw.clone(),
                reason: "expected a positive integer".to_string(),
            })?;
            self.max_concurrency = Some(parsed);
        }

        if let Some(level) = lookup(LOG_ENV) {
            self.log_level = level;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analyzer_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "analyzer_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        if self.max_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrency".to_string(),
                value: "0".to_string(),
                reason: "concurrency bound must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::resolve_with(None, lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.analyzer_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_concurrency, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("analyzer_timeout_ms = 250\nlog_format = \"json\"\n").unwrap();
        assert_eq!(config.analyzer_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::resolve_with(None, lookup(&[(TIMEOUT_ENV, "1500"), (MAX_CONCURRENCY_ENV, "4"), (LOG_ENV, "debug")])).unwrap();
        assert_eq!(config.analyzer_timeout_ms, 1500);
        assert_eq!(config.max_concurrency, Some(4));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_env_values_are_rejected() {
        let err = EngineConfig::resolve_with(None, lookup(&[(TIMEOUT_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == TIMEOUT_ENV));

        let err = EngineConfig::resolve_with(None, lookup(&[(MAX_CONCURRENCY_ENV, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_concurrency"));
    }

    #[test]
    fn test_zero_timeout_in_file_is_rejected() {
        assert!(EngineConfig::from_toml_str("analyzer_timeout_ms = 0").is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let err = EngineConfig::resolve_with(Some(PathBuf::from("/nonexistent/analyzer.toml")), lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let config = EngineConfig::default().with_analyzer_timeout(Duration::from_micros(300));
        assert_eq!(config.analyzer_timeout_ms, 1);
        assert!(config.validate().is_ok());

        let config = EngineConfig::default().with_analyzer_timeout(Duration::ZERO);
        assert_eq!(config.analyzer_timeout(), Duration::from_millis(1));

        let config = EngineConfig::default().with_analyzer_timeout(Duration::from_micros(2500));
        assert_eq!(config.analyzer_timeout_ms, 3);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
