//! Analysis configuration.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::detect::HotspotConfig;
use crate::graph::RetryPolicy;

/// File names looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["vpscan.yaml", ".vpscan.yaml"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hotspots: HotspotConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Glob patterns, relative to the source root, of files to leave out.
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub retry: RetryConfig,
}

/// How long to wait for the graph store before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    20
}

fn default_delay_ms() -> u64 {
    5000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        // serde_yaml reads an empty document as unit, not as a map.
        let blank = content
            .lines()
            .map(str::trim)
            .all(|l| l.is_empty() || l.starts_with('#'));
        if blank {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load `explicit`, else the first default file found in `dir`, else the
    /// defaults. Returns the path that was read, if any.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::parse_file(path)?, Some(path.to_path_buf())));
        }
        match discover(dir) {
            Some(path) => Ok((Self::parse_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }
}

/// First of [`DEFAULT_CONFIG_NAMES`] present in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.hotspots.nb_variants_threshold == 0 {
        anyhow::bail!("hotspots.nb_variants_threshold must be at least 1");
    }
    if config.hotspots.nb_aggregations_threshold == 0 {
        anyhow::bail!("hotspots.nb_aggregations_threshold must be at least 1");
    }
    if config.store.retry.max_attempts == 0 {
        anyhow::bail!("store.retry.max_attempts must be at least 1");
    }
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
hotspots:
  nb_variants_threshold: 3
store:
  retry:
    delay_ms: 10
excluded_paths:
  - "**/generated/**"
"#;
        let config = Config::parse_str(yaml).unwrap();
        assert_eq!(config.hotspots.nb_variants_threshold, 3);
        assert_eq!(config.hotspots.nb_aggregations_threshold, 5);
        assert_eq!(config.store.retry.max_attempts, 20);
        assert_eq!(config.store.retry.delay_ms, 10);
        assert_eq!(config.excluded_paths, vec!["**/generated/**"]);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse_str("").unwrap(), Config::default());
        assert_eq!(Config::parse_str("# nothing\n").unwrap(), Config::default());
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config = Config::parse_str(include_str!("templates/vpscan.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        assert!(validate(&config).is_ok());
        config.hotspots.nb_aggregations_threshold = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.store.retry.max_attempts = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.excluded_paths.push("a/{b".into());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_discover_prefers_first_name() {
        let temp = TempDir::new().unwrap();
        assert!(discover(temp.path()).is_none());
        std::fs::write(temp.path().join(".vpscan.yaml"), "").unwrap();
        std::fs::write(temp.path().join("vpscan.yaml"), "").unwrap();
        assert_eq!(discover(temp.path()), Some(temp.path().join("vpscan.yaml")));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let (config, path) = Config::load(None, temp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.is_none());
        assert!(Config::load(Some(&temp.path().join("missing.yaml")), temp.path()).is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig {
            max_attempts: 3,
            delay_ms: 250,
        }
        .policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }
}
