//! `keygrade.toml` configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use keygrade_core::engine::BatchConfig;
use keygrade_core::model::VariantLabel;

/// Top-level keygrade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeygradeConfig {
    /// Set applied to sheets without an individual assignment.
    #[serde(default)]
    pub default_set: Option<VariantLabel>,
    /// Max sheets recognized concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Sheets below this recognizer confidence are flagged for review.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Output directory for batch reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_parallelism() -> usize {
    4
}
fn default_confidence_threshold() -> f64 {
    0.8
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./keygrade-results")
}

impl Default for KeygradeConfig {
    fn default() -> Self {
        Self {
            default_set: None,
            parallelism: default_parallelism(),
            confidence_threshold: default_confidence_threshold(),
            output_dir: default_output_dir(),
        }
    }
}

impl KeygradeConfig {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            parallelism: self.parallelism,
            default_variant: self.default_set,
            confidence_threshold: self.confidence_threshold,
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.parallelism >= 1, "parallelism must be at least 1");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.confidence_threshold),
            "confidence_threshold must be within [0, 1], got {}",
            self.confidence_threshold
        );
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `keygrade.toml` in the current directory
/// 2. `~/.config/keygrade/config.toml`
///
/// Environment variable override: `KEYGRADE_OUTPUT_DIR`.
pub fn load_config() -> Result<KeygradeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<KeygradeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("keygrade.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<KeygradeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => KeygradeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dir) = std::env::var("KEYGRADE_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }

    config.output_dir = PathBuf::from(resolve_env_vars(&config.output_dir.to_string_lossy()));
    config.validate()?;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("keygrade"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_KEYGRADE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_KEYGRADE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_KEYGRADE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("unterminated ${oops"), "unterminated ${oops");
        std::env::remove_var("_KEYGRADE_TEST_VAR");
    }

    #[test]
    fn resolved_values_are_not_expanded_again() {
        std::env::set_var("_KEYGRADE_SELF_REF", "${_KEYGRADE_SELF_REF}");
        assert_eq!(
            resolve_env_vars("${_KEYGRADE_SELF_REF}/out"),
            "${_KEYGRADE_SELF_REF}/out"
        );
        std::env::remove_var("_KEYGRADE_SELF_REF");
    }

    #[test]
    fn default_config() {
        let config = KeygradeConfig::default();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.confidence_threshold, 0.8);
        assert!(config.default_set.is_none());
        assert_eq!(config.batch_config().parallelism, 4);
    }

    #[test]
    fn parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keygrade.toml");
        std::fs::write(
            &path,
            r#"
default_set = "b"
parallelism = 8
confidence_threshold = 0.7
output_dir = "${_KEYGRADE_CONFIG_TEST_DIR}/reports"
"#,
        )
        .unwrap();
        std::env::set_var("_KEYGRADE_CONFIG_TEST_DIR", "/tmp/grading");

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.default_set, VariantLabel::new('B'));
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/grading/reports"));
        assert_eq!(config.batch_config().confidence_threshold, 0.7);
        std::env::remove_var("_KEYGRADE_CONFIG_TEST_DIR");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keygrade.toml");
        std::fs::write(&path, "confidence_threshold = 1.5\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());

        std::fs::write(&path, "default_set = \"AB\"\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }

    #[test]
    fn missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_from(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
