//! Engine configuration, loadable from TOML.
//!
//! ```toml
//! [matcher]
//! max_alternatives = 3
//! allow_multiple_packages = true
//! relax_tolerance_when_unmatched = false
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::MatcherConfig;

/// Upper limit on configured alternatives.
const MAX_ALTERNATIVES_LIMIT: usize = 50;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
}

impl EngineConfig {
    /// Load from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.matcher.max_alternatives > MAX_ALTERNATIVES_LIMIT {
            return Err(ConfigError::Invalid {
                field: "matcher.max_alternatives".into(),
                message: format!(
                    "{} exceeds the limit of {}",
                    self.matcher.max_alternatives, MAX_ALTERNATIVES_LIMIT
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.matcher.max_alternatives, 5);
        assert!(config.matcher.allow_multiple_packages);
        assert!(!config.matcher.relax_tolerance_when_unmatched);
    }

    #[test]
    fn test_partial_matcher_section() {
        let config = EngineConfig::from_toml_str(
            r#"
            [matcher]
            max_alternatives = 2
            relax_tolerance_when_unmatched = true
            "#,
        )
        .unwrap();
        assert_eq!(config.matcher.max_alternatives, 2);
        assert!(config.matcher.allow_multiple_packages);
        assert!(config.matcher.relax_tolerance_when_unmatched);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("[matcher]\nmax_alternatives = \"many\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[matcher]\nmax_alternatives = 500"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[matcher]\nallow_multiple_packages = false").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(!config.matcher.allow_multiple_packages);

        assert!(matches!(
            EngineConfig::from_file("/nonexistent/ndc-calc.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
