//! Database configuration with preset defaults and YAML override support.

use serde::{Deserialize, Serialize};

use super::{
    error::{ConfigError, ConfigResult},
    preset::Preset,
    validation::Validatable,
};

/// Supported YAML schema versions
const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Upper bound for retained undo frames
pub const MAX_UNDO_DEPTH: usize = 10_000;

/// Session-level settings for a [`Database`](crate::features::database::Database)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Number of undo frames retained (oldest frames are dropped first)
    pub undo_depth: usize,

    /// Run the full invariant checker on every commit
    pub check_on_commit: bool,

    /// Build memoization right after commit instead of on first query
    pub eager_memoization: bool,

    #[serde(skip)]
    preset: Preset,
}

impl DatabaseConfig {
    /// Complete defaults for a preset
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Production => Self {
                undo_depth: 100,
                check_on_commit: false,
                eager_memoization: false,
                preset,
            },
            Preset::Debug => Self {
                undo_depth: 100,
                check_on_commit: true,
                eager_memoization: true,
                preset,
            },
        }
    }

    pub fn undo_depth(mut self, depth: usize) -> Self {
        self.undo_depth = depth;
        self
    }

    pub fn check_on_commit(mut self, enabled: bool) -> Self {
        self.check_on_commit = enabled;
        self
    }

    pub fn eager_memoization(mut self, enabled: bool) -> Self {
        self.eager_memoization = enabled;
        self
    }

    /// Preset this configuration started from
    pub fn get_preset(&self) -> Preset {
        self.preset
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Load from a YAML file (schema v1)
    pub fn from_yaml(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load from a YAML string (schema v1)
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::from_str(&export.preset)?;
        let mut config = Self::preset(preset);

        if let Some(overrides) = export.overrides {
            if let Some(depth) = overrides.undo_depth {
                config.undo_depth = depth;
            }
            if let Some(check) = overrides.check_on_commit {
                config.check_on_commit = check;
            }
            if let Some(eager) = overrides.eager_memoization {
                config.eager_memoization = eager;
            }
        }

        config.build()
    }

    /// Export to YAML (schema v1)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(1),
            preset: self.preset.to_string(),
            overrides: Some(ConfigOverrides {
                undo_depth: Some(self.undo_depth),
                check_on_commit: Some(self.check_on_commit),
                eager_memoization: Some(self.eager_memoization),
            }),
        };

        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

impl Validatable for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.undo_depth == 0 || self.undo_depth > MAX_UNDO_DEPTH {
            return Err(ConfigError::range_with_hint(
                "undo_depth",
                self.undo_depth,
                1,
                MAX_UNDO_DEPTH,
                "Undo needs at least one retained frame",
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "DatabaseConfig"
    }
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigExportV1 {
    #[serde(default)]
    version: Option<u32>,

    preset: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    overrides: Option<ConfigOverrides>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    undo_depth: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_on_commit: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    eager_memoization: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_preset_defaults() {
        let prod = DatabaseConfig::preset(Preset::Production);
        assert!(!prod.check_on_commit);
        assert!(!prod.eager_memoization);

        let debug = DatabaseConfig::preset(Preset::Debug);
        assert!(debug.check_on_commit);
        assert_eq!(debug.get_preset(), Preset::Debug);
    }

    #[test]
    fn test_builder_validation() {
        assert!(DatabaseConfig::preset(Preset::Production)
            .undo_depth(0)
            .build()
            .is_err());
        assert!(DatabaseConfig::preset(Preset::Production)
            .undo_depth(MAX_UNDO_DEPTH + 1)
            .build()
            .is_err());
        let config = DatabaseConfig::preset(Preset::Production)
            .undo_depth(5)
            .build()
            .unwrap();
        assert_eq!(config.undo_depth, 5);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = DatabaseConfig::preset(Preset::Debug).undo_depth(42);
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("preset: debug"));
        assert!(yaml.contains("undo_depth: 42"));

        let loaded = DatabaseConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_yaml_loading_from_file() {
        let yaml_content = r#"
version: 1
preset: production
overrides:
  undo_depth: 7
  check_on_commit: true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();
        let path = temp_file.path().to_str().unwrap();

        let config = DatabaseConfig::from_yaml(path).unwrap();
        assert_eq!(config.undo_depth, 7);
        assert!(config.check_on_commit);
        assert!(!config.eager_memoization);
    }

    #[test]
    fn test_yaml_missing_version() {
        let result = DatabaseConfig::from_yaml_str("preset: production\n");
        assert!(matches!(result, Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = DatabaseConfig::from_yaml_str("version: 2\npreset: debug\n");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn test_yaml_unknown_field_rejected() {
        let yaml = "version: 1\npreset: debug\noverrides:\n  undo_dept: 3\n";
        assert!(matches!(
            DatabaseConfig::from_yaml_str(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_yaml_override_out_of_range() {
        let yaml = "version: 1\npreset: debug\noverrides:\n  undo_depth: 0\n";
        assert!(matches!(
            DatabaseConfig::from_yaml_str(yaml),
            Err(ConfigError::Range { .. })
        ));
    }
}
