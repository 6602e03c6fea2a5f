//! Configuration schema for Stagecraft
//!
//! Global configuration is stored at `~/.config/stagecraft/config.toml`;
//! a project may override any key in a `stagecraft.toml`.

use crate::engine::EngineKind;
use crate::solve::DEFAULT_SYNTAX;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Manifest generation settings
    pub build: BuildConfig,

    /// Build engine selection
    pub engine: EngineConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Frontend named in the manifest's `#syntax=` line
    pub syntax: String,

    /// Repository prefix for content-addressed tags
    pub tag_prefix: String,

    /// Build file used when none is given
    pub default_file: String,

    /// Derive ids for every cache mount that lacks one
    pub stable_cache_ids: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            syntax: DEFAULT_SYNTAX.to_string(),
            tag_prefix: "stagecraft".to_string(),
            default_file: crate::plan::DEFAULT_PLAN_FILE.to_string(),
            stable_cache_ids: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKindConfig,

    /// Depot project id, required when `kind = "depot"`
    pub project: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKindConfig {
    #[default]
    Docker,
    Depot,
}

impl EngineConfig {
    /// Resolve the configured engine, or `None` when depot lacks a project
    pub fn engine_kind(&self) -> Option<EngineKind> {
        match self.kind {
            EngineKindConfig::Docker => Some(EngineKind::Docker),
            EngineKindConfig::Depot => self
                .project
                .clone()
                .map(|project| EngineKind::Depot { project }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[build]"));
        assert!(toml.contains("docker/dockerfile:1.4"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.build.tag_prefix, "stagecraft");
        assert_eq!(config.build.default_file, "build.toml");
        assert_eq!(config.engine.kind, EngineKindConfig::Docker);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [engine]
            kind = "depot"
            project = "abc123"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.engine.engine_kind(),
            Some(EngineKind::Depot {
                project: "abc123".to_string()
            })
        );
        assert_eq!(config.general.log_format, "text"); // default preserved
    }

    #[test]
    fn depot_without_project() {
        let config: Config = toml::from_str("[engine]\nkind = \"depot\"\n").unwrap();
        assert_eq!(config.engine.engine_kind(), None);
    }
}
