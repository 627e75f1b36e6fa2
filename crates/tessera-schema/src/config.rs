//! Build configuration.
//!
//! Options for one build of a type graph. Can be deserialized from any serde
//! format; loading it from files is left to the embedding application.
//!
//! # Example Configuration
//!
//! ```toml
//! plugins = ["tracing", "dedupe"]
//! sort_output = true
//! default_field_resolver = false
//!
//! [extensions]
//! version = "2"
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tessera_core::Extensions;

/// Options for [`SchemaBuilder::build`](crate::SchemaBuilder::build).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Names of plugins to instantiate from the plugin registry, in
    /// registration order. They run after plugins added to the builder directly.
    /// Default: empty
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Sort types, fields, arguments, enum values and input fields by name.
    /// Default: false (declaration order)
    #[serde(default = "default_sort_output")]
    pub sort_output: bool,

    /// Resolve fields without a resolver by reading the property of the same
    /// name from the parent value, instead of failing the build.
    /// Default: false
    #[serde(default = "default_field_resolver")]
    pub default_field_resolver: bool,

    /// Extensions copied onto the finished graph.
    #[serde(default)]
    pub extensions: Extensions,

    /// Let a plugin named in `plugins` replace a plugin of the same name that
    /// was added to the builder directly, instead of failing the build.
    /// Default: false
    #[serde(default = "default_allow_plugin_override")]
    pub allow_plugin_override: bool,
}

fn default_sort_output() -> bool {
    false
}

fn default_field_resolver() -> bool {
    false
}

fn default_allow_plugin_override() -> bool {
    false
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            sort_output: default_sort_output(),
            default_field_resolver: default_field_resolver(),
            extensions: Extensions::new(),
            allow_plugin_override: default_allow_plugin_override(),
        }
    }
}

impl BuildConfig {
    /// Adds a plugin name.
    #[must_use]
    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.push(name.into());
        self
    }

    #[must_use]
    pub fn with_sort_output(mut self, sort_output: bool) -> Self {
        self.sort_output = sort_output;
        self
    }

    #[must_use]
    pub fn with_default_field_resolver(mut self, enabled: bool) -> Self {
        self.default_field_resolver = enabled;
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a plugin name is empty or listed twice.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for name in &self.plugins {
            if name.trim().is_empty() {
                return Err("plugins must not contain empty names".into());
            }
            if !seen.insert(name.as_str()) {
                return Err(format!("plugin {name} is listed more than once"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert!(config.plugins.is_empty());
        assert!(!config.sort_output);
        assert!(!config.default_field_resolver);
        assert!(!config.allow_plugin_override);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_repeated_plugin_is_invalid() {
        let config = BuildConfig::default()
            .with_plugin("tracing")
            .with_plugin("tracing");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_plugin_name_is_invalid() {
        let config = BuildConfig::default().with_plugin("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            plugins = ["tracing", "dedupe"]
            sort_output = true

            [extensions]
            version = "2"
        "#;

        let config: BuildConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.plugins, vec!["tracing", "dedupe"]);
        assert!(config.sort_output);
        assert!(!config.default_field_resolver);
        assert_eq!(config.extensions["version"], "2");
    }
}
