//! Configuration file loading for tessera.
//!
//! Reads `tessera.config.json` from the project root (or an explicit path).

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tessera_glaze::{ExportMode, LocalsConvention, Target};
use tessera_mosaic::{ErrorCategory, ResolverOptions};
use tessera_tile::{Backend, ModuleOptions, ScopeBehaviour, ScopedNameGenerator};

/// Default config file name.
pub const CONFIG_FILE: &str = "tessera.config.json";

/// Top-level tessera configuration.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TesseraConfig {
    /// JSON Schema reference (for editor autocompletion).
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub export_mode: ExportMode,

    /// `camelCase`, `camelCaseOnly`, `dashes` or `dashesOnly`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locals_convention: Option<String>,

    /// Scoped name template; the backend default when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_scoped_name: Option<String>,

    pub hash_prefix: String,
    pub scope_behaviour: ScopeBehaviour,
    pub export_globals: bool,

    /// Regular expressions; matching files are processed in global mode.
    pub global_module_paths: Vec<String>,

    pub generate_source_types: bool,
    pub declaration_map: bool,
    pub target: Target,
    pub backend: Backend,

    /// Glob patterns of files to build, relative to the project root.
    pub include: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
}

/// Contradictory or invalid options, reported before any file is read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("`declarationMap` requires `generateSourceTypes` to be enabled")]
    DeclarationMapWithoutTypes,

    #[error("invalid `{key}`: {message}")]
    InvalidOption { key: &'static str, message: String },
}

impl ConfigError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl TesseraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.declaration_map && !self.generate_source_types {
            return Err(ConfigError::DeclarationMapWithoutTypes);
        }
        Ok(())
    }

    /// Validate and convert into resolver options.
    pub fn resolver_options(&self) -> Result<ResolverOptions, ConfigError> {
        self.validate()?;

        let locals_convention = match &self.locals_convention {
            Some(value) => value
                .parse::<LocalsConvention>()
                .map_err(|message| ConfigError::InvalidOption {
                    key: "localsConvention",
                    message,
                })?,
            None => LocalsConvention::default(),
        };

        let global_module_paths = self
            .global_module_paths
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidOption {
                    key: "globalModulePaths",
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolverOptions {
            module: ModuleOptions {
                generate_scoped_name: self
                    .generate_scoped_name
                    .as_deref()
                    .map(ScopedNameGenerator::from),
                hash_prefix: self.hash_prefix.clone(),
                scope_behaviour: self.scope_behaviour,
                export_globals: self.export_globals,
                global_module_paths,
            },
            locals_convention,
            export_mode: self.export_mode,
            target: self.target,
            css_source_map: false,
            generate_source_types: self.generate_source_types,
            declaration_map: self.declaration_map,
            import_path: None,
        })
    }
}

/// Load the config from `explicit`, or `tessera.config.json` under `dir`.
///
/// Read and parse failures are warnings; defaults are used instead.
pub fn load_config(dir: &Path, explicit: Option<&Path>) -> TesseraConfig {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(CONFIG_FILE));

    if !config_path.exists() {
        if explicit.is_some() {
            eprintln!(
                "\x1b[33mWarning:\x1b[0m Config file {} not found, using defaults",
                config_path.display()
            );
        }
        return TesseraConfig::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %config_path.display(), "loaded config");
                config
            }
            Err(e) => {
                eprintln!(
                    "\x1b[33mWarning:\x1b[0m Failed to parse {}: {}",
                    config_path.display(),
                    e
                );
                TesseraConfig::default()
            }
        },
        Err(e) => {
            eprintln!(
                "\x1b[33mWarning:\x1b[0m Failed to read {}: {}",
                config_path.display(),
                e
            );
            TesseraConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_camel_case_keys() {
        let config: TesseraConfig = serde_json::from_str(
            r#"{
                "exportMode": "named",
                "localsConvention": "camelCaseOnly",
                "generateScopedName": "[local]_[hash:6]",
                "scopeBehaviour": "global",
                "globalModulePaths": ["vendor/"],
                "target": "es2020",
                "backend": "lightningcss"
            }"#,
        )
        .unwrap();
        assert_eq!(config.export_mode, ExportMode::Named);
        assert_eq!(config.scope_behaviour, ScopeBehaviour::Global);
        assert_eq!(config.target, Target::Es2020);
        assert_eq!(config.backend, Backend::Lightningcss);

        let options = config.resolver_options().unwrap();
        assert!(options.module.is_global_module("src/vendor/reset.css"));
        assert!(matches!(options.locals_convention, LocalsConvention::CamelCaseOnly));
        assert!(!options.target.allows_arbitrary_names());
    }

    #[test]
    fn test_declaration_map_requires_types() {
        let config = TesseraConfig {
            declaration_map: true,
            ..Default::default()
        };
        let error = config.resolver_options().unwrap_err();
        assert!(matches!(error, ConfigError::DeclarationMapWithoutTypes));
        assert_eq!(error.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_invalid_options() {
        let config = TesseraConfig {
            locals_convention: Some("kebab".into()),
            ..Default::default()
        };
        assert!(config.resolver_options().unwrap_err().to_string().contains("localsConvention"));

        let config = TesseraConfig {
            global_module_paths: vec!["(".into()],
            ..Default::default()
        };
        assert!(config.resolver_options().unwrap_err().to_string().contains("globalModulePaths"));
    }

    #[test]
    fn test_load_config_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        let config = load_config(dir.path(), None);
        assert_eq!(config.export_mode, ExportMode::Both);

        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"generateSourceTypes": true}"#).unwrap();
        assert!(load_config(dir.path(), None).generate_source_types);
    }
}
