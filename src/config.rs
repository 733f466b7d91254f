//! Configuration loading
//!
//! Loads generator configuration from environment variables, optionally
//! reading from a .env file first. The switches found here form the global
//! [`ProjectSelection`].

use std::{env, path::Path};

use tracing::{debug, error, trace, warn};

use crate::prelude::DaliftError;
use crate::selection::ProjectSelection;

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Root namespace for generated types
    pub namespace: String,
    /// Name of the generated database context class
    pub context_name: String,
    /// Schema treated as implicit (no qualifier in table bindings)
    pub default_schema: String,
    pub selection: ProjectSelection,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: "DataAccess".to_string(),
            context_name: "AppDbContext".to_string(),
            default_schema: "dbo".to_string(),
            selection: ProjectSelection::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - DALIFT_NAMESPACE (default: DataAccess)
    /// - DALIFT_CONTEXT_NAME (default: AppDbContext)
    /// - DALIFT_DEFAULT_SCHEMA (default: dbo)
    /// - DALIFT_CONCURRENCY_COLUMN (optional)
    /// - DALIFT_DATA_CONTRACTS (default: false)
    /// - DALIFT_NAVIGATION_PROPERTIES (default: true)
    /// - DALIFT_DBSET_PROPERTIES (default: true)
    /// - DALIFT_DATA_ANNOTATIONS (default: false)
    pub fn from_env() -> Result<Self, DaliftError> {
        debug!("Loading generator configuration from environment");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DaliftError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let text = |key: &str, default: String| {
            lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| {
                trace!(key = ?key, "Not set, using default");
                default
            })
        };

        let flag = |key: &str, default: bool| -> Result<bool, DaliftError> {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                None => {
                    trace!(key = ?key, "Not set, using default");
                    Ok(default)
                }
                Some(value) => parse_flag(&value).ok_or_else(|| {
                    error!(key = ?key, value = ?value, "Invalid boolean value");
                    DaliftError::Config(format!("{key} must be a boolean (true/false)"))
                }),
            }
        };

        let selection = ProjectSelection {
            concurrency_token: lookup("DALIFT_CONCURRENCY_COLUMN")
                .filter(|v| !v.trim().is_empty()),
            data_contract_projection: flag(
                "DALIFT_DATA_CONTRACTS",
                defaults.selection.data_contract_projection,
            )?,
            navigation_properties: flag(
                "DALIFT_NAVIGATION_PROPERTIES",
                defaults.selection.navigation_properties,
            )?,
            db_set_properties: flag(
                "DALIFT_DBSET_PROPERTIES",
                defaults.selection.db_set_properties,
            )?,
            data_annotations: flag("DALIFT_DATA_ANNOTATIONS", defaults.selection.data_annotations)?,
        };

        let config = Self {
            namespace: text("DALIFT_NAMESPACE", defaults.namespace),
            context_name: text("DALIFT_CONTEXT_NAME", defaults.context_name),
            default_schema: text("DALIFT_DEFAULT_SCHEMA", defaults.default_schema),
            selection,
        };

        debug!(
            namespace = ?config.namespace,
            context = ?config.context_name,
            default_schema = ?config.default_schema,
            selection = ?config.selection,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load a .env file and then read configuration from environment
    pub fn load(env_file: &Path) -> Result<Self, DaliftError> {
        if env_file.exists() {
            debug!(path = ?env_file, "Loading environment file");
            dotenvy::from_path(env_file).map_err(|e| {
                error!(path = ?env_file, error = ?e, "Failed to load environment file");
                DaliftError::Config(format!("Failed to load {}: {}", env_file.display(), e))
            })?;
        } else {
            warn!(path = ?env_file, "Environment file not found, using existing environment");
        }

        Self::from_env()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_with_defaults() {
        let config = GeneratorConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.namespace, "DataAccess");
        assert_eq!(config.context_name, "AppDbContext");
        assert_eq!(config.default_schema, "dbo");
        assert_eq!(config.selection, ProjectSelection::default());
    }

    #[test]
    fn test_from_lookup_with_custom_values() {
        let config = GeneratorConfig::from_lookup(lookup_from(&[
            ("DALIFT_NAMESPACE", "Northwind.Data"),
            ("DALIFT_CONCURRENCY_COLUMN", "RowVersion"),
            ("DALIFT_DATA_CONTRACTS", "yes"),
            ("DALIFT_NAVIGATION_PROPERTIES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.namespace, "Northwind.Data");
        assert_eq!(
            config.selection.concurrency_token.as_deref(),
            Some("RowVersion")
        );
        assert!(config.selection.data_contract_projection);
        assert!(!config.selection.navigation_properties);
    }

    #[test]
    fn test_from_lookup_invalid_flag() {
        let result =
            GeneratorConfig::from_lookup(lookup_from(&[("DALIFT_DATA_ANNOTATIONS", "maybe")]));

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("DALIFT_DATA_ANNOTATIONS"));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = GeneratorConfig::from_lookup(lookup_from(&[
            ("DALIFT_NAMESPACE", "  "),
            ("DALIFT_CONCURRENCY_COLUMN", ""),
        ]))
        .unwrap();

        assert_eq!(config.namespace, "DataAccess");
        assert_eq!(config.selection.concurrency_token, None);
    }
}
