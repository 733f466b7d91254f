//! Synthesis selections
//!
//! A [`ProjectSelection`] bundles the switches that shape generated code.
//! There is one global selection plus optional per-object overrides. An
//! override replaces the global selection wholesale for its object; fields
//! are never merged.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error};

use crate::error::DaliftError;
use crate::schema::{Database, QualifiedName};

/// Switches applied while synthesizing one table or view
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct ProjectSelection {
    /// Column name to declare as the concurrency token, if present
    pub concurrency_token: Option<String>,
    /// Enumerate through a flattened data-contract projection
    pub data_contract_projection: bool,
    pub navigation_properties: bool,
    pub db_set_properties: bool,
    pub data_annotations: bool,
}

impl Default for ProjectSelection {
    fn default() -> Self {
        Self {
            concurrency_token: None,
            data_contract_projection: false,
            navigation_properties: true,
            db_set_properties: true,
            data_annotations: false,
        }
    }
}

/// Global selection plus per-object overrides
#[derive(Debug, Clone, Default)]
pub struct Selections {
    global: ProjectSelection,
    overrides: BTreeMap<QualifiedName, ProjectSelection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectionFile {
    #[serde(default)]
    global: Option<ProjectSelection>,
    #[serde(default)]
    objects: BTreeMap<String, ProjectSelection>,
}

impl Selections {
    pub fn new(global: ProjectSelection) -> Self {
        Self {
            global,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, object: QualifiedName, selection: ProjectSelection) -> Self {
        self.overrides.insert(object, selection);
        self
    }

    pub fn global(&self) -> &ProjectSelection {
        &self.global
    }

    /// Selection for an object, or the global one when `object` is `None`
    /// or has no override
    pub fn resolve(&self, object: Option<&QualifiedName>) -> &ProjectSelection {
        object
            .and_then(|name| self.overrides.get(name))
            .unwrap_or(&self.global)
    }

    /// Override keys naming no table or view in `db`
    pub fn unmatched_overrides<'a>(&'a self, db: &Database) -> Vec<&'a QualifiedName> {
        self.overrides
            .keys()
            .filter(|name| db.find(name).is_none())
            .collect()
    }

    /// Layer a JSON selection file over `self`
    ///
    /// ```json
    /// { "global": { "navigation_properties": false },
    ///   "objects": { "dbo.Orders": { "data_contract_projection": true } } }
    /// ```
    ///
    /// Object keys without a schema use `default_schema`. A `global`
    /// entry replaces the current global selection.
    pub fn merge_json(mut self, json: &str, default_schema: &str) -> Result<Self, DaliftError> {
        let file: SelectionFile = serde_json::from_str(json).map_err(|e| {
            error!(error = ?e, "Invalid selection file");
            DaliftError::Config(format!("Invalid selection file: {e}"))
        })?;

        if let Some(global) = file.global {
            self.global = global;
        }
        for (key, selection) in file.objects {
            let name = QualifiedName::parse(&key, default_schema);
            debug!(object = %name, selection = ?selection, "Selection override");
            self.overrides.insert(name, selection);
        }
        Ok(self)
    }

    pub fn load_file(self, path: &Path, default_schema: &str) -> Result<Self, DaliftError> {
        debug!(path = ?path, "Loading selection file");
        let json = fs::read_to_string(path).map_err(|e| {
            error!(path = ?path, error = ?e, "Failed to read selection file");
            DaliftError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.merge_json(&json, default_schema)
    }
}
