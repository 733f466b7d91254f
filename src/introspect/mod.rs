//! Schema import
//!
//! The core only ever sees an immutable [`Database`] snapshot. Importers
//! implement [`Introspector`] and apply a [`TableFilter`] while building it.

use crate::prelude::{Database, DaliftError};

mod json;

pub use json::JsonSnapshotImporter;

/// Filters to apply during import
#[derive(Debug, Default, Clone)]
pub struct TableFilter {
    /// Only include these objects (if Some)
    pub include: Option<Vec<String>>,
    /// Exclude these objects
    pub exclude: Option<Vec<String>>,
}

impl TableFilter {
    /// Check if an object should be included
    ///
    /// Entries match either the bare object name or `schema.name`.
    pub fn should_include(&self, schema: &str, name: &str) -> bool {
        let qualified = format!("{schema}.{name}");
        let matches = |entry: &String| entry == name || *entry == qualified;

        if let Some(include) = &self.include {
            if !include.iter().any(matches) {
                return false;
            }
        }

        if let Some(exclude) = &self.exclude {
            if exclude.iter().any(matches) {
                return false;
            }
        }

        true
    }

    pub fn is_active(&self) -> bool {
        self.include.is_some() || self.exclude.is_some()
    }
}

/// Source of schema snapshots
pub trait Introspector {
    /// Import the schema and return a validated, indexed snapshot
    fn introspect(&mut self, filter: &TableFilter) -> Result<Database, DaliftError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_includes_everything() {
        let filter = TableFilter::default();
        assert!(filter.should_include("dbo", "Orders"));
        assert!(!filter.is_active());
    }

    #[test]
    fn test_include_matches_bare_and_qualified_names() {
        let filter = TableFilter {
            include: Some(vec!["Orders".to_string(), "sales.Invoices".to_string()]),
            exclude: None,
        };
        assert!(filter.should_include("dbo", "Orders"));
        assert!(filter.should_include("sales", "Orders"));
        assert!(filter.should_include("sales", "Invoices"));
        assert!(!filter.should_include("dbo", "Invoices"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = TableFilter {
            include: Some(vec!["Orders".to_string()]),
            exclude: Some(vec!["dbo.Orders".to_string()]),
        };
        assert!(!filter.should_include("dbo", "Orders"));
        assert!(filter.should_include("sales", "Orders"));
    }
}
