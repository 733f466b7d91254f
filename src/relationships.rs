//! Relationship resolution
//!
//! Turns foreign keys into navigation relationships. Every foreign key ends
//! up either resolved or skipped with a reason; skipped keys become inline
//! warnings in the generated artifacts and never fail the run.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, trace, warn};

use crate::naming::{pluralize, type_identifier, NameRegistry};
use crate::schema::{Database, ForeignKey, QualifiedName, Table};

/// Join shape implied by the foreign-key column's nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// The related row always exists
    Inner,
    /// The related row may be absent (nullable foreign key)
    Outer,
}

/// Navigation relationship derived from a single-column foreign key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub constraint: String,
    /// Table holding the foreign key (the "many" side)
    pub dependent: QualifiedName,
    /// Referenced table (the "one" side)
    pub principal: QualifiedName,
    pub column: String,
    pub principal_column: String,
    pub nullable: bool,
    /// Navigation on the dependent entity pointing at the principal
    pub reference_navigation: String,
    /// Collection navigation on the principal entity
    pub collection_navigation: String,
}

impl Relationship {
    pub fn join_kind(&self) -> JoinKind {
        if self.nullable {
            JoinKind::Outer
        } else {
            JoinKind::Inner
        }
    }
}

/// Why a foreign key produced no relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoColumns,
    Unresolved { target: QualifiedName },
    Composite { columns: Vec<String> },
    NoSingleColumnKey { target: QualifiedName },
    DuplicateNavigation { name: String },
}

/// Foreign key that synthesis could not turn into a relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedForeignKey {
    pub constraint: String,
    pub table: QualifiedName,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "foreign key '{}' on '{}' ", self.constraint, self.table)?;
        match &self.reason {
            SkipReason::NoColumns => write!(f, "has no key columns; relationship skipped"),
            SkipReason::Unresolved { target } => {
                write!(f, "references unknown table '{target}'; relationship skipped")
            }
            SkipReason::Composite { columns } => write!(
                f,
                "spans {} columns ({}); composite foreign keys are not supported for navigation or join synthesis",
                columns.len(),
                columns.join(", ")
            ),
            SkipReason::NoSingleColumnKey { target } => write!(
                f,
                "does not reference a single-column key of '{target}'; relationship skipped"
            ),
            SkipReason::DuplicateNavigation { name } => write!(
                f,
                "would reuse navigation name '{name}'; relationship skipped"
            ),
        }
    }
}

/// Outcome for one foreign key, kept in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignKeyResolution {
    Resolved(Relationship),
    Skipped(SkippedForeignKey),
}

/// Every table's foreign keys, resolved once per run
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    order: Vec<QualifiedName>,
    per_table: HashMap<QualifiedName, Vec<ForeignKeyResolution>>,
}

impl RelationshipGraph {
    pub fn build(db: &Database, names: &NameRegistry) -> Self {
        let mut graph = Self::default();

        for table in db.tables() {
            let resolutions = resolve_table(db, names, table);
            trace!(
                table = %table.qualified_name(),
                foreign_keys = resolutions.len(),
                "Resolved foreign keys"
            );
            graph.order.push(table.qualified_name());
            graph.per_table.insert(table.qualified_name(), resolutions);
        }

        graph
    }

    /// Resolutions for a table's foreign keys in declaration order
    pub fn foreign_keys(&self, table: &QualifiedName) -> &[ForeignKeyResolution] {
        self.per_table.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolved relationships where `table` is the dependent
    pub fn resolved<'a>(
        &'a self,
        table: &QualifiedName,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.foreign_keys(table).iter().filter_map(|r| match r {
            ForeignKeyResolution::Resolved(rel) => Some(rel),
            ForeignKeyResolution::Skipped(_) => None,
        })
    }

    /// Resolved relationships where `table` is the principal, ordered by
    /// dependent table then foreign key declaration
    pub fn inverse(&self, table: &QualifiedName) -> Vec<&Relationship> {
        self.order
            .iter()
            .flat_map(|dependent| self.resolved(dependent))
            .filter(|rel| &rel.principal == table)
            .collect()
    }
}

fn resolve_table(db: &Database, names: &NameRegistry, table: &Table) -> Vec<ForeignKeyResolution> {
    let dependent = table.qualified_name();
    let dependent_entity = names.entity(&dependent).name;

    // Several keys to targets sharing an entity name need column-suffixed
    // navigation names, even when the targets live in different schemas
    let mut per_entity: HashMap<String, usize> = HashMap::new();
    for fk in table.foreign_keys.iter().filter(|fk| fk.columns.len() == 1) {
        *per_entity.entry(names.entity(&fk.references).name).or_default() += 1;
    }

    let property_names: HashSet<String> = table
        .columns
        .iter()
        .map(|c| type_identifier(&c.name))
        .collect();

    let mut used_navigations = HashSet::new();

    table
        .foreign_keys
        .iter()
        .map(|fk| {
            let skip = |reason: SkipReason| {
                let skipped = SkippedForeignKey {
                    constraint: fk.name.clone(),
                    table: dependent.clone(),
                    reason,
                };
                warn!(table = %dependent, constraint = ?fk.name, "{skipped}");
                ForeignKeyResolution::Skipped(skipped)
            };

            let column = match fk.columns.as_slice() {
                [] => return skip(SkipReason::NoColumns),
                [single] => single,
                many => {
                    return skip(SkipReason::Composite {
                        columns: many.to_vec(),
                    })
                }
            };

            let Some(principal) = db.table(&fk.references) else {
                return skip(SkipReason::Unresolved {
                    target: fk.references.clone(),
                });
            };

            let Some(principal_column) = principal_key_column(fk, principal) else {
                return skip(SkipReason::NoSingleColumnKey {
                    target: fk.references.clone(),
                });
            };

            let principal_entity = names.entity(&fk.references).name;
            let suffix = type_identifier(column);
            let ambiguous = per_entity.get(&principal_entity).copied().unwrap_or(0) > 1
                || fk.references == dependent;

            let mut reference_navigation = principal_entity.clone();
            if ambiguous
                || reference_navigation == dependent_entity
                || property_names.contains(&reference_navigation)
            {
                reference_navigation.push_str(&suffix);
            }

            let mut collection_navigation = pluralize(&dependent_entity);
            if ambiguous || collection_navigation == principal_entity {
                collection_navigation.push_str(&suffix);
            }

            if !used_navigations.insert(reference_navigation.clone()) {
                return skip(SkipReason::DuplicateNavigation {
                    name: reference_navigation,
                });
            }

            let nullable = table
                .column(column)
                .map(|c| c.is_nullable)
                .unwrap_or(true);

            debug!(
                table = %dependent,
                constraint = ?fk.name,
                principal = %fk.references,
                nullable,
                navigation = ?reference_navigation,
                "Derived relationship"
            );

            ForeignKeyResolution::Resolved(Relationship {
                constraint: fk.name.clone(),
                dependent: dependent.clone(),
                principal: fk.references.clone(),
                column: column.clone(),
                principal_column,
                nullable,
                reference_navigation,
                collection_navigation,
            })
        })
        .collect()
}

/// Column on the principal the foreign key joins to
fn principal_key_column(fk: &ForeignKey, principal: &Table) -> Option<String> {
    match fk.referenced_columns.as_slice() {
        [single] => principal.column(single).map(|c| c.name.clone()),
        [] => match principal.primary_key_columns().as_slice() {
            [single] => Some(single.name.clone()),
            _ => None,
        },
        _ => None,
    }
}
