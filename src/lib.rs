//! # dalift
//!
//! Synthesize data-access code from relational schema snapshots
//!
//! This crate provides a CLI tool and library that walk an imported schema
//! and build a tree of code artifacts: entity classes, mapping
//! configurations, repositories with join-composed projections, and a
//! database context. Schema shapes that cannot be translated become inline
//! warnings in the tree instead of errors.

pub mod artifact;
pub mod codegen;
pub mod config;
pub mod error;
pub mod introspect;
pub mod naming;
pub mod relationships;
pub mod render;
pub mod schema;
pub mod selection;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::artifact::{ArtifactTree, ArtifactVisitor, CodeUnit, DiagnosticEntry, UnitKind};
    pub use crate::codegen::Generator;
    pub use crate::config::GeneratorConfig;
    pub use crate::error::DaliftError;
    pub use crate::introspect::{Introspector, JsonSnapshotImporter, TableFilter};
    pub use crate::render::{ArtifactRenderer, OutlineRenderer};
    pub use crate::schema::{Column, DataType, Database, QualifiedName, Table, View};
    pub use crate::selection::{ProjectSelection, Selections};
}
