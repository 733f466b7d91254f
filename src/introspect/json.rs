use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, trace};

use super::{Introspector, TableFilter};
use crate::prelude::DaliftError;
use crate::schema::{
    Column, DataType, Database, ForeignKey, Identity, KeyConstraint, QualifiedName, Table, View,
};

/// Importer reading a schema snapshot exported as JSON
pub struct JsonSnapshotImporter {
    source_name: String,
    contents: String,
    default_schema: String,
}

impl JsonSnapshotImporter {
    pub fn new(source_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            contents: contents.into(),
            default_schema: "dbo".to_string(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, DaliftError> {
        let contents = fs::read_to_string(path).map_err(|e| DaliftError::Import {
            source_name: path.display().to_string(),
            message: format!("Failed to read snapshot: {e}"),
        })?;
        Ok(Self::new(path.display().to_string(), contents))
    }

    /// Schema applied to objects and references that omit one, unless the
    /// snapshot declares its own
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotDto {
    name: Option<String>,
    default_schema: Option<String>,
    #[serde(default)]
    tables: Vec<TableDto>,
    #[serde(default)]
    views: Vec<ViewDto>,
}

#[derive(Debug, Deserialize)]
struct ColumnDto {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    nullable: bool,
    /// Negative lengths (`-1`) mean `max`
    length: Option<i64>,
    precision: Option<u8>,
    scale: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct KeyDto {
    name: String,
    columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ForeignKeyDto {
    name: String,
    #[serde(default)]
    columns: Vec<String>,
    references: String,
    #[serde(default)]
    referenced_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityDto {
    column: String,
    #[serde(default = "one")]
    seed: i64,
    #[serde(default = "one")]
    increment: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct TableDto {
    schema: Option<String>,
    name: String,
    columns: Vec<ColumnDto>,
    primary_key: Option<KeyDto>,
    #[serde(default)]
    uniques: Vec<KeyDto>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKeyDto>,
    identity: Option<IdentityDto>,
}

#[derive(Debug, Deserialize)]
struct ViewDto {
    schema: Option<String>,
    name: String,
    columns: Vec<ColumnDto>,
}

impl Introspector for JsonSnapshotImporter {
    fn introspect(&mut self, filter: &TableFilter) -> Result<Database, DaliftError> {
        info!(source = ?self.source_name, "Importing schema snapshot");

        let snapshot: SnapshotDto =
            serde_json::from_str(&self.contents).map_err(|e| DaliftError::Import {
                source_name: self.source_name.clone(),
                message: format!("Invalid snapshot: {e}"),
            })?;

        let default_schema = snapshot
            .default_schema
            .unwrap_or_else(|| self.default_schema.clone());
        let schema_of = |schema: Option<String>| schema.unwrap_or_else(|| default_schema.clone());

        let found = snapshot.tables.len() + snapshot.views.len();

        let tables: Vec<Table> = snapshot
            .tables
            .into_iter()
            .map(|dto| (schema_of(dto.schema.clone()), dto))
            .filter(|(schema, dto)| filter.should_include(schema, &dto.name))
            .map(|(schema, dto)| build_table(schema, dto, &default_schema))
            .collect();

        let views: Vec<View> = snapshot
            .views
            .into_iter()
            .map(|dto| (schema_of(dto.schema.clone()), dto))
            .filter(|(schema, dto)| filter.should_include(schema, &dto.name))
            .map(|(schema, dto)| {
                trace!(view = ?dto.name, columns = dto.columns.len(), "Imported view");
                View::new(schema, dto.name, dto.columns.into_iter().map(build_column).collect())
            })
            .collect();

        if filter.is_active() {
            debug!(
                found,
                kept = tables.len() + views.len(),
                "Objects after filtering"
            );
        }

        let name = snapshot
            .name
            .unwrap_or_else(|| self.source_name.clone());
        let db = Database::new(name, default_schema.clone(), tables, views)?;

        info!(
            database = ?db.name,
            tables = db.tables().len(),
            views = db.views().len(),
            "Schema import complete"
        );
        Ok(db)
    }
}

fn build_column(dto: ColumnDto) -> Column {
    let data_type = dto
        .type_name
        .parse::<DataType>()
        .unwrap_or_else(|never| match never {});
    Column {
        name: dto.name,
        data_type,
        is_nullable: dto.nullable,
        length: dto
            .length
            .filter(|l| *l >= 0)
            .and_then(|l| u32::try_from(l).ok()),
        precision: dto.precision,
        scale: dto.scale,
    }
}

fn build_key(dto: KeyDto) -> KeyConstraint {
    KeyConstraint {
        name: dto.name,
        columns: dto.columns,
    }
}

fn build_table(schema: String, dto: TableDto, default_schema: &str) -> Table {
    trace!(
        table = ?dto.name,
        columns = dto.columns.len(),
        foreign_keys = dto.foreign_keys.len(),
        "Imported table"
    );

    Table {
        schema,
        name: dto.name,
        columns: dto.columns.into_iter().map(build_column).collect(),
        primary_key: dto.primary_key.map(build_key),
        uniques: dto.uniques.into_iter().map(build_key).collect(),
        foreign_keys: dto
            .foreign_keys
            .into_iter()
            .map(|fk| ForeignKey {
                name: fk.name,
                columns: fk.columns,
                references: QualifiedName::parse(&fk.references, default_schema),
                referenced_columns: fk.referenced_columns,
            })
            .collect(),
        identity: dto.identity.map(|id| Identity {
            column: id.column,
            seed: id.seed,
            increment: id.increment,
        }),
    }
}
