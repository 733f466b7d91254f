//! Entity mapping configurations
//!
//! One configuration class per table or view. The `Configure` body is
//! emitted in a fixed order: table binding, key, identity, column rules,
//! concurrency token, unique indexes, relationships.

use tracing::{debug, warn};

use super::{SynthesisContext, Synthesizer};
use crate::artifact::{
    Artifact, ClassDef, CodeUnit, Declaration, Line, Member, MethodDef, Modifier, Parameter,
    UnitKind,
};
use crate::naming::type_identifier;
use crate::relationships::{ForeignKeyResolution, Relationship};
use crate::schema::{Column, Database, SchemaObject, Table, View};

/// Sub-namespace holding mapping configurations
pub const NAMESPACE: &str = "Configurations";

/// Storage type expression for a column
///
/// Length-bearing types get their length or `max`; decimal types get
/// precision and scale; floating types get precision only; everything else
/// is the bare declared tag.
pub fn storage_type(col: &Column) -> String {
    let tag = col.data_type.tag();
    if col.data_type.is_length_qualified() {
        match col.length {
            Some(length) if length > 0 => format!("{tag}({length})"),
            _ => format!("{tag}(max)"),
        }
    } else if col.data_type.is_decimal_family() {
        match col.precision {
            Some(precision) => format!("{tag}({precision}, {})", col.scale.unwrap_or(0)),
            None => tag.to_string(),
        }
    } else if col.data_type.is_floating_family() {
        match col.precision {
            Some(precision) => format!("{tag}({precision})"),
            None => tag.to_string(),
        }
    } else {
        tag.to_string()
    }
}

/// Key columns assumed for a view
///
/// Non-nullable columns whose names match a primary-key column anywhere in
/// the schema; when none match, every non-nullable column. Nothing checks
/// that the result is actually unique.
pub fn synthetic_view_key<'a>(db: &Database, view: &'a View) -> Vec<&'a Column> {
    let known = db.primary_key_column_names();
    let required: Vec<&Column> = view.columns.iter().filter(|c| !c.is_nullable).collect();

    let matching: Vec<&Column> = required
        .iter()
        .copied()
        .filter(|c| known.contains(&c.name.to_lowercase()))
        .collect();

    if matching.is_empty() {
        required
    } else {
        matching
    }
}

/// `e.A` for one column, `new { e.A, e.B }` for several
fn key_expression(var: &str, columns: &[&str]) -> String {
    match columns {
        [single] => format!("{var}.{}", type_identifier(single)),
        many => {
            let members: Vec<_> = many
                .iter()
                .map(|c| format!("{var}.{}", type_identifier(c)))
                .collect();
            format!("new {{ {} }}", members.join(", "))
        }
    }
}

fn property_line(col: &str) -> String {
    format!("builder.Property(e => e.{})", type_identifier(col))
}

pub struct MappingSynthesizer;

impl Synthesizer for MappingSynthesizer {
    fn synthesize(&self, ctx: &SynthesisContext<'_>, object: SchemaObject<'_>) -> Vec<CodeUnit> {
        let qualified = object.qualified_name();
        let entity = ctx.entity(&qualified);

        let lines = match object {
            SchemaObject::Table(table) => table_lines(ctx, table),
            SchemaObject::View(view) => view_lines(ctx, view),
        };
        debug!(object = %qualified, lines = lines.len(), "Synthesized mapping");

        let mut configure = MethodDef::new(
            Declaration::new("Configure", format!("{}.{NAMESPACE}", entity.namespace))
                .with_modifiers(&[Modifier::Public]),
            "void",
        );
        configure.parameters.push(Parameter::new(
            "builder",
            format!("EntityTypeBuilder<{}>", entity.qualified()),
        ));
        configure.lines = lines;

        let mut class = ClassDef::new(
            Declaration::new(
                format!("{}Configuration", entity.name),
                format!("{}.{NAMESPACE}", entity.namespace),
            )
            .with_doc(format!("Mapping configuration for {qualified}"))
            .with_modifiers(&[Modifier::Public, Modifier::Partial]),
        );
        class
            .base_types
            .push(format!("IEntityTypeConfiguration<{}>", entity.qualified()));
        class.members.push(Member::Method(configure));

        let mut unit = CodeUnit::new(UnitKind::Mapping, Some(qualified));
        unit.artifacts.push(Artifact::Class(class));
        vec![unit]
    }
}

fn binding_line(ctx: &SynthesisContext<'_>, object: &SchemaObject<'_>) -> Line {
    let method = if object.is_view() { "ToView" } else { "ToTable" };
    match ctx.schema_argument(object) {
        Some(schema) => Line::code(format!(
            "builder.{method}(\"{}\", \"{schema}\");",
            object.name()
        )),
        None => Line::code(format!("builder.{method}(\"{}\");", object.name())),
    }
}

fn table_lines(ctx: &SynthesisContext<'_>, table: &Table) -> Vec<Line> {
    let object = SchemaObject::Table(table);
    let selection = ctx.selection(&table.qualified_name());
    let mut lines = vec![binding_line(ctx, &object)];

    match &table.primary_key {
        Some(pk) => {
            let columns: Vec<&str> = pk.columns.iter().map(String::as_str).collect();
            lines.push(Line::code(format!(
                "builder.HasKey(e => {}).HasName(\"{}\");",
                key_expression("e", &columns),
                pk.name
            )));
        }
        None => {
            let message = format!(
                "table '{}' has no primary key; key declaration and key-based operations were not generated",
                table.qualified_name()
            );
            warn!(table = %table.qualified_name(), "{message}");
            lines.push(Line::warning(message));
        }
    }

    if let Some(identity) = &table.identity {
        lines.push(Line::code(format!(
            "{}.UseIdentityColumn({}, {});",
            property_line(&identity.column),
            identity.seed,
            identity.increment
        )));
    }

    lines.extend(table.columns.iter().map(column_line));
    lines.extend(concurrency_line(
        &table.columns,
        selection.concurrency_token.as_deref(),
    ));

    for unique in &table.uniques {
        let columns: Vec<&str> = unique.columns.iter().map(String::as_str).collect();
        lines.push(Line::code(format!(
            "builder.HasIndex(e => {}, \"{}\").IsUnique();",
            key_expression("e", &columns),
            unique.name
        )));
    }

    for resolution in ctx.relationships.foreign_keys(&table.qualified_name()) {
        match resolution {
            ForeignKeyResolution::Resolved(rel) => {
                lines.push(relationship_line(ctx, rel, selection.navigation_properties));
            }
            ForeignKeyResolution::Skipped(skipped) => {
                lines.push(Line::warning(skipped.to_string()));
            }
        }
    }

    lines
}

fn view_lines(ctx: &SynthesisContext<'_>, view: &View) -> Vec<Line> {
    let object = SchemaObject::View(view);
    let selection = ctx.selection(&view.qualified_name());
    let mut lines = vec![binding_line(ctx, &object)];

    let key = synthetic_view_key(ctx.db, view);
    if key.is_empty() {
        let message = format!(
            "view '{}' has no non-nullable columns to derive a key from; mapped as keyless",
            view.qualified_name()
        );
        warn!(view = %view.qualified_name(), "{message}");
        lines.push(Line::warning(message));
        lines.push(Line::code("builder.HasNoKey();"));
    } else {
        let columns: Vec<&str> = key.iter().map(|c| c.name.as_str()).collect();
        lines.push(Line::comment(
            "Synthetic key derived from non-nullable columns; uniqueness is not verified",
        ));
        lines.push(Line::code(format!(
            "builder.HasKey(e => {});",
            key_expression("e", &columns)
        )));
    }

    lines.extend(view.columns.iter().map(column_line));
    lines.extend(concurrency_line(
        &view.columns,
        selection.concurrency_token.as_deref(),
    ));
    lines
}

fn column_line(col: &Column) -> Line {
    let required = if col.is_nullable { "" } else { ".IsRequired()" };
    Line::code(format!(
        "{}.HasColumnName(\"{}\").HasColumnType(\"{}\"){required};",
        property_line(&col.name),
        col.name,
        storage_type(col)
    ))
}

fn concurrency_line(columns: &[Column], token: Option<&str>) -> Option<Line> {
    let token = token?;
    columns
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(token))
        .map(|c| Line::code(format!("{}.IsConcurrencyToken();", property_line(&c.name))))
}

fn relationship_line(ctx: &SynthesisContext<'_>, rel: &Relationship, navigations: bool) -> Line {
    let principal_key = ctx
        .db
        .table(&rel.principal)
        .map(|p| p.primary_key_columns())
        .unwrap_or_default();
    let principal_key_clause = match principal_key.as_slice() {
        [pk] if pk.name == rel.principal_column => String::new(),
        _ => format!(
            ".HasPrincipalKey(p => p.{})",
            type_identifier(&rel.principal_column)
        ),
    };

    let head = if navigations {
        format!(
            "builder.HasOne(e => e.{}).WithMany(p => p.{})",
            rel.reference_navigation, rel.collection_navigation
        )
    } else {
        format!(
            "builder.HasOne<{}>().WithMany()",
            ctx.entity(&rel.principal).qualified()
        )
    };

    Line::code(format!(
        "{head}{principal_key_clause}.HasForeignKey(e => e.{}).HasConstraintName(\"{}\");",
        type_identifier(&rel.column),
        rel.constraint
    ))
}
