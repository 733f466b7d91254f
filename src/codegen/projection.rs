//! Data-contract projections
//!
//! Plans the join composition behind a projected `Enumerate`: one join per
//! resolved foreign key, and a flattened field list made of the base
//! columns followed by the non-key columns of every joined table.
//! Outer-joined fields fall back to a type-specific default sentinel when
//! the related row is absent.

use std::collections::HashSet;

use crate::naming::{member_identifier, type_identifier};
use crate::relationships::{JoinKind, Relationship};
use crate::schema::{QualifiedName, SchemaObject, TypeCategory};

use super::SynthesisContext;

/// Sub-namespace holding data-contract classes
pub const NAMESPACE: &str = "DataContracts";

const QUERY_KEYWORDS: &[&str] = &[
    "from", "where", "select", "group", "into", "orderby", "join", "let", "in", "on", "equals",
    "by", "ascending", "descending", "base", "this", "new", "object", "string", "event",
    "operator", "default", "class", "params", "checked", "fixed", "lock",
];

/// Value used for an outer-joined field when the related row is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultSentinel {
    EmptyBytes,
    NullBoolean,
    EmptyString,
    NullDateTime,
    NullDateTimeOffset,
    NullTime,
    NullByte,
    NullInt16,
    NullInt32,
    NullInt64,
    NullDecimal,
    NullSingle,
    NullDouble,
    NullGuid,
    NullObject,
}

impl DefaultSentinel {
    pub fn for_category(category: TypeCategory) -> Self {
        match category {
            TypeCategory::Binary => DefaultSentinel::EmptyBytes,
            TypeCategory::Boolean => DefaultSentinel::NullBoolean,
            TypeCategory::Text => DefaultSentinel::EmptyString,
            TypeCategory::DateTime => DefaultSentinel::NullDateTime,
            TypeCategory::DateTimeOffset => DefaultSentinel::NullDateTimeOffset,
            TypeCategory::Time => DefaultSentinel::NullTime,
            TypeCategory::Int8 => DefaultSentinel::NullByte,
            TypeCategory::Int16 => DefaultSentinel::NullInt16,
            TypeCategory::Int32 => DefaultSentinel::NullInt32,
            TypeCategory::Int64 => DefaultSentinel::NullInt64,
            TypeCategory::Decimal => DefaultSentinel::NullDecimal,
            TypeCategory::Single => DefaultSentinel::NullSingle,
            TypeCategory::Double => DefaultSentinel::NullDouble,
            TypeCategory::Guid => DefaultSentinel::NullGuid,
            TypeCategory::Opaque => DefaultSentinel::NullObject,
        }
    }

    pub fn expression(self) -> &'static str {
        match self {
            DefaultSentinel::EmptyBytes => "Array.Empty<byte>()",
            DefaultSentinel::NullBoolean => "default(bool?)",
            DefaultSentinel::EmptyString => "string.Empty",
            DefaultSentinel::NullDateTime => "default(DateTime?)",
            DefaultSentinel::NullDateTimeOffset => "default(DateTimeOffset?)",
            DefaultSentinel::NullTime => "default(TimeSpan?)",
            DefaultSentinel::NullByte => "default(byte?)",
            DefaultSentinel::NullInt16 => "default(short?)",
            DefaultSentinel::NullInt32 => "default(int?)",
            DefaultSentinel::NullInt64 => "default(long?)",
            DefaultSentinel::NullDecimal => "default(decimal?)",
            DefaultSentinel::NullSingle => "default(float?)",
            DefaultSentinel::NullDouble => "default(double?)",
            DefaultSentinel::NullGuid => "default(Guid?)",
            DefaultSentinel::NullObject => "default(object)",
        }
    }
}

/// Range variable for a query clause (`order`, `shipper`)
pub fn range_variable(name: &str) -> String {
    let ident = member_identifier(name);
    if QUERY_KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}Row")
    } else {
        ident
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Base {
        column: String,
    },
    Joined {
        range_var: String,
        column: String,
        /// Present for outer joins only
        fallback: Option<DefaultSentinel>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionField {
    pub name: String,
    pub type_name: String,
    pub source: FieldSource,
}

impl ProjectionField {
    /// Right-hand side of the field's assignment in the projection
    pub fn expression(&self, base_var: &str) -> String {
        match &self.source {
            FieldSource::Base { column } => format!("{base_var}.{}", type_identifier(column)),
            FieldSource::Joined {
                range_var,
                column,
                fallback: None,
            } => format!("{range_var}.{}", type_identifier(column)),
            FieldSource::Joined {
                range_var,
                column,
                fallback: Some(sentinel),
            } => format!(
                "{range_var} == null ? {} : {range_var}.{}",
                sentinel.expression(),
                type_identifier(column)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub relationship: Relationship,
    pub target: QualifiedName,
    pub range_var: String,
    pub kind: JoinKind,
    pub source: String,
    /// `equals` operand type cast needed to compare a nullable key
    pub key_cast: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    pub base_var: String,
    pub base_source: String,
    pub contract: String,
    pub joins: Vec<JoinStep>,
    pub fields: Vec<ProjectionField>,
}

impl JoinPlan {
    pub fn build(ctx: &SynthesisContext<'_>, object: SchemaObject<'_>) -> Self {
        let qualified = object.qualified_name();
        let entity = ctx.entity(&qualified);
        let base_var = range_variable(&entity.name);

        let mut fields: Vec<ProjectionField> = object
            .columns()
            .iter()
            .map(|col| ProjectionField {
                name: type_identifier(&col.name),
                type_name: col.category().clr_type_nullable(col.is_nullable),
                source: FieldSource::Base {
                    column: col.name.clone(),
                },
            })
            .collect();
        let mut taken: HashSet<String> = fields.iter().map(|f| f.name.clone()).collect();

        let mut joins = vec![];
        for rel in ctx.relationships.resolved(&qualified) {
            let Some(target) = ctx.db.table(&rel.principal) else {
                continue;
            };
            let kind = rel.join_kind();
            let range_var = range_variable(&rel.reference_navigation);

            let dependent_column = object.columns().iter().find(|c| c.name == rel.column);
            let key_cast = match (kind, dependent_column) {
                (JoinKind::Outer, Some(col)) if col.category().is_value_type() => {
                    Some(col.category().clr_type_nullable(true))
                }
                _ => None,
            };

            let key_columns: HashSet<String> = target
                .primary_key_columns()
                .iter()
                .map(|c| c.name.clone())
                .collect();

            for col in target.columns.iter().filter(|c| !key_columns.contains(&c.name)) {
                let name = format!("{}{}", rel.reference_navigation, type_identifier(&col.name));
                if !taken.insert(name.clone()) {
                    continue;
                }
                let (type_name, fallback) = match kind {
                    JoinKind::Inner => (col.category().clr_type_nullable(col.is_nullable), None),
                    JoinKind::Outer => (
                        col.category().clr_type_nullable(true),
                        Some(DefaultSentinel::for_category(col.category())),
                    ),
                };
                fields.push(ProjectionField {
                    name,
                    type_name,
                    source: FieldSource::Joined {
                        range_var: range_var.clone(),
                        column: col.name.clone(),
                        fallback,
                    },
                });
            }

            joins.push(JoinStep {
                relationship: rel.clone(),
                target: rel.principal.clone(),
                range_var,
                kind,
                source: ctx.set_accessor(&rel.principal),
                key_cast,
            });
        }

        Self {
            base_var,
            base_source: ctx.set_accessor(&qualified),
            contract: ctx.type_ref(
                &entity,
                Some(NAMESPACE),
                &format!("{}DataContract", entity.name),
            ),
            joins,
            fields,
        }
    }

    /// Query-syntax lines assigning the composed projection to `query`
    pub fn query_lines(&self) -> Vec<String> {
        let base = &self.base_var;
        let mut lines = vec![format!("var query = from {base} in {}", self.base_source)];

        for join in &self.joins {
            let var = &join.range_var;
            let rel = &join.relationship;
            let principal = match &join.key_cast {
                Some(cast) => format!("({cast}){var}.{}", type_identifier(&rel.principal_column)),
                None => format!("{var}.{}", type_identifier(&rel.principal_column)),
            };
            let on = format!(
                "on {base}.{} equals {principal}",
                type_identifier(&rel.column)
            );
            match join.kind {
                JoinKind::Inner => {
                    lines.push(format!("    join {var} in {} {on}", join.source));
                }
                JoinKind::Outer => {
                    lines.push(format!(
                        "    join {var} in {} {on} into {var}Join",
                        join.source
                    ));
                    lines.push(format!("    from {var} in {var}Join.DefaultIfEmpty()"));
                }
            }
        }

        lines.push(format!("    select new {}", self.contract));
        lines.push("    {".to_string());
        for field in &self.fields {
            lines.push(format!(
                "        {} = {},",
                field.name,
                field.expression(base)
            ));
        }
        lines.push("    };".to_string());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::naming::NameRegistry;
    use crate::relationships::RelationshipGraph;
    use crate::selection::Selections;
    use crate::testing::{dbo, northwind};

    fn plan_for(name: &str) -> JoinPlan {
        let db = northwind();
        let config = GeneratorConfig::default();
        let selections = Selections::default();
        let names = NameRegistry::build(&db, &config.namespace);
        let relationships = RelationshipGraph::build(&db, &names);
        let ctx = SynthesisContext {
            db: &db,
            names: &names,
            relationships: &relationships,
            selections: &selections,
            config: &config,
        };
        JoinPlan::build(&ctx, db.find(&dbo(name)).unwrap())
    }

    #[test]
    fn test_every_category_has_a_sentinel() {
        let expected = [
            (TypeCategory::Text, "string.Empty"),
            (TypeCategory::Boolean, "default(bool?)"),
            (TypeCategory::Int8, "default(byte?)"),
            (TypeCategory::Int16, "default(short?)"),
            (TypeCategory::Int32, "default(int?)"),
            (TypeCategory::Int64, "default(long?)"),
            (TypeCategory::Decimal, "default(decimal?)"),
            (TypeCategory::Single, "default(float?)"),
            (TypeCategory::Double, "default(double?)"),
            (TypeCategory::DateTime, "default(DateTime?)"),
            (TypeCategory::DateTimeOffset, "default(DateTimeOffset?)"),
            (TypeCategory::Time, "default(TimeSpan?)"),
            (TypeCategory::Binary, "Array.Empty<byte>()"),
            (TypeCategory::Guid, "default(Guid?)"),
            (TypeCategory::Opaque, "default(object)"),
        ];
        assert_eq!(expected.len(), TypeCategory::ALL.len());
        for category in TypeCategory::ALL {
            let (_, expression) = expected
                .iter()
                .find(|(c, _)| *c == category)
                .unwrap_or_else(|| panic!("no expectation for {category:?}"));
            assert_eq!(DefaultSentinel::for_category(category).expression(), *expression);
        }
    }

    #[test]
    fn test_join_kinds_follow_nullability() {
        let plan = plan_for("Orders");
        let kinds: Vec<_> = plan
            .joins
            .iter()
            .map(|j| (j.range_var.as_str(), j.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("customer", JoinKind::Outer),
                ("employee", JoinKind::Inner),
                ("shipper", JoinKind::Outer),
            ]
        );
    }

    #[test]
    fn test_outer_joined_text_falls_back_to_empty_string() {
        let plan = plan_for("Orders");
        let field = plan
            .fields
            .iter()
            .find(|f| f.name == "ShipperContactName")
            .unwrap();
        assert_eq!(
            field.expression(&plan.base_var),
            "shipper == null ? string.Empty : shipper.ContactName"
        );
        assert_eq!(field.type_name, "string");
    }

    #[test]
    fn test_inner_joined_fields_have_no_fallback() {
        let plan = plan_for("Orders");
        let field = plan
            .fields
            .iter()
            .find(|f| f.name == "EmployeeLastName")
            .unwrap();
        assert_eq!(field.expression(&plan.base_var), "employee.LastName");
    }

    #[test]
    fn test_projection_fields() {
        let plan = plan_for("Orders");
        let names: Vec<_> = plan.fields.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(
            &names[..6],
            &["OrderId", "CustomerId", "EmployeeId", "OrderDate", "ShipVia", "Freight"]
        );
        // key columns of joined tables are not repeated
        assert!(!names.contains(&"ShipperShipperId"));
        assert!(!names.contains(&"CustomerCustomerId"));
        assert!(names.contains(&"CustomerCompanyName"));
        assert!(names.contains(&"EmployeeReportsTo"));
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_joined_fields_are_prefixed_by_navigation() {
        let plan = plan_for("Employees");
        let names: Vec<_> = plan.fields.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"EmployeeReportsToLastName"));
        assert!(names.contains(&"EmployeeReportsToFirstName"));
        assert!(!names.contains(&"EmployeeLastName"));
    }

    #[test]
    fn test_outer_joined_value_fields_become_nullable() {
        let plan = plan_for("Products");
        let field = plan
            .fields
            .iter()
            .find(|f| f.name == "CategoryPicture")
            .unwrap();
        assert_eq!(field.type_name, "byte[]");
        assert_eq!(
            field.expression(&plan.base_var),
            "category == null ? Array.Empty<byte>() : category.Picture"
        );
    }

    #[test]
    fn test_query_lines() {
        let plan = plan_for("Orders");
        let lines = plan.query_lines();
        assert_eq!(lines[0], "var query = from order in _context.Orders");
        assert_eq!(
            lines[1],
            "    join customer in _context.Customers on order.CustomerId equals customer.CustomerId into customerJoin"
        );
        assert_eq!(lines[2], "    from customer in customerJoin.DefaultIfEmpty()");
        assert_eq!(
            lines[3],
            "    join employee in _context.Employees on order.EmployeeId equals employee.EmployeeId"
        );
        assert_eq!(
            lines[4],
            "    join shipper in _context.Shippers on order.ShipVia equals (int?)shipper.ShipperId into shipperJoin"
        );
        assert_eq!(lines[6], "    select new OrderDataContract");
        assert_eq!(lines.last().map(String::as_str), Some("    };"));
    }

    #[test]
    fn test_range_variable_escapes_query_keywords() {
        assert_eq!(range_variable("Group"), "groupRow");
        assert_eq!(range_variable("Order"), "order");
    }
}
