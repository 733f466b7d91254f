//! Entity classes
//!
//! One class per table or view with a property per column. Navigation
//! properties on both ends of a relationship follow the dependent table's
//! selection so that they always agree with the mapping configuration.

use tracing::debug;

use super::mapping::storage_type;
use super::{SynthesisContext, Synthesizer};
use crate::artifact::{
    Artifact, ClassDef, CodeUnit, ConstructorDef, Declaration, Line, Member, Modifier, PropertyDef,
    UnitKind,
};
use crate::naming::type_identifier;
use crate::schema::{Column, SchemaObject, TypeCategory};

pub struct EntitySynthesizer;

impl Synthesizer for EntitySynthesizer {
    fn synthesize(&self, ctx: &SynthesisContext<'_>, object: SchemaObject<'_>) -> Vec<CodeUnit> {
        let qualified = object.qualified_name();
        let entity = ctx.entity(&qualified);
        let selection = ctx.selection(&qualified);

        let mut decl = Declaration::new(&entity.name, &entity.namespace)
            .with_doc(format!("Row of {qualified}"))
            .with_modifiers(&[Modifier::Public, Modifier::Partial]);
        if selection.data_annotations {
            decl = match ctx.schema_argument(&object) {
                Some(schema) => {
                    decl.with_attribute(format!("Table(\"{}\", Schema = \"{schema}\")", object.name()))
                }
                None => decl.with_attribute(format!("Table(\"{}\")", object.name())),
            };
        }
        let mut class = ClassDef::new(decl);

        let single_key = match object.as_table().map(|t| t.primary_key_columns()) {
            Some(key) if key.len() == 1 => Some(key[0].name.clone()),
            _ => None,
        };

        for col in object.columns() {
            let mut decl = Declaration::new(type_identifier(&col.name), &entity.namespace)
                .with_modifiers(&[Modifier::Public]);
            if selection.data_annotations {
                for attribute in annotations(col, single_key.as_deref() == Some(col.name.as_str())) {
                    decl = decl.with_attribute(attribute);
                }
            }
            class.members.push(Member::Property(PropertyDef {
                decl,
                type_name: col.category().clr_type_nullable(col.is_nullable),
                lines: vec![],
            }));
        }

        let mut collections = vec![];
        if let Some(table) = object.as_table() {
            if selection.navigation_properties {
                for rel in ctx.relationships.resolved(&qualified) {
                    class.members.push(Member::Property(PropertyDef {
                        decl: Declaration::new(&rel.reference_navigation, &entity.namespace)
                            .with_modifiers(&[Modifier::Public, Modifier::Virtual]),
                        type_name: ctx.entity_ref(&rel.principal),
                        lines: vec![],
                    }));
                }
            }

            for rel in ctx.relationships.inverse(&table.qualified_name()) {
                if !ctx.selection(&rel.dependent).navigation_properties {
                    continue;
                }
                let dependent = ctx.entity_ref(&rel.dependent);
                class.members.push(Member::Property(PropertyDef {
                    decl: Declaration::new(&rel.collection_navigation, &entity.namespace)
                        .with_modifiers(&[Modifier::Public, Modifier::Virtual]),
                    type_name: format!("ICollection<{dependent}>"),
                    lines: vec![],
                }));
                collections.push(Line::code(format!(
                    "{} = new HashSet<{dependent}>();",
                    rel.collection_navigation
                )));
            }
        }

        if !collections.is_empty() {
            let ctor = Member::Constructor(ConstructorDef {
                decl: Declaration::new(&entity.name, &entity.namespace)
                    .with_modifiers(&[Modifier::Public]),
                parameters: vec![],
                lines: collections,
            });
            class.members.insert(0, ctor);
        }

        debug!(
            object = %qualified,
            entity = ?entity.name,
            members = class.members.len(),
            "Synthesized entity"
        );

        let mut unit = CodeUnit::new(UnitKind::Entity, Some(qualified));
        unit.artifacts.push(Artifact::Class(class));
        vec![unit]
    }
}

fn annotations(col: &Column, is_key: bool) -> Vec<String> {
    let mut attributes = vec![];
    if is_key {
        attributes.push("Key".to_string());
    }
    if !col.is_nullable && !col.category().is_value_type() {
        attributes.push("Required".to_string());
    }
    if col.category() == TypeCategory::Text && col.data_type.is_length_qualified() {
        if let Some(length) = col.length.filter(|l| *l > 0) {
            attributes.push(format!("StringLength({length})"));
        }
    }
    attributes.push(format!(
        "Column(\"{}\", TypeName = \"{}\")",
        col.name,
        storage_type(col)
    ));
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::naming::NameRegistry;
    use crate::relationships::RelationshipGraph;
    use crate::schema::{Database, QualifiedName};
    use crate::selection::{ProjectSelection, Selections};
    use crate::testing::{dbo, northwind};

    fn entity(db: &Database, selections: &Selections, object: &QualifiedName) -> ClassDef {
        let config = GeneratorConfig::default();
        let names = NameRegistry::build(db, &config.namespace);
        let relationships = RelationshipGraph::build(db, &names);
        let ctx = SynthesisContext {
            db,
            names: &names,
            relationships: &relationships,
            selections,
            config: &config,
        };
        let units = EntitySynthesizer.synthesize(&ctx, db.find(object).unwrap());
        match &units[0].artifacts[0] {
            Artifact::Class(c) => c.clone(),
            other => panic!("unexpected artifact {other:?}"),
        }
    }

    #[test]
    fn test_property_types_follow_nullability() {
        let db = northwind();
        let class = entity(&db, &Selections::default(), &dbo("Orders"));
        assert_eq!(class.decl.name, "Order");
        assert_eq!(class.decl.namespace, "DataAccess");

        let ty = |name: &str| class.property(name).unwrap().type_name.clone();
        assert_eq!(ty("OrderId"), "int");
        assert_eq!(ty("CustomerId"), "string");
        assert_eq!(ty("ShipVia"), "int?");
        assert_eq!(ty("OrderDate"), "DateTime?");
        assert_eq!(ty("Freight"), "decimal?");
        assert_eq!(ty("Shipper"), "Shipper");
    }

    #[test]
    fn test_collections_are_initialized() {
        let db = northwind();
        let class = entity(&db, &Selections::default(), &dbo("Employees"));

        assert_eq!(
            class.property("EmployeesReportsTo").unwrap().type_name,
            "ICollection<Employee>"
        );
        assert_eq!(class.property("Orders").unwrap().type_name, "ICollection<Order>");
        let ctor = match &class.members[0] {
            Member::Constructor(ctor) => ctor,
            other => panic!("expected constructor, got {other:?}"),
        };
        let lines: Vec<_> = ctor.lines.iter().map(Line::text).collect();
        assert_eq!(
            lines,
            vec![
                "EmployeesReportsTo = new HashSet<Employee>();",
                "Orders = new HashSet<Order>();",
            ]
        );
    }

    #[test]
    fn test_navigation_properties_can_be_disabled() {
        let db = northwind();
        let selections = Selections::new(ProjectSelection {
            navigation_properties: false,
            ..ProjectSelection::default()
        });
        let class = entity(&db, &selections, &dbo("Shippers"));
        assert!(class.property("Orders").is_none());
        assert!(class
            .members
            .iter()
            .all(|m| !matches!(m, Member::Constructor(_))));
        assert_eq!(class.properties().count(), 3);
    }

    #[test]
    fn test_data_annotations() {
        let db = northwind();
        let selections = Selections::new(ProjectSelection {
            data_annotations: true,
            ..ProjectSelection::default()
        });
        let class = entity(&db, &selections, &dbo("Categories"));
        assert_eq!(class.decl.attributes, vec!["Table(\"Categories\")".to_string()]);

        let attributes = |name: &str| class.property(name).unwrap().decl.attributes.clone();
        assert_eq!(
            attributes("CategoryId"),
            vec!["Key", "Column(\"CategoryID\", TypeName = \"int\")"]
        );
        assert_eq!(
            attributes("CategoryName"),
            vec![
                "Required",
                "StringLength(15)",
                "Column(\"CategoryName\", TypeName = \"nvarchar(15)\")",
            ]
        );
        assert_eq!(
            attributes("Description"),
            vec!["Column(\"Description\", TypeName = \"ntext\")"]
        );
    }

    #[test]
    fn test_composite_key_has_no_key_attribute() {
        let db = northwind();
        let selections = Selections::new(ProjectSelection {
            data_annotations: true,
            ..ProjectSelection::default()
        });
        let class = entity(&db, &selections, &dbo("Order Details"));
        assert_eq!(class.decl.name, "OrderDetail");
        assert!(class
            .properties()
            .all(|p| !p.decl.attributes.contains(&"Key".to_string())));
        assert_eq!(class.decl.attributes, vec!["Table(\"Order Details\")".to_string()]);
    }

    #[test]
    fn test_view_entity_has_no_navigations() {
        let db = northwind();
        let class = entity(&db, &Selections::default(), &dbo("Current Product List"));
        let names: Vec<_> = class.properties().map(|p| p.decl.name.as_str()).collect();
        assert_eq!(names, vec!["ProductId", "ProductName"]);
    }
}
