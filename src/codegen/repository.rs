//! Repository query objects
//!
//! Each table gets a repository class and a matching interface with
//! `Enumerate`, `FetchOne`, one `FetchBy...` per unique constraint, and
//! `Add`/`Update`/`Remove`. Views only get `Enumerate`. When projection is
//! selected, `Enumerate` composes joins into a flattened data contract that
//! is emitted as its own unit.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::projection::{self, JoinPlan};
use super::{SynthesisContext, Synthesizer, CONTEXT_FIELD};
use crate::artifact::{
    Artifact, ClassDef, CodeUnit, ConstructorDef, Declaration, FieldDef, InterfaceDef, Line,
    Member, MethodDef, Modifier, Parameter, PropertyDef, UnitKind,
};
use crate::naming::{parameter_name, type_identifier, TypeName};
use crate::relationships::ForeignKeyResolution;
use crate::schema::{Column, SchemaObject, Table, TypeCategory};
use crate::selection::ProjectSelection;

/// Sub-namespace holding repositories and their interfaces
pub const NAMESPACE: &str = "Repositories";

pub struct RepositorySynthesizer;

impl Synthesizer for RepositorySynthesizer {
    fn synthesize(&self, ctx: &SynthesisContext<'_>, object: SchemaObject<'_>) -> Vec<CodeUnit> {
        let qualified = object.qualified_name();
        let entity = ctx.entity(&qualified);
        let selection = ctx.selection(&qualified);
        let namespace = format!("{}.{NAMESPACE}", entity.namespace);

        let plan = selection
            .data_contract_projection
            .then(|| JoinPlan::build(ctx, object));

        let builder = OperationBuilder {
            ctx,
            object,
            namespace: &namespace,
            set: ctx.set_accessor(&qualified),
        };

        let mut operations = vec![Member::Method(builder.enumerate(plan.as_ref()))];
        if let Some(table) = object.as_table() {
            operations.push(builder.fetch_one(table, selection));
            operations.extend(builder.fetch_by_unique(table));
            operations.push(Member::Method(builder.add(table)));
            operations.push(builder.mutation(table, "Update"));
            operations.push(builder.mutation(table, "Remove"));
        }
        debug!(object = %qualified, operations = operations.len(), "Synthesized repository");

        let class_name = format!("{}Repository", entity.name);
        let interface_name = format!("I{class_name}");

        let mut interface = InterfaceDef::new(
            Declaration::new(&interface_name, &namespace)
                .with_doc(format!("Data access for {qualified}"))
                .with_modifiers(&[Modifier::Public]),
        );
        interface.members = operations
            .iter()
            .filter_map(|m| match m {
                Member::Method(method) => Some(Member::Method(method.signature())),
                _ => None,
            })
            .collect();

        let mut class = ClassDef::new(
            Declaration::new(&class_name, &namespace)
                .with_modifiers(&[Modifier::Public, Modifier::Partial]),
        );
        class.base_types.push(interface_name);
        class.members.push(context_field(ctx, &namespace));
        class.members.push(constructor(ctx, &class_name, &namespace));
        class.members.extend(operations);

        let mut unit = CodeUnit::new(UnitKind::Repository, Some(qualified.clone()));
        unit.artifacts.push(Artifact::Interface(interface));
        unit.artifacts.push(Artifact::Class(class));

        let mut units = vec![unit];
        if let Some(plan) = &plan {
            let mut contract = CodeUnit::new(UnitKind::DataContract, Some(qualified));
            contract
                .artifacts
                .push(Artifact::Class(data_contract(&entity, plan)));
            units.push(contract);
        }
        units
    }
}

fn context_field(ctx: &SynthesisContext<'_>, namespace: &str) -> Member {
    Member::Field(FieldDef {
        decl: Declaration::new(CONTEXT_FIELD, namespace)
            .with_modifiers(&[Modifier::Private, Modifier::ReadOnly]),
        type_name: ctx.config.context_name.clone(),
        lines: vec![],
    })
}

fn constructor(ctx: &SynthesisContext<'_>, class_name: &str, namespace: &str) -> Member {
    Member::Constructor(ConstructorDef {
        decl: Declaration::new(class_name, namespace).with_modifiers(&[Modifier::Public]),
        parameters: vec![Parameter::new("context", &ctx.config.context_name)],
        lines: vec![Line::code(format!("{CONTEXT_FIELD} = context;"))],
    })
}

/// Flattened read shape, one property per projection field
fn data_contract(entity: &TypeName, plan: &JoinPlan) -> ClassDef {
    let namespace = format!("{}.{}", entity.namespace, projection::NAMESPACE);
    let mut class = ClassDef::new(
        Declaration::new(format!("{}DataContract", entity.name), &namespace)
            .with_doc(format!("Flattened read model for {}", entity.name))
            .with_modifiers(&[Modifier::Public, Modifier::Partial]),
    );
    class.members = plan
        .fields
        .iter()
        .map(|field| {
            Member::Property(PropertyDef {
                decl: Declaration::new(&field.name, &namespace).with_modifiers(&[Modifier::Public]),
                type_name: field.type_name.clone(),
                lines: vec![],
            })
        })
        .collect();
    class
}

/// Equality predicate over `columns`, one parameter per column
fn key_lookup(columns: &[&Column]) -> (Vec<Parameter>, String) {
    let parameters = columns
        .iter()
        .map(|c| Parameter::new(parameter_name(&c.name), c.category().clr_type()))
        .collect();
    let predicate = columns
        .iter()
        .map(|c| format!("e.{} == {}", type_identifier(&c.name), parameter_name(&c.name)))
        .collect::<Vec<_>>()
        .join(" && ");
    (parameters, predicate)
}

/// Guard and predicate lines for one optional filter parameter
fn filter_lines(col: &Column) -> Vec<Line> {
    let param = parameter_name(&col.name);
    let property = type_identifier(&col.name);
    let category = col.category();

    let (guard, value) = if category == TypeCategory::Text {
        (format!("if (!string.IsNullOrEmpty({param}))"), param.clone())
    } else if category.is_value_type() {
        (format!("if ({param}.HasValue)"), format!("{param}.Value"))
    } else {
        (format!("if ({param} != null)"), param.clone())
    };

    vec![
        Line::code(guard),
        Line::code(format!("    query = query.Where(e => e.{property} == {value});")),
    ]
}

struct OperationBuilder<'c, 'a> {
    ctx: &'c SynthesisContext<'a>,
    object: SchemaObject<'c>,
    namespace: &'c str,
    set: String,
}

impl OperationBuilder<'_, '_> {
    fn method(&self, name: impl Into<String>, return_type: impl Into<String>) -> MethodDef {
        MethodDef::new(
            Declaration::new(name, self.namespace).with_modifiers(&[Modifier::Public]),
            return_type,
        )
    }

    fn entity_ref(&self) -> String {
        self.ctx.entity_ref(&self.object.qualified_name())
    }

    fn enumerate(&self, plan: Option<&JoinPlan>) -> MethodDef {
        let qualified = self.object.qualified_name();
        let row_type = match plan {
            Some(plan) => plan.contract.clone(),
            None => self.entity_ref(),
        };
        let mut method = self.method("Enumerate", format!("IQueryable<{row_type}>"));

        match plan {
            Some(plan) => method
                .lines
                .extend(plan.query_lines().into_iter().map(Line::Code)),
            None => method
                .lines
                .push(Line::code(format!("var query = {}.AsQueryable();", self.set))),
        }

        let mut filtered = HashSet::new();
        for resolution in self.ctx.relationships.foreign_keys(&qualified) {
            match resolution {
                ForeignKeyResolution::Resolved(rel) => {
                    if !filtered.insert(rel.column.as_str()) {
                        continue;
                    }
                    let Some(col) = self.object.columns().iter().find(|c| c.name == rel.column)
                    else {
                        continue;
                    };
                    method.parameters.push(
                        Parameter::new(
                            parameter_name(&col.name),
                            col.category().clr_type_nullable(true),
                        )
                        .optional("null"),
                    );
                    method.lines.extend(filter_lines(col));
                }
                ForeignKeyResolution::Skipped(skipped) => {
                    method.lines.push(Line::warning(skipped.to_string()));
                }
            }
        }

        method.lines.push(Line::code("return query;"));
        method
    }

    fn fetch_one(&self, table: &Table, selection: &ProjectSelection) -> Member {
        let qualified = table.qualified_name();
        let key = table.primary_key_columns();
        let lookup = if !key.is_empty() {
            key
        } else if let Some(identity) = table.identity_column() {
            vec![identity]
        } else {
            let message = format!(
                "table '{qualified}' has no primary key or identity column; FetchOne not generated"
            );
            warn!(table = %qualified, "{message}");
            return Member::Warning(message);
        };

        let (parameters, predicate) = key_lookup(&lookup);
        let mut method = self.method("FetchOne", self.entity_ref());
        method.parameters = parameters;

        let mut includes = vec![];
        if selection.data_contract_projection {
            let relationships: Vec<_> = self.ctx.relationships.resolved(&qualified).collect();
            if selection.navigation_properties {
                includes = relationships
                    .iter()
                    .map(|rel| format!("    .Include(e => e.{})", rel.reference_navigation))
                    .collect();
            } else if !relationships.is_empty() {
                let message = format!(
                    "navigation properties are disabled for '{qualified}'; related data is not eager-loaded"
                );
                warn!(table = %qualified, "{message}");
                method.lines.push(Line::warning(message));
            }
        }

        if includes.is_empty() {
            method.lines.push(Line::code(format!(
                "return {}.FirstOrDefault(e => {predicate});",
                self.set
            )));
        } else {
            method.lines.push(Line::code(format!("return {}", self.set)));
            method.lines.extend(includes.into_iter().map(Line::Code));
            method
                .lines
                .push(Line::code(format!("    .FirstOrDefault(e => {predicate});")));
        }
        Member::Method(method)
    }

    fn fetch_by_unique(&self, table: &Table) -> Vec<Member> {
        let mut seen = HashSet::new();
        let mut members = vec![];

        for unique in &table.uniques {
            let columns: Vec<&Column> = unique
                .columns
                .iter()
                .filter_map(|name| table.column(name))
                .collect();
            let name = format!(
                "FetchBy{}",
                columns
                    .iter()
                    .map(|c| type_identifier(&c.name))
                    .collect::<Vec<_>>()
                    .join("And")
            );
            if !seen.insert(name.clone()) {
                debug!(table = %table.qualified_name(), constraint = ?unique.name, "Duplicate unique lookup");
                continue;
            }

            let (parameters, predicate) = key_lookup(&columns);
            let mut method = self.method(name, self.entity_ref());
            method.parameters = parameters;
            method.lines.push(Line::code(format!(
                "return {}.FirstOrDefault(e => {predicate});",
                self.set
            )));
            members.push(Member::Method(method));
        }
        members
    }

    fn add(&self, table: &Table) -> MethodDef {
        let mut method = self.method("Add", "int");
        method
            .parameters
            .push(Parameter::new("entity", self.entity_ref()));

        if let [key] = table.primary_key_columns().as_slice() {
            if key.category() == TypeCategory::Guid {
                method.lines.push(Line::code(format!(
                    "entity.{} = Guid.NewGuid();",
                    type_identifier(&key.name)
                )));
            }
        }
        method
            .lines
            .push(Line::code(format!("{}.Add(entity);", self.set)));
        method
            .lines
            .push(Line::code(format!("return {CONTEXT_FIELD}.SaveChanges();")));
        method
    }

    /// `Update` or `Remove`; both need a primary key
    fn mutation(&self, table: &Table, operation: &str) -> Member {
        if table.primary_key.is_none() {
            let message = format!(
                "table '{}' has no primary key; {operation} not generated",
                table.qualified_name()
            );
            warn!(table = %table.qualified_name(), "{message}");
            return Member::Warning(message);
        }

        let mut method = self.method(operation, "int");
        method
            .parameters
            .push(Parameter::new("entity", self.entity_ref()));
        method
            .lines
            .push(Line::code(format!("{}.{operation}(entity);", self.set)));
        method
            .lines
            .push(Line::code(format!("return {CONTEXT_FIELD}.SaveChanges();")));
        Member::Method(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::naming::NameRegistry;
    use crate::relationships::RelationshipGraph;
    use crate::schema::{DataType, Database, Identity, KeyConstraint, QualifiedName};
    use crate::selection::Selections;
    use crate::testing::{dbo, fk, int, keyed_table, northwind, nvarchar, transfers};

    fn synthesize(db: &Database, selections: &Selections, object: &QualifiedName) -> Vec<CodeUnit> {
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
        RepositorySynthesizer.synthesize(&ctx, db.find(object).unwrap())
    }

    fn repository(db: &Database, selections: &Selections, object: &QualifiedName) -> ClassDef {
        let units = synthesize(db, selections, object);
        units[0]
            .artifacts
            .iter()
            .find_map(|a| match a {
                Artifact::Class(c) => Some(c.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn texts(method: &MethodDef) -> Vec<String> {
        method.lines.iter().map(|l| l.text().to_string()).collect()
    }

    fn projected() -> Selections {
        Selections::new(ProjectSelection {
            data_contract_projection: true,
            ..ProjectSelection::default()
        })
    }

    #[test]
    fn test_enumerate_filters_by_foreign_keys() {
        let db = northwind();
        let class = repository(&db, &Selections::default(), &dbo("Orders"));
        let enumerate = class.method("Enumerate").unwrap();

        let params: Vec<_> = enumerate
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str(), p.default_value.as_deref()))
            .collect();
        assert_eq!(
            params,
            vec![
                ("customerId", "string", Some("null")),
                ("employeeId", "int?", Some("null")),
                ("shipVia", "int?", Some("null")),
            ]
        );

        let lines = texts(enumerate);
        assert_eq!(lines[0], "var query = _context.Orders.AsQueryable();");
        assert_eq!(lines[1], "if (!string.IsNullOrEmpty(customerId))");
        assert_eq!(lines[2], "    query = query.Where(e => e.CustomerId == customerId);");
        assert_eq!(lines[5], "if (shipVia.HasValue)");
        assert_eq!(lines[6], "    query = query.Where(e => e.ShipVia == shipVia.Value);");
        assert_eq!(lines.last().map(String::as_str), Some("return query;"));
    }

    #[test]
    fn test_projected_enumerate_and_contract() {
        let db = northwind();
        let units = synthesize(&db, &projected(), &dbo("Orders"));
        assert_eq!(units.len(), 2);

        let class = units[0].class("OrderRepository").unwrap();
        let enumerate = class.method("Enumerate").unwrap();
        assert_eq!(enumerate.return_type, "IQueryable<OrderDataContract>");
        assert!(texts(enumerate)
            .iter()
            .any(|l| l.contains("from shipper in shipperJoin.DefaultIfEmpty()")));

        assert_eq!(units[1].kind, UnitKind::DataContract);
        let contract = units[1].class("OrderDataContract").unwrap();
        assert_eq!(contract.decl.namespace, "DataAccess.DataContracts");
        let shipper_contact = contract.property("ShipperContactName").unwrap();
        assert_eq!(shipper_contact.type_name, "string");
        assert!(contract.property("OrderId").is_some());
    }

    #[test]
    fn test_fetch_one_by_composite_key() {
        let db = northwind();
        let class = repository(&db, &Selections::default(), &dbo("Order Details"));
        let fetch = class.method("FetchOne").unwrap();
        assert_eq!(fetch.return_type, "OrderDetail");
        assert_eq!(
            texts(fetch),
            vec!["return _context.OrderDetails.FirstOrDefault(e => e.OrderId == orderId && e.ProductId == productId);"]
        );
        let params: Vec<_> = fetch.parameters.iter().map(|p| p.type_name.as_str()).collect();
        assert_eq!(params, vec!["int", "int"]);
    }

    #[test]
    fn test_fetch_one_includes_relationships_under_projection() {
        let db = northwind();
        let class = repository(&db, &projected(), &dbo("Orders"));
        let lines = texts(class.method("FetchOne").unwrap());
        assert_eq!(
            lines,
            vec![
                "return _context.Orders",
                "    .Include(e => e.Customer)",
                "    .Include(e => e.Employee)",
                "    .Include(e => e.Shipper)",
                "    .FirstOrDefault(e => e.OrderId == orderId);",
            ]
        );
    }

    #[test]
    fn test_fetch_one_falls_back_to_identity() {
        let mut audit = Table::new(
            "dbo",
            "Audit",
            vec![int("AuditID", false), nvarchar("Message", 200, false)],
        );
        audit.identity = Some(Identity {
            column: "AuditID".to_string(),
            seed: 1,
            increment: 1,
        });
        let db = Database::new("db", "dbo", vec![audit], vec![]).unwrap();

        let class = repository(&db, &Selections::default(), &dbo("Audit"));
        let fetch = class.method("FetchOne").unwrap();
        assert_eq!(
            texts(fetch),
            vec!["return _context.Audits.FirstOrDefault(e => e.AuditId == auditId);"]
        );
        // no primary key, so no mutations
        assert!(class.method("Update").is_none());
        assert!(class.method("Remove").is_none());
        assert_eq!(class.warnings().len(), 2);
        assert!(class.method("Add").is_some());
    }

    #[test]
    fn test_fetch_by_unique_constraint() {
        let db = northwind();
        let class = repository(&db, &Selections::default(), &dbo("Categories"));
        let fetch = class.method("FetchByCategoryName").unwrap();
        assert_eq!(fetch.parameters[0].name, "categoryName");
        assert_eq!(
            texts(fetch),
            vec!["return _context.Categories.FirstOrDefault(e => e.CategoryName == categoryName);"]
        );
    }

    #[test]
    fn test_add_generates_guid_keys_only() {
        let mut documents = Table::new(
            "dbo",
            "Documents",
            vec![
                Column::new("DocumentID", DataType::UniqueIdentifier, false),
                nvarchar("Title", 100, false),
            ],
        );
        documents.primary_key = Some(KeyConstraint::new("PK_Documents", &["DocumentID"]));
        let db = Database::new("db", "dbo", vec![documents], vec![]).unwrap();

        let class = repository(&db, &Selections::default(), &dbo("Documents"));
        assert_eq!(
            texts(class.method("Add").unwrap()),
            vec![
                "entity.DocumentId = Guid.NewGuid();",
                "_context.Documents.Add(entity);",
                "return _context.SaveChanges();",
            ]
        );

        let db = northwind();
        let class = repository(&db, &Selections::default(), &dbo("Shippers"));
        assert_eq!(
            texts(class.method("Add").unwrap()),
            vec!["_context.Shippers.Add(entity);", "return _context.SaveChanges();"]
        );
    }

    #[test]
    fn test_composite_foreign_key_skipped_in_enumerate() {
        let mut parents = keyed_table("Parents", vec![int("A", false), int("B", false)]);
        parents.primary_key = Some(KeyConstraint::new("PK_Parents", &["A", "B"]));
        let owners = keyed_table("Owners", vec![int("OwnerID", false)]);
        let mut children = keyed_table(
            "Children",
            vec![
                int("ChildID", false),
                int("ParentA", false),
                int("ParentB", false),
                int("OwnerID", true),
            ],
        );
        children.foreign_keys = vec![
            fk("FK_Children_Parents", &["ParentA", "ParentB"], "Parents"),
            fk("FK_Children_Owners", &["OwnerID"], "Owners"),
        ];
        let db = Database::new("db", "dbo", vec![parents, owners, children], vec![]).unwrap();

        let class = repository(&db, &Selections::default(), &dbo("Children"));
        let enumerate = class.method("Enumerate").unwrap();
        assert!(enumerate.has_warning());
        assert!(enumerate.lines[1].text().contains("FK_Children_Parents"));
        assert_eq!(enumerate.parameters.len(), 1);
        assert_eq!(enumerate.parameters[0].name, "ownerId");
        assert!(class.method("Update").is_some());
    }

    #[test]
    fn test_enumerate_filters_by_keys_to_same_named_entities() {
        let db = transfers();
        let class = repository(&db, &Selections::default(), &dbo("Transfers"));
        let enumerate = class.method("Enumerate").unwrap();

        let params: Vec<_> = enumerate.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["accountId", "legacyAccountId"]);
        assert!(!enumerate.has_warning());
    }

    #[test]
    fn test_views_only_enumerate() {
        let db = northwind();
        let units = synthesize(&db, &Selections::default(), &dbo("Current Product List"));
        let class = units[0].class("CurrentProductListRepository").unwrap();
        let names: Vec<_> = class.methods().map(|m| m.decl.name.as_str()).collect();
        assert_eq!(names, vec!["Enumerate"]);
        let interface = units[0].interface("ICurrentProductListRepository").unwrap();
        assert_eq!(interface.methods().count(), 1);
    }

    #[test]
    fn test_interface_mirrors_class_operations() {
        let db = northwind();
        let units = synthesize(&db, &Selections::default(), &dbo("Products"));
        let class = units[0].class("ProductRepository").unwrap();
        let interface = units[0].interface("IProductRepository").unwrap();

        let class_ops: Vec<_> = class.methods().map(|m| m.signature()).collect();
        let interface_ops: Vec<_> = interface.methods().cloned().collect();
        assert_eq!(class_ops, interface_ops);
        assert_eq!(class.base_types, vec!["IProductRepository".to_string()]);
    }

    #[test]
    fn test_generic_set_without_db_set_properties() {
        let db = northwind();
        let selections = Selections::new(ProjectSelection {
            db_set_properties: false,
            ..ProjectSelection::default()
        });
        let class = repository(&db, &selections, &dbo("Shippers"));
        assert_eq!(
            texts(class.method("Enumerate").unwrap())[0],
            "var query = _context.Set<Shipper>().AsQueryable();"
        );
    }
}
