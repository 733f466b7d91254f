//! Database context
//!
//! One context class per run, living in the root namespace. It exposes a
//! database-set property for every object whose selection asks for one and
//! applies every mapping configuration in schema order.

use tracing::debug;

use super::{mapping, SynthesisContext};
use crate::artifact::{
    Artifact, ClassDef, CodeUnit, ConstructorDef, Declaration, Line, Member, MethodDef, Modifier,
    Parameter, PropertyDef, UnitKind,
};

pub struct ContextSynthesizer;

impl ContextSynthesizer {
    pub fn synthesize(&self, ctx: &SynthesisContext<'_>) -> CodeUnit {
        let namespace = ctx.config.namespace.as_str();
        let name = ctx.config.context_name.as_str();

        let mut class = ClassDef::new(
            Declaration::new(name, namespace)
                .with_doc(format!("Session over the {} database", ctx.db.name))
                .with_modifiers(&[Modifier::Public, Modifier::Partial]),
        );
        class.base_types.push("DbContext".to_string());

        class.members.push(Member::Constructor(ConstructorDef {
            decl: Declaration::new(name, namespace).with_modifiers(&[Modifier::Public]),
            parameters: vec![Parameter::new("options", format!("DbContextOptions<{name}>"))],
            lines: vec![Line::code(": base(options)")],
        }));

        let mut on_model_creating = MethodDef::new(
            Declaration::new("OnModelCreating", namespace)
                .with_modifiers(&[Modifier::Protected, Modifier::Override]),
            "void",
        );
        on_model_creating
            .parameters
            .push(Parameter::new("modelBuilder", "ModelBuilder"));

        for object in ctx.db.objects() {
            let qualified = object.qualified_name();
            let entity = ctx.entity(&qualified);

            if ctx.selection(&qualified).db_set_properties {
                class.members.push(Member::Property(PropertyDef {
                    decl: Declaration::new(ctx.db_set_name(&qualified), namespace)
                        .with_modifiers(&[Modifier::Public, Modifier::Virtual]),
                    type_name: format!("DbSet<{}>", ctx.entity_ref(&qualified)),
                    lines: vec![],
                }));
            }

            let configuration = ctx.type_ref(
                &entity,
                Some(mapping::NAMESPACE),
                &format!("{}Configuration", entity.name),
            );
            on_model_creating.lines.push(Line::code(format!(
                "modelBuilder.ApplyConfiguration(new {configuration}());"
            )));
        }

        debug!(
            context = ?name,
            members = class.members.len() + 1,
            "Synthesized context"
        );
        class.members.push(Member::Method(on_model_creating));

        let mut unit = CodeUnit::new(UnitKind::Context, None);
        unit.artifacts.push(Artifact::Class(class));
        unit
    }
}
