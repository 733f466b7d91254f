//! Code generation
//!
//! This module walks the schema snapshot and synthesizes the data-access
//! artifact tree: entity classes, mapping configurations, repositories (with
//! optional data-contract projections) and one database context.

use tracing::{debug, info, warn};

use crate::artifact::{Artifact, ArtifactTree, ArtifactVisitor, CodeUnit, Line};
use crate::config::GeneratorConfig;
use crate::naming::{pluralize, type_identifier, NameRegistry, TypeName};
use crate::relationships::RelationshipGraph;
use crate::schema::{Database, QualifiedName, SchemaObject};
use crate::selection::{ProjectSelection, Selections};

pub mod context;
pub mod entity;
pub mod mapping;
pub mod projection;
pub mod repository;

pub use context::ContextSynthesizer;
pub use entity::EntitySynthesizer;
pub use mapping::MappingSynthesizer;
pub use repository::RepositorySynthesizer;

/// Name of the context field held by every repository
pub(crate) const CONTEXT_FIELD: &str = "_context";

/// Everything a synthesizer may read during one run
pub struct SynthesisContext<'a> {
    pub db: &'a Database,
    pub names: &'a NameRegistry,
    pub relationships: &'a RelationshipGraph,
    pub selections: &'a Selections,
    pub config: &'a GeneratorConfig,
}

impl SynthesisContext<'_> {
    pub fn selection(&self, object: &QualifiedName) -> &ProjectSelection {
        self.selections.resolve(Some(object))
    }

    pub fn entity(&self, object: &QualifiedName) -> TypeName {
        self.names.entity(object)
    }

    /// How generated code outside the entity namespace refers to a type
    /// living in `entity`'s namespace (optionally a sub-namespace of it)
    pub fn type_ref(&self, entity: &TypeName, sub_namespace: Option<&str>, name: &str) -> String {
        if entity.namespace == self.config.namespace {
            name.to_string()
        } else {
            match sub_namespace {
                Some(sub) => format!("{}.{sub}.{name}", entity.namespace),
                None => format!("{}.{name}", entity.namespace),
            }
        }
    }

    pub fn entity_ref(&self, object: &QualifiedName) -> String {
        let entity = self.entity(object);
        self.type_ref(&entity, None, &entity.name)
    }

    /// Database-set property name on the context (`Orders`)
    pub fn db_set_name(&self, object: &QualifiedName) -> String {
        let entity = self.entity(object);
        let plural = pluralize(&entity.name);
        if entity.namespace == self.config.namespace {
            plural
        } else {
            format!("{}{plural}", type_identifier(&object.schema))
        }
    }

    /// Expression reaching an object's rows through the context
    pub fn set_accessor(&self, object: &QualifiedName) -> String {
        if self.selection(object).db_set_properties {
            format!("{CONTEXT_FIELD}.{}", self.db_set_name(object))
        } else {
            format!("{CONTEXT_FIELD}.Set<{}>()", self.entity_ref(object))
        }
    }

    /// Schema argument for table bindings, omitted for the default schema
    pub fn schema_argument<'o>(&self, object: &SchemaObject<'o>) -> Option<&'o str> {
        let schema = object.schema();
        (schema != self.config.default_schema).then_some(schema)
    }
}

/// Per-object synthesis stage
pub trait Synthesizer {
    /// Units for one table or view; never fails on schema-shape problems
    fn synthesize(&self, ctx: &SynthesisContext<'_>, object: SchemaObject<'_>) -> Vec<CodeUnit>;
}

/// Orchestrates one generation run
///
/// Objects are processed tables first, then views, each in declaration
/// order. Registered post-processors see the finished tree before it is
/// returned.
pub struct Generator {
    config: GeneratorConfig,
    selections: Selections,
    post_processors: Vec<Box<dyn ArtifactVisitor>>,
}

impl Generator {
    /// Generator whose global selection comes from `config.selection`
    pub fn new(config: GeneratorConfig) -> Self {
        let selections = Selections::new(config.selection.clone());
        Self {
            config,
            selections,
            post_processors: vec![],
        }
    }

    /// Replace the selections, typically with ones layered from a file
    pub fn with_selections(mut self, selections: Selections) -> Self {
        self.selections = selections;
        self
    }

    /// Register a hook run between synthesis and rendering
    pub fn with_post_processor(mut self, visitor: impl ArtifactVisitor + 'static) -> Self {
        self.post_processors.push(Box::new(visitor));
        self
    }

    pub fn generate(&mut self, db: &Database) -> ArtifactTree {
        info!(
            database = ?db.name,
            tables = db.tables().len(),
            views = db.views().len(),
            namespace = ?self.config.namespace,
            "Synthesizing data-access artifacts"
        );

        let names = NameRegistry::build(db, &self.config.namespace);
        let relationships = RelationshipGraph::build(db, &names);
        let ctx = SynthesisContext {
            db,
            names: &names,
            relationships: &relationships,
            selections: &self.selections,
            config: &self.config,
        };

        let stages: [&dyn Synthesizer; 3] =
            [&EntitySynthesizer, &MappingSynthesizer, &RepositorySynthesizer];

        let mut tree = ArtifactTree::default();
        for object in db.objects() {
            let qualified = object.qualified_name();
            debug!(object = %qualified, view = object.is_view(), "Synthesizing object");

            let first = tree.units.len();
            for stage in stages {
                tree.units.extend(stage.synthesize(&ctx, object));
            }

            if names.is_conflicted(&qualified) {
                let entity = names.entity(&qualified);
                let message = format!(
                    "entity name '{}' for '{qualified}' collides with another object in namespace '{}'",
                    entity.name, entity.namespace
                );
                warn!(object = %qualified, "{message}");
                if let Some(Artifact::Class(class)) = tree
                    .units
                    .get_mut(first)
                    .and_then(|unit| unit.artifacts.first_mut())
                {
                    class.lines.insert(0, Line::warning(message));
                }
            }
        }
        tree.units.push(ContextSynthesizer.synthesize(&ctx));

        for processor in &mut self.post_processors {
            tree.walk_mut(processor.as_mut());
        }

        let diagnostics = tree.diagnostics();
        info!(
            units = tree.units.len(),
            warnings = diagnostics.len(),
            "Synthesis complete"
        );

        tree
    }
}
