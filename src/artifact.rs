//! Code artifact model
//!
//! A language-agnostic tree of declarations (classes, interfaces and their
//! members) filled in by the synthesizers. Statement bodies are opaque
//! [`Line`]s; turning the tree into source text is a renderer's job.
//!
//! Warnings live in the tree itself: a [`Line::Warning`] or
//! [`Member::Warning`] sits exactly where the declaration it replaces would
//! have been.

use std::collections::BTreeSet;

use crate::schema::QualifiedName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Public,
    Internal,
    Protected,
    Private,
    Abstract,
    Static,
    Virtual,
    Override,
    Partial,
    ReadOnly,
}

impl Modifier {
    pub fn keyword(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Internal => "internal",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Abstract => "abstract",
            Modifier::Static => "static",
            Modifier::Virtual => "virtual",
            Modifier::Override => "override",
            Modifier::Partial => "partial",
            Modifier::ReadOnly => "readonly",
        }
    }
}

/// One opaque body line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Code(String),
    Comment(String),
    Warning(String),
}

impl Line {
    pub fn code(text: impl Into<String>) -> Self {
        Line::Code(text.into())
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Line::Comment(text.into())
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Line::Warning(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Line::Code(t) | Line::Comment(t) | Line::Warning(t) => t,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Line::Warning(_))
    }
}

/// Identity and decoration shared by every artifact kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub namespace: String,
    pub documentation: Option<String>,
    pub modifiers: BTreeSet<Modifier>,
    pub attributes: Vec<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.documentation = Some(doc.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: &[Modifier]) -> Self {
        self.modifiers.extend(modifiers.iter().copied());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
    pub default_value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default_value: None,
        }
    }

    pub fn optional(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub decl: Declaration,
    pub type_name: String,
    /// Initializer, if any
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub decl: Declaration,
    pub type_name: String,
    /// Initializer, if any
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDef {
    pub decl: Declaration,
    pub parameters: Vec<Parameter>,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub decl: Declaration,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    /// Body lines; empty for interface members
    pub lines: Vec<Line>,
}

impl MethodDef {
    pub fn new(decl: Declaration, return_type: impl Into<String>) -> Self {
        Self {
            decl,
            return_type: return_type.into(),
            parameters: vec![],
            lines: vec![],
        }
    }

    /// Same method without its body, for interface declarations
    pub fn signature(&self) -> Self {
        let mut decl = self.decl.clone();
        decl.modifiers.clear();
        Self {
            decl,
            return_type: self.return_type.clone(),
            parameters: self.parameters.clone(),
            lines: vec![],
        }
    }

    pub fn has_warning(&self) -> bool {
        self.lines.iter().any(Line::is_warning)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Field(FieldDef),
    Property(PropertyDef),
    Constructor(ConstructorDef),
    Method(MethodDef),
    /// Placeholder for a member that could not be synthesized
    Warning(String),
}

impl Member {
    pub fn name(&self) -> Option<&str> {
        match self {
            Member::Field(f) => Some(&f.decl.name),
            Member::Property(p) => Some(&p.decl.name),
            Member::Constructor(c) => Some(&c.decl.name),
            Member::Method(m) => Some(&m.decl.name),
            Member::Warning(_) => None,
        }
    }

    fn lines(&self) -> &[Line] {
        match self {
            Member::Field(f) => &f.lines,
            Member::Property(p) => &p.lines,
            Member::Constructor(c) => &c.lines,
            Member::Method(m) => &m.lines,
            Member::Warning(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub decl: Declaration,
    pub base_types: Vec<String>,
    /// Class-level notes emitted ahead of the members
    pub lines: Vec<Line>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDef {
    pub decl: Declaration,
    pub base_types: Vec<String>,
    pub lines: Vec<Line>,
    pub members: Vec<Member>,
}

macro_rules! member_lookups {
    ($ty:ty) => {
        impl $ty {
            pub fn method(&self, name: &str) -> Option<&MethodDef> {
                self.members.iter().find_map(|m| match m {
                    Member::Method(method) if method.decl.name == name => Some(method),
                    _ => None,
                })
            }

            pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
                self.members.iter().filter_map(|m| match m {
                    Member::Method(method) => Some(method),
                    _ => None,
                })
            }

            pub fn property(&self, name: &str) -> Option<&PropertyDef> {
                self.members.iter().find_map(|m| match m {
                    Member::Property(prop) if prop.decl.name == name => Some(prop),
                    _ => None,
                })
            }

            pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> {
                self.members.iter().filter_map(|m| match m {
                    Member::Property(prop) => Some(prop),
                    _ => None,
                })
            }

            /// Every warning in this declaration, members included
            pub fn warnings(&self) -> Vec<&str> {
                let own = self.lines.iter().filter(|l| l.is_warning()).map(Line::text);
                let members = self.members.iter().flat_map(|m| {
                    let placeholder = match m {
                        Member::Warning(text) => Some(text.as_str()),
                        _ => None,
                    };
                    placeholder.into_iter().chain(
                        m.lines().iter().filter(|l| l.is_warning()).map(Line::text),
                    )
                });
                own.chain(members).collect()
            }
        }
    };
}

member_lookups!(ClassDef);
member_lookups!(InterfaceDef);

impl ClassDef {
    pub fn new(decl: Declaration) -> Self {
        Self {
            decl,
            base_types: vec![],
            lines: vec![],
            members: vec![],
        }
    }
}

impl InterfaceDef {
    pub fn new(decl: Declaration) -> Self {
        Self {
            decl,
            base_types: vec![],
            lines: vec![],
            members: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Class(ClassDef),
    Interface(InterfaceDef),
}

impl Artifact {
    pub fn name(&self) -> &str {
        match self {
            Artifact::Class(c) => &c.decl.name,
            Artifact::Interface(i) => &i.decl.name,
        }
    }

    pub fn warnings(&self) -> Vec<&str> {
        match self {
            Artifact::Class(c) => c.warnings(),
            Artifact::Interface(i) => i.warnings(),
        }
    }
}

/// What a unit was synthesized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Entity,
    Mapping,
    Repository,
    DataContract,
    Context,
}

/// Artifacts generated for one schema object (or the run, for the context)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    pub kind: UnitKind,
    pub object: Option<QualifiedName>,
    pub artifacts: Vec<Artifact>,
}

impl CodeUnit {
    pub fn new(kind: UnitKind, object: Option<QualifiedName>) -> Self {
        Self {
            kind,
            object,
            artifacts: vec![],
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.artifacts.iter().find_map(|a| match a {
            Artifact::Class(c) if c.decl.name == name => Some(c),
            _ => None,
        })
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceDef> {
        self.artifacts.iter().find_map(|a| match a {
            Artifact::Interface(i) if i.decl.name == name => Some(i),
            _ => None,
        })
    }
}

/// Warning found in the tree, with where it sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub kind: UnitKind,
    pub object: Option<QualifiedName>,
    pub artifact: String,
    pub message: String,
}

/// Post-synthesis hook over the artifact tree
///
/// Every method has an empty default so implementors only override what
/// they touch. Visits happen unit by unit, in tree order.
pub trait ArtifactVisitor {
    fn visit_unit(&mut self, _unit: &mut CodeUnit) {}

    fn visit_class(&mut self, _class: &mut ClassDef) {}

    fn visit_interface(&mut self, _interface: &mut InterfaceDef) {}

    /// `owner` is the name of the enclosing class or interface
    fn visit_member(&mut self, _owner: &str, _member: &mut Member) {}
}

/// Complete output of one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactTree {
    pub units: Vec<CodeUnit>,
}

impl ArtifactTree {
    pub fn walk_mut(&mut self, visitor: &mut dyn ArtifactVisitor) {
        for unit in &mut self.units {
            visitor.visit_unit(unit);
            for artifact in &mut unit.artifacts {
                match artifact {
                    Artifact::Class(class) => {
                        visitor.visit_class(class);
                        for member in &mut class.members {
                            visitor.visit_member(&class.decl.name, member);
                        }
                    }
                    Artifact::Interface(interface) => {
                        visitor.visit_interface(interface);
                        for member in &mut interface.members {
                            visitor.visit_member(&interface.decl.name, member);
                        }
                    }
                }
            }
        }
    }

    /// Units generated for one object, in generation order
    pub fn units_for<'a>(
        &'a self,
        object: &'a QualifiedName,
    ) -> impl Iterator<Item = &'a CodeUnit> + 'a {
        self.units
            .iter()
            .filter(move |u| u.object.as_ref() == Some(object))
    }

    pub fn unit(&self, kind: UnitKind, object: &QualifiedName) -> Option<&CodeUnit> {
        self.units
            .iter()
            .find(|u| u.kind == kind && u.object.as_ref() == Some(object))
    }

    pub fn diagnostics(&self) -> Vec<DiagnosticEntry> {
        self.units
            .iter()
            .flat_map(|unit| {
                unit.artifacts.iter().flat_map(move |artifact| {
                    artifact
                        .warnings()
                        .into_iter()
                        .map(move |message| DiagnosticEntry {
                            kind: unit.kind,
                            object: unit.object.clone(),
                            artifact: artifact.name().to_string(),
                            message: message.to_string(),
                        })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ArtifactTree {
        let mut class = ClassDef::new(Declaration::new("OrderRepository", "App"));
        let mut method = MethodDef::new(
            Declaration::new("Enumerate", "App").with_modifiers(&[Modifier::Public]),
            "IQueryable<Order>",
        );
        method.lines.push(Line::code("return query;"));
        method.lines.push(Line::warning("composite key skipped"));
        class.members.push(Member::Method(method));
        class.members.push(Member::Warning("no primary key".to_string()));

        let mut unit = CodeUnit::new(UnitKind::Repository, Some(QualifiedName::new("dbo", "Orders")));
        unit.artifacts.push(Artifact::Class(class));
        ArtifactTree { units: vec![unit] }
    }

    #[test]
    fn test_diagnostics_collects_lines_and_placeholders() {
        let tree = sample_tree();
        let diagnostics = tree.diagnostics();
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["composite key skipped", "no primary key"]);
        assert!(diagnostics.iter().all(|d| d.artifact == "OrderRepository"));
    }

    #[test]
    fn test_signature_strips_body_and_modifiers() {
        let tree = sample_tree();
        let class = tree.units[0].class("OrderRepository").unwrap();
        let signature = class.method("Enumerate").unwrap().signature();
        assert!(signature.lines.is_empty());
        assert!(signature.decl.modifiers.is_empty());
        assert_eq!(signature.return_type, "IQueryable<Order>");
    }

    struct Renamer;

    impl ArtifactVisitor for Renamer {
        fn visit_member(&mut self, owner: &str, member: &mut Member) {
            if let Member::Method(method) = member {
                method.decl.name = format!("{owner}_{}", method.decl.name);
            }
        }
    }

    #[test]
    fn test_walk_mut_visits_members() {
        let mut tree = sample_tree();
        tree.walk_mut(&mut Renamer);
        let class = tree.units[0].class("OrderRepository").unwrap();
        assert!(class.method("OrderRepository_Enumerate").is_some());
    }
}
