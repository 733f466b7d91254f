//! Rendering
//!
//! Turning an [`ArtifactTree`] into text is left to an [`ArtifactRenderer`].
//! The bundled [`OutlineRenderer`] produces a readable indented outline of
//! every unit; it is not a target-language pretty printer.

use minijinja::Environment;
use serde::Serialize;
use tracing::{debug, info};

use crate::artifact::{
    Artifact, ArtifactTree, ClassDef, CodeUnit, Declaration, InterfaceDef, Line, Member, Parameter,
};
use crate::error::DaliftError;

/// Consumer of a finished artifact tree
pub trait ArtifactRenderer {
    fn render(&self, tree: &ArtifactTree) -> Result<String, DaliftError>;
}

#[derive(Serialize)]
struct UnitView {
    kind: String,
    object: Option<String>,
    artifacts: Vec<ArtifactView>,
}

#[derive(Serialize)]
struct ArtifactView {
    doc: Option<String>,
    attributes: Vec<String>,
    header: String,
    lines: Vec<String>,
    members: Vec<MemberView>,
}

#[derive(Serialize)]
struct MemberView {
    attributes: Vec<String>,
    header: String,
    lines: Vec<String>,
}

/// Indented text outline of the whole tree
pub struct OutlineRenderer {
    env: Environment<'static>,
}

impl OutlineRenderer {
    pub fn new() -> Result<Self, DaliftError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("outline.txt", include_str!("templates/outline.txt.jinja"))
            .map_err(|e| DaliftError::Render(format!("Template error: {e}")))?;
        Ok(Self { env })
    }
}

impl ArtifactRenderer for OutlineRenderer {
    fn render(&self, tree: &ArtifactTree) -> Result<String, DaliftError> {
        info!(units = tree.units.len(), "Rendering artifact outline");

        let template = self
            .env
            .get_template("outline.txt")
            .map_err(|e| DaliftError::Render(format!("Template error: {e}")))?;

        let units: Vec<UnitView> = tree.units.iter().map(unit_view).collect();
        let ctx = minijinja::context! { units => units };

        let output = template
            .render(ctx)
            .map_err(|e| DaliftError::Render(format!("Render error: {e}")))?;
        debug!(bytes = output.len(), "Rendered outline");
        Ok(output)
    }
}

fn unit_view(unit: &CodeUnit) -> UnitView {
    UnitView {
        kind: format!("{:?}", unit.kind),
        object: unit.object.as_ref().map(ToString::to_string),
        artifacts: unit.artifacts.iter().map(artifact_view).collect(),
    }
}

fn artifact_view(artifact: &Artifact) -> ArtifactView {
    match artifact {
        Artifact::Class(ClassDef {
            decl,
            base_types,
            lines,
            members,
        }) => type_view("class", decl, base_types, lines, members),
        Artifact::Interface(InterfaceDef {
            decl,
            base_types,
            lines,
            members,
        }) => type_view("interface", decl, base_types, lines, members),
    }
}

fn type_view(
    keyword: &str,
    decl: &Declaration,
    base_types: &[String],
    lines: &[Line],
    members: &[Member],
) -> ArtifactView {
    let mut header = format!("{}{keyword} {}.{}", modifiers(decl), decl.namespace, decl.name);
    if !base_types.is_empty() {
        header.push_str(&format!(" : {}", base_types.join(", ")));
    }
    ArtifactView {
        doc: decl.documentation.clone(),
        attributes: decl.attributes.clone(),
        header,
        lines: lines.iter().map(line_text).collect(),
        members: members.iter().map(member_view).collect(),
    }
}

fn member_view(member: &Member) -> MemberView {
    let (decl, header, lines) = match member {
        Member::Field(f) => (
            &f.decl,
            format!("{}{} {}", modifiers(&f.decl), f.type_name, f.decl.name),
            &f.lines,
        ),
        Member::Property(p) => (
            &p.decl,
            format!("{}{} {}", modifiers(&p.decl), p.type_name, p.decl.name),
            &p.lines,
        ),
        Member::Constructor(c) => (
            &c.decl,
            format!("{}{}({})", modifiers(&c.decl), c.decl.name, parameters(&c.parameters)),
            &c.lines,
        ),
        Member::Method(m) => (
            &m.decl,
            format!(
                "{}{} {}({})",
                modifiers(&m.decl),
                m.return_type,
                m.decl.name,
                parameters(&m.parameters)
            ),
            &m.lines,
        ),
        Member::Warning(text) => {
            return MemberView {
                attributes: vec![],
                header: format!("#warning {text}"),
                lines: vec![],
            };
        }
    };

    MemberView {
        attributes: decl.attributes.clone(),
        header,
        lines: lines.iter().map(line_text).collect(),
    }
}

fn modifiers(decl: &Declaration) -> String {
    decl.modifiers
        .iter()
        .map(|m| format!("{} ", m.keyword()))
        .collect()
}

fn parameters(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| match &p.default_value {
            Some(default) => format!("{} {} = {default}", p.type_name, p.name),
            None => format!("{} {}", p.type_name, p.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn line_text(line: &Line) -> String {
    match line {
        Line::Code(text) => text.clone(),
        Line::Comment(text) => format!("// {text}"),
        Line::Warning(text) => format!("#warning {text}"),
    }
}
