//! Naming conventions
//!
//! Pure functions turning raw schema identifiers into code identifiers.
//! The only state is [`NameRegistry`], which is built once per generation
//! run to resolve class-name collisions through namespace qualification.

use std::collections::{BTreeMap, HashMap, HashSet};

use convert_case::{Boundary, Case, Casing};
use tracing::{debug, warn};

use crate::schema::{Database, QualifiedName};

const WORD_BOUNDARIES: [Boundary; 4] = [
    Boundary::Space,
    Boundary::LowerUpper,
    Boundary::DigitUpper,
    Boundary::Acronym,
];

/// Singular/plural pairs the suffix rules get wrong
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("criterion", "criteria"),
    ("category", "categories"),
    ("status", "statuses"),
    ("bus", "buses"),
    ("alias", "aliases"),
    ("quiz", "quizzes"),
    ("movie", "movies"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "metadata",
    "equipment",
    "information",
    "money",
    "news",
    "series",
    "species",
    "sheep",
    "fish",
    "deer",
    "staff",
];

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
    "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum",
    "event", "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto",
    "if", "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace",
    "new", "null", "object", "operator", "out", "override", "params", "private", "protected",
    "public", "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof", "static",
    "string", "struct", "switch", "this", "throw", "true", "try", "typeof", "uint", "ulong",
    "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

/// Normalize a raw identifier into an upper-camel type identifier
///
/// Non-alphanumeric characters act as word separators and are dropped.
/// A leading digit gets a `T` prefix so the result is always a valid bare
/// identifier. Normalizing an already-normalized identifier is a no-op.
pub fn type_identifier(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let words = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let ident = words
        .with_boundaries(&WORD_BOUNDARIES)
        .to_case(Case::Pascal);

    match ident.chars().next() {
        None => "Unnamed".to_string(),
        Some(first) if first.is_numeric() => format!("T{ident}"),
        Some(_) => ident,
    }
}

/// Normalize a raw identifier into a lower-camel member identifier
pub fn member_identifier(raw: &str) -> String {
    lower_first(&type_identifier(raw))
}

/// Member identifier that is also safe as a parameter or local name
pub fn parameter_name(raw: &str) -> String {
    let ident = member_identifier(raw);
    if CSHARP_KEYWORDS.contains(&ident.as_str()) {
        format!("@{ident}")
    } else {
        ident
    }
}

/// Singular entity name for a table or view (`Order Details` -> `OrderDetail`)
pub fn entity_name(raw: &str) -> String {
    singularize(&type_identifier(raw))
}

pub fn pluralize(word: &str) -> String {
    let (head, tail) = split_last_word(word);
    let lower = tail.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) || IRREGULAR.iter().any(|(_, p)| *p == lower) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return format!("{head}{}", match_case(tail, plural));
    }

    if let Some(stem) = word.strip_suffix('y') {
        if stem.chars().last().is_some_and(|c| !is_vowel(c)) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{word}es");
    }
    format!("{word}s")
}

pub fn singularize(word: &str) -> String {
    let (head, tail) = split_last_word(word);
    let lower = tail.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) || IRREGULAR.iter().any(|(s, _)| *s == lower) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == lower) {
        return format!("{head}{}", match_case(tail, singular));
    }

    let len = word.len();
    if lower.ends_with("ies") && lower.len() > 3 {
        return format!("{}y", &word[..len - 3]);
    }
    if ["sses", "xes", "zzes", "ches", "shes"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return word[..len - 2].to_string();
    }
    if ["ss", "us", "is"].iter().any(|suffix| lower.ends_with(suffix)) {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Split `SalesPerson` into (`Sales`, `Person`); words without an inner
/// capital come back whole as the tail
fn split_last_word(word: &str) -> (&str, &str) {
    let split = word
        .char_indices()
        .skip(1)
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    word.split_at(split)
}

fn match_case(model: &str, replacement: &str) -> String {
    if model.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

fn lower_first(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Generated type name with its namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub name: String,
    pub namespace: String,
}

impl TypeName {
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Run-scoped entity naming
///
/// Objects whose entity names collide are moved into a per-schema
/// namespace (`{root}.{Schema}`); names are never mangled. Collisions that
/// survive qualification (two objects in one schema normalizing to the same
/// name) are recorded as conflicts.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    root_namespace: String,
    names: HashMap<QualifiedName, TypeName>,
    conflicts: HashSet<QualifiedName>,
}

impl NameRegistry {
    pub fn build(db: &Database, root_namespace: &str) -> Self {
        let mut groups: BTreeMap<String, Vec<QualifiedName>> = BTreeMap::new();
        for object in db.objects() {
            groups
                .entry(entity_name(object.name()))
                .or_default()
                .push(object.qualified_name());
        }

        let mut names = HashMap::new();
        let mut conflicts = HashSet::new();

        for (entity, members) in groups {
            let collides = members.len() > 1;
            let mut placed: HashMap<String, &QualifiedName> = HashMap::new();

            for qualified in &members {
                let namespace = if collides && qualified.schema != db.default_schema {
                    format!("{root_namespace}.{}", type_identifier(&qualified.schema))
                } else {
                    root_namespace.to_string()
                };

                if let Some(previous) = placed.insert(namespace.clone(), qualified) {
                    warn!(
                        entity = ?entity,
                        first = %previous,
                        second = %qualified,
                        "Entity name collision not resolved by namespace qualification"
                    );
                    conflicts.insert(previous.clone());
                    conflicts.insert(qualified.clone());
                } else if collides {
                    debug!(entity = ?entity, object = %qualified, namespace = ?namespace, "Qualified colliding entity");
                }

                names.insert(
                    qualified.clone(),
                    TypeName {
                        name: entity.clone(),
                        namespace,
                    },
                );
            }
        }

        Self {
            root_namespace: root_namespace.to_string(),
            names,
            conflicts,
        }
    }

    pub fn root_namespace(&self) -> &str {
        &self.root_namespace
    }

    /// Entity type name for an object; unregistered names get the root namespace
    pub fn entity(&self, object: &QualifiedName) -> TypeName {
        self.names.get(object).cloned().unwrap_or_else(|| TypeName {
            name: entity_name(&object.name),
            namespace: self.root_namespace.clone(),
        })
    }

    pub fn is_conflicted(&self, object: &QualifiedName) -> bool {
        self.conflicts.contains(object)
    }
}
