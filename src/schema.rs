//! Schema data structures
//!
//! These types represent the relational structure handed over by an import
//! provider and form the contract between introspection (produces) and
//! synthesis (consumes). A [`Database`] is an immutable snapshot: it is
//! validated and indexed once, and every cross-reference (foreign key
//! targets) is resolved through the index rather than through object links.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::DaliftError;

/// Schema-qualified object name (`schema.name`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parse `schema.name`, falling back to `default_schema` for bare names
    pub fn parse(value: &str, default_schema: &str) -> Self {
        match value.split_once('.') {
            Some((schema, name)) if !schema.is_empty() => Self::new(schema, name),
            _ => Self::new(default_schema, value),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Physical column type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Char,
    NChar,
    VarChar,
    NVarChar,
    Text,
    NText,
    Xml,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Numeric,
    Money,
    SmallMoney,
    Real,
    Float,
    Bit,
    Date,
    Time,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    Binary,
    VarBinary,
    Image,
    RowVersion,
    UniqueIdentifier,
    /// Anything the importer could not classify, kept verbatim
    Other(String),
}

/// Closed set of type categories every type-driven decision is made on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Text,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Decimal,
    Single,
    Double,
    DateTime,
    DateTimeOffset,
    Time,
    Binary,
    Guid,
    Opaque,
}

impl TypeCategory {
    pub const ALL: [TypeCategory; 15] = [
        TypeCategory::Text,
        TypeCategory::Boolean,
        TypeCategory::Int8,
        TypeCategory::Int16,
        TypeCategory::Int32,
        TypeCategory::Int64,
        TypeCategory::Decimal,
        TypeCategory::Single,
        TypeCategory::Double,
        TypeCategory::DateTime,
        TypeCategory::DateTimeOffset,
        TypeCategory::Time,
        TypeCategory::Binary,
        TypeCategory::Guid,
        TypeCategory::Opaque,
    ];

    /// Target CLR type name for generated properties and parameters
    pub fn clr_type(self) -> &'static str {
        match self {
            TypeCategory::Text => "string",
            TypeCategory::Boolean => "bool",
            TypeCategory::Int8 => "byte",
            TypeCategory::Int16 => "short",
            TypeCategory::Int32 => "int",
            TypeCategory::Int64 => "long",
            TypeCategory::Decimal => "decimal",
            TypeCategory::Single => "float",
            TypeCategory::Double => "double",
            TypeCategory::DateTime => "DateTime",
            TypeCategory::DateTimeOffset => "DateTimeOffset",
            TypeCategory::Time => "TimeSpan",
            TypeCategory::Binary => "byte[]",
            TypeCategory::Guid => "Guid",
            TypeCategory::Opaque => "object",
        }
    }

    /// Reference types are already nullable and never take a `?` marker
    pub fn is_value_type(self) -> bool {
        !matches!(
            self,
            TypeCategory::Text | TypeCategory::Binary | TypeCategory::Opaque
        )
    }

    /// CLR type, with the nullable marker when the value may be absent
    pub fn clr_type_nullable(self, nullable: bool) -> String {
        if nullable && self.is_value_type() {
            format!("{}?", self.clr_type())
        } else {
            self.clr_type().to_string()
        }
    }
}

impl DataType {
    /// Declared tag as it appears in the database
    pub fn tag(&self) -> &str {
        match self {
            DataType::Char => "char",
            DataType::NChar => "nchar",
            DataType::VarChar => "varchar",
            DataType::NVarChar => "nvarchar",
            DataType::Text => "text",
            DataType::NText => "ntext",
            DataType::Xml => "xml",
            DataType::TinyInt => "tinyint",
            DataType::SmallInt => "smallint",
            DataType::Int => "int",
            DataType::BigInt => "bigint",
            DataType::Decimal => "decimal",
            DataType::Numeric => "numeric",
            DataType::Money => "money",
            DataType::SmallMoney => "smallmoney",
            DataType::Real => "real",
            DataType::Float => "float",
            DataType::Bit => "bit",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "datetime",
            DataType::DateTime2 => "datetime2",
            DataType::SmallDateTime => "smalldatetime",
            DataType::DateTimeOffset => "datetimeoffset",
            DataType::Binary => "binary",
            DataType::VarBinary => "varbinary",
            DataType::Image => "image",
            DataType::RowVersion => "rowversion",
            DataType::UniqueIdentifier => "uniqueidentifier",
            DataType::Other(tag) => tag,
        }
    }

    pub fn category(&self) -> TypeCategory {
        match self {
            DataType::Char
            | DataType::NChar
            | DataType::VarChar
            | DataType::NVarChar
            | DataType::Text
            | DataType::NText
            | DataType::Xml => TypeCategory::Text,
            DataType::TinyInt => TypeCategory::Int8,
            DataType::SmallInt => TypeCategory::Int16,
            DataType::Int => TypeCategory::Int32,
            DataType::BigInt => TypeCategory::Int64,
            DataType::Decimal | DataType::Numeric | DataType::Money | DataType::SmallMoney => {
                TypeCategory::Decimal
            }
            DataType::Real => TypeCategory::Single,
            DataType::Float => TypeCategory::Double,
            DataType::Bit => TypeCategory::Boolean,
            DataType::Date
            | DataType::DateTime
            | DataType::DateTime2
            | DataType::SmallDateTime => TypeCategory::DateTime,
            DataType::DateTimeOffset => TypeCategory::DateTimeOffset,
            DataType::Time => TypeCategory::Time,
            DataType::Binary | DataType::VarBinary | DataType::Image | DataType::RowVersion => {
                TypeCategory::Binary
            }
            DataType::UniqueIdentifier => TypeCategory::Guid,
            DataType::Other(_) => TypeCategory::Opaque,
        }
    }

    /// Types whose storage declaration carries a length
    pub fn is_length_qualified(&self) -> bool {
        matches!(
            self,
            DataType::Char
                | DataType::NChar
                | DataType::VarChar
                | DataType::NVarChar
                | DataType::Binary
                | DataType::VarBinary
        )
    }

    /// Types declared with both precision and scale
    pub fn is_decimal_family(&self) -> bool {
        matches!(self, DataType::Decimal | DataType::Numeric)
    }

    /// Types declared with precision only
    pub fn is_floating_family(&self) -> bool {
        matches!(self, DataType::Real | DataType::Float)
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data_type = match s.trim().to_ascii_lowercase().as_str() {
            "char" => DataType::Char,
            "nchar" => DataType::NChar,
            "varchar" => DataType::VarChar,
            "nvarchar" => DataType::NVarChar,
            "text" => DataType::Text,
            "ntext" => DataType::NText,
            "xml" => DataType::Xml,
            "tinyint" => DataType::TinyInt,
            "smallint" => DataType::SmallInt,
            "int" | "integer" => DataType::Int,
            "bigint" => DataType::BigInt,
            "decimal" => DataType::Decimal,
            "numeric" => DataType::Numeric,
            "money" => DataType::Money,
            "smallmoney" => DataType::SmallMoney,
            "real" => DataType::Real,
            "float" => DataType::Float,
            "bit" => DataType::Bit,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "datetime" => DataType::DateTime,
            "datetime2" => DataType::DateTime2,
            "smalldatetime" => DataType::SmallDateTime,
            "datetimeoffset" => DataType::DateTimeOffset,
            "binary" => DataType::Binary,
            "varbinary" => DataType::VarBinary,
            "image" => DataType::Image,
            "rowversion" | "timestamp" => DataType::RowVersion,
            "uniqueidentifier" => DataType::UniqueIdentifier,
            other => DataType::Other(other.to_string()),
        };
        Ok(data_type)
    }
}

/// A table or view column
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub is_nullable: bool,
    /// `None` means unset or unbounded (`max`)
    pub length: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_nullable,
            length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u8, scale: Option<u8>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    pub fn category(&self) -> TypeCategory {
        self.data_type.category()
    }
}

/// Primary key or unique constraint
#[derive(Debug, Clone)]
pub struct KeyConstraint {
    pub name: String,
    /// Column names in declared key order
    pub columns: Vec<String>,
}

impl KeyConstraint {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Foreign key constraint
///
/// Zero-column keys are tolerated here (they are skipped during synthesis);
/// composite keys are kept but never turned into navigations.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub references: QualifiedName,
    /// Referenced columns; empty means "the target's primary key"
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    pub fn new(name: impl Into<String>, columns: &[&str], references: QualifiedName) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            references,
            referenced_columns: vec![],
        }
    }
}

/// Auto-increment descriptor
#[derive(Debug, Clone)]
pub struct Identity {
    pub column: String,
    pub seed: i64,
    pub increment: i64,
}

/// Database table
#[derive(Debug, Clone)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<KeyConstraint>,
    pub uniques: Vec<KeyConstraint>,
    pub foreign_keys: Vec<ForeignKey>,
    pub identity: Option<Identity>,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
            primary_key: None,
            uniques: vec![],
            foreign_keys: vec![],
            identity: None,
        }
    }

    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Get primary key columns in key order
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_key
            .iter()
            .flat_map(|pk| pk.columns.iter())
            .filter_map(|name| self.column(name))
            .collect()
    }

    pub fn identity_column(&self) -> Option<&Column> {
        self.identity.as_ref().and_then(|id| self.column(&id.column))
    }
}

/// Database view
///
/// Views carry columns only: no keys, foreign keys or identity.
#[derive(Debug, Clone)]
pub struct View {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
}

impl View {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
        }
    }

    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }
}

/// Borrowed view over either kind of schema object
#[derive(Debug, Clone, Copy)]
pub enum SchemaObject<'a> {
    Table(&'a Table),
    View(&'a View),
}

impl<'a> SchemaObject<'a> {
    pub fn qualified_name(&self) -> QualifiedName {
        match self {
            SchemaObject::Table(t) => t.qualified_name(),
            SchemaObject::View(v) => v.qualified_name(),
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            SchemaObject::Table(t) => &t.name,
            SchemaObject::View(v) => &v.name,
        }
    }

    pub fn schema(&self) -> &'a str {
        match self {
            SchemaObject::Table(t) => &t.schema,
            SchemaObject::View(v) => &v.schema,
        }
    }

    pub fn columns(&self) -> &'a [Column] {
        match self {
            SchemaObject::Table(t) => &t.columns,
            SchemaObject::View(v) => &v.columns,
        }
    }

    pub fn as_table(&self) -> Option<&'a Table> {
        match self {
            SchemaObject::Table(t) => Some(t),
            SchemaObject::View(_) => None,
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, SchemaObject::View(_))
    }
}

#[derive(Debug, Clone, Copy)]
enum ObjectSlot {
    Table(usize),
    View(usize),
}

/// Immutable schema snapshot plus its qualified-name index
#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
    pub default_schema: String,
    tables: Vec<Table>,
    views: Vec<View>,
    index: HashMap<QualifiedName, ObjectSlot>,
}

impl Database {
    /// Validate and index a freshly imported schema
    ///
    /// Anything that would leave later stages referring to undefined
    /// constructs is rejected with [`DaliftError::Contract`].
    pub fn new(
        name: impl Into<String>,
        default_schema: impl Into<String>,
        tables: Vec<Table>,
        views: Vec<View>,
    ) -> Result<Self, DaliftError> {
        let mut index = HashMap::with_capacity(tables.len() + views.len());

        for (pos, table) in tables.iter().enumerate() {
            validate_object(&table.schema, &table.name, &table.columns)?;
            validate_table_constraints(table)?;
            if index
                .insert(table.qualified_name(), ObjectSlot::Table(pos))
                .is_some()
            {
                return Err(DaliftError::Contract(format!(
                    "duplicate object name '{}'",
                    table.qualified_name()
                )));
            }
        }

        for (pos, view) in views.iter().enumerate() {
            validate_object(&view.schema, &view.name, &view.columns)?;
            if index
                .insert(view.qualified_name(), ObjectSlot::View(pos))
                .is_some()
            {
                return Err(DaliftError::Contract(format!(
                    "duplicate object name '{}'",
                    view.qualified_name()
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            default_schema: default_schema.into(),
            tables,
            views,
            index,
        })
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Tables then views, each in declaration order
    pub fn objects(&self) -> impl Iterator<Item = SchemaObject<'_>> {
        self.tables
            .iter()
            .map(SchemaObject::Table)
            .chain(self.views.iter().map(SchemaObject::View))
    }

    /// Look up an object; unknown names yield `None`
    pub fn find(&self, name: &QualifiedName) -> Option<SchemaObject<'_>> {
        self.index.get(name).map(|slot| match *slot {
            ObjectSlot::Table(pos) => SchemaObject::Table(&self.tables[pos]),
            ObjectSlot::View(pos) => SchemaObject::View(&self.views[pos]),
        })
    }

    pub fn table(&self, name: &QualifiedName) -> Option<&Table> {
        self.find(name).and_then(|obj| obj.as_table())
    }

    /// Lower-cased names of every primary-key column across all tables
    pub fn primary_key_column_names(&self) -> BTreeSet<String> {
        self.tables
            .iter()
            .filter_map(|t| t.primary_key.as_ref())
            .flat_map(|pk| pk.columns.iter())
            .map(|c| c.to_lowercase())
            .collect()
    }
}

fn validate_object(schema: &str, name: &str, columns: &[Column]) -> Result<(), DaliftError> {
    if name.trim().is_empty() {
        return Err(DaliftError::Contract(format!(
            "object in schema '{schema}' has no name"
        )));
    }
    if schema.trim().is_empty() {
        return Err(DaliftError::Contract(format!(
            "object '{name}' has no schema qualifier"
        )));
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for col in columns {
        if col.name.trim().is_empty() {
            return Err(DaliftError::Contract(format!(
                "object '{schema}.{name}' has a column with no name"
            )));
        }
        if !seen.insert(col.name.as_str()) {
            return Err(DaliftError::Contract(format!(
                "object '{schema}.{name}' declares column '{}' twice",
                col.name
            )));
        }
    }
    Ok(())
}

fn validate_table_constraints(table: &Table) -> Result<(), DaliftError> {
    let check = |constraint: &str, columns: &[String]| -> Result<(), DaliftError> {
        match columns.iter().find(|c| table.column(c).is_none()) {
            Some(missing) => Err(DaliftError::Contract(format!(
                "constraint '{constraint}' on '{}' names unknown column '{missing}'",
                table.qualified_name()
            ))),
            None => Ok(()),
        }
    };

    if let Some(pk) = &table.primary_key {
        if pk.columns.is_empty() {
            return Err(DaliftError::Contract(format!(
                "primary key '{}' on '{}' has no columns",
                pk.name,
                table.qualified_name()
            )));
        }
        check(&pk.name, &pk.columns)?;
    }
    for unique in &table.uniques {
        if unique.columns.is_empty() {
            return Err(DaliftError::Contract(format!(
                "unique constraint '{}' on '{}' has no columns",
                unique.name,
                table.qualified_name()
            )));
        }
        check(&unique.name, &unique.columns)?;
    }
    for fk in &table.foreign_keys {
        check(&fk.name, &fk.columns)?;
    }
    if let Some(identity) = &table.identity {
        check("identity", std::slice::from_ref(&identity.column))?;
    }
    Ok(())
}
