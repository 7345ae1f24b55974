use crate::{Error, Result};
use std::{str::FromStr, sync::Arc};

/// Logical type tag carried by an attribute definition.
///
/// Tags drive comparison behavior (case folding, json casting) and the
/// array/json storage pipeline. They deliberately say nothing about the
/// physical column type, migrations are out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    MediumText,
    LongText,
    Integer,
    Float,
    Numeric,
    Boolean,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Uuid,
    Json,
    Array,
    Binary,
}

impl ColumnType {
    /// Text-ish tags take part in case folding.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ColumnType::Text | ColumnType::MediumText | ColumnType::LongText
        )
    }
}

impl FromStr for ColumnType {
    type Err = Error;
    fn from_str(value: &str) -> Result<Self> {
        Ok(match value.to_ascii_lowercase().as_str() {
            "string" | "text" => ColumnType::Text,
            "mediumtext" => ColumnType::MediumText,
            "longtext" => ColumnType::LongText,
            "integer" | "int" => ColumnType::Integer,
            "float" | "double" => ColumnType::Float,
            "numeric" | "decimal" => ColumnType::Numeric,
            "boolean" | "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "datetime" | "timestamp" => ColumnType::Timestamp,
            "timestamptz" => ColumnType::TimestampWithTimezone,
            "uuid" => ColumnType::Uuid,
            "json" => ColumnType::Json,
            "array" => ColumnType::Array,
            "binary" | "bytea" | "blob" => ColumnType::Binary,
            _ => return Err(Error::msg(format!("Unknown attribute type tag `{value}`"))),
        })
    }
}

/// Link to the attribute of another table a foreign key points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub table: String,
    pub attribute: String,
}

/// Attribute definition as supplied at registration time.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub column_name: Option<String>,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub references: Option<Reference>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            column_name: None,
            primary_key: false,
            foreign_key: false,
            references: None,
        }
    }
    /// Override the storage column name, defaults to the attribute name.
    pub fn column_name(mut self, name: impl Into<String>) -> Self {
        self.column_name = Some(name.into());
        self
    }
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
    pub fn references(mut self, table: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.foreign_key = true;
        self.references = Some(Reference {
            table: table.into(),
            attribute: attribute.into(),
        });
        self
    }
}

/// Table definition as supplied by the caller at registration time.
#[derive(Default, Debug, Clone)]
pub struct TableDescriptor {
    pub identity: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            columns: Vec::new(),
        }
    }
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Parse a definition object.
    ///
    /// Accepts the usual wire shape where every attribute maps to either a
    /// bare type tag or an object carrying `type`, `columnName`, `primaryKey`,
    /// `foreignKey` and `references`/`on` (or the `model` shorthand). Unknown
    /// keys are ignored.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let identity = value
            .get("identity")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let mut descriptor = TableDescriptor::new(identity);
        let Some(definition) = value.get("definition").and_then(|v| v.as_object()) else {
            return Ok(descriptor);
        };
        for (name, attribute) in definition {
            descriptor.columns.push(match attribute {
                serde_json::Value::String(tag) => ColumnDescriptor::new(name, tag.parse()?),
                serde_json::Value::Object(attribute) => {
                    let column_type = match attribute.get("type").and_then(|v| v.as_str()) {
                        Some(tag) => tag.parse()?,
                        None => ColumnType::Text,
                    };
                    let mut column = ColumnDescriptor::new(name, column_type);
                    if let Some(v) = attribute.get("columnName").and_then(|v| v.as_str()) {
                        column.column_name = Some(v.into());
                    }
                    column.primary_key = attribute
                        .get("primaryKey")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    column.foreign_key = attribute
                        .get("foreignKey")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    let references = attribute.get("references").and_then(|v| v.as_str());
                    let on = attribute.get("on").and_then(|v| v.as_str());
                    let model = attribute.get("model").and_then(|v| v.as_str());
                    column.references = match (references, model) {
                        (Some(table), ..) => Some(Reference {
                            table: table.into(),
                            attribute: on.unwrap_or("id").into(),
                        }),
                        (None, Some(table)) => Some(Reference {
                            table: table.into(),
                            attribute: "id".into(),
                        }),
                        (None, None) => None,
                    };
                    if column.references.is_some() {
                        column.foreign_key = true;
                    }
                    column
                }
                _ => {
                    return Err(Error::msg(format!(
                        "Attribute `{}` must be a type tag or a definition object",
                        name
                    )));
                }
            });
        }
        Ok(descriptor)
    }
}

/// Resolved attribute definition inside a registered [`TableSchema`].
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub column: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub references: Option<Reference>,
}

/// Registered table, the single source of truth for attribute resolution.
///
/// Lookups by callers use the logical attribute name, rows coming back from
/// the backend are keyed by storage column name. The schema answers both.
#[derive(Debug)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnDef>,
    /// Indices of the columns whose values travel through the array/json
    /// storage pipeline, precomputed at registration.
    casts: Box<[usize]>,
}

pub type SharedSchema = Arc<TableSchema>;

impl TableSchema {
    pub fn new(descriptor: TableDescriptor) -> Self {
        let columns: Vec<ColumnDef> = descriptor
            .columns
            .into_iter()
            .map(|c| ColumnDef {
                column: c.column_name.unwrap_or_else(|| c.name.clone()),
                name: c.name,
                column_type: c.column_type,
                primary_key: c.primary_key,
                foreign_key: c.foreign_key,
                references: c.references,
            })
            .collect();
        let casts = columns
            .iter()
            .enumerate()
            .filter(|(.., c)| c.column_type == ColumnType::Array)
            .map(|(i, ..)| i)
            .collect();
        Self {
            name: descriptor.identity,
            columns,
            casts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Find an attribute by its logical name.
    pub fn attribute(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find an attribute by its storage column name.
    pub fn by_column(&self, column: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.column == column)
    }

    /// Resolve a caller supplied name, trying the logical attribute name first
    /// and falling back to the storage column name.
    pub fn resolve(&self, name: &str) -> Option<&ColumnDef> {
        self.attribute(name).or_else(|| self.by_column(name))
    }

    /// Storage column a caller supplied name lands on. Unknown names pass
    /// through untouched and are treated as literal column names.
    pub fn storage_column<'a>(&'a self, name: &'a str) -> &'a str {
        self.resolve(name).map(|c| c.column.as_str()).unwrap_or(name)
    }

    /// Whether any attribute requires the array/json storage pipeline.
    pub fn has_casts(&self) -> bool {
        !self.casts.is_empty()
    }

    pub fn needs_cast_attribute(&self, name: &str) -> bool {
        self.casts.iter().any(|&i| self.columns[i].name == name)
    }

    pub fn needs_cast_column(&self, column: &str) -> bool {
        self.casts.iter().any(|&i| self.columns[i].column == column)
    }
}
