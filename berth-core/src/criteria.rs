use crate::{AdapterError, Error, Result, Value};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    ASC,
    DESC,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub attribute: String,
    pub order: Order,
}

/// Single comparison applied to an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    NotEquals(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Like(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    /// Hydrated related record used in place of a scalar, compared through
    /// the attribute the foreign key points at.
    Reference(Vec<(String, Value)>),
}

/// One predicate inside a [`WhereClause`]. Sibling terms are joined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereTerm {
    /// `and` combinator, parenthesized subclauses joined with AND.
    And(Vec<WhereClause>),
    /// `or` combinator, parenthesized subclauses joined with OR.
    Or(Vec<WhereClause>),
    /// Comparison on a single attribute.
    Compare(String, Condition),
}

impl WhereTerm {
    /// Whether the term produces no SQL, a combinator holding only empty
    /// branches renders nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            WhereTerm::And(branches) | WhereTerm::Or(branches) => {
                branches.iter().all(WhereClause::is_empty)
            }
            WhereTerm::Compare(..) => false,
        }
    }
}

/// Conjunction of predicates, the filter half of a [`Criteria`].
#[derive(Default, Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub terms: Vec<WhereTerm>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compare(mut self, attribute: impl Into<String>, condition: Condition) -> Self {
        self.terms
            .push(WhereTerm::Compare(attribute.into(), condition));
        self
    }

    pub fn and(mut self, branches: Vec<WhereClause>) -> Self {
        self.terms.push(WhereTerm::And(branches));
        self
    }

    pub fn or(mut self, branches: Vec<WhereClause>) -> Self {
        self.terms.push(WhereTerm::Or(branches));
        self
    }

    /// Whether the clause produces no SQL at all, combinators holding only
    /// empty branches count as empty.
    pub fn is_empty(&self) -> bool {
        self.terms.iter().all(WhereTerm::is_empty)
    }

    fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut clause = WhereClause::new();
        for (key, value) in object {
            if key.eq_ignore_ascii_case("and") || key.eq_ignore_ascii_case("or") {
                let Some(branches) = value.as_array() else {
                    return Err(invalid(format!("`{key}` expects an array of subclauses")));
                };
                let branches = branches
                    .iter()
                    .map(|branch| {
                        branch
                            .as_object()
                            .ok_or_else(|| {
                                invalid(format!("`{key}` subclauses must be objects"))
                            })
                            .and_then(WhereClause::from_json)
                    })
                    .collect::<Result<Vec<_>>>()?;
                clause.terms.push(if key.eq_ignore_ascii_case("and") {
                    WhereTerm::And(branches)
                } else {
                    WhereTerm::Or(branches)
                });
            } else {
                leaf_terms(key, value, &mut clause.terms)?;
            }
        }
        Ok(clause)
    }
}

/// Everything a read or modify operation accepts to scope its work: filter,
/// projection, pagination, ordering and the case folding switch.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Criteria {
    pub where_clause: Option<WhereClause>,
    pub select: Option<Vec<String>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub sort: Vec<Sort>,
    /// Comparisons on text attributes fold case unless this is raised.
    pub case_sensitive: bool,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    pub fn select(mut self, attributes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.select = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn sort(mut self, attribute: impl Into<String>, order: Order) -> Self {
        self.sort.push(Sort {
            attribute: attribute.into(),
            order,
        });
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// The filter clause, when present and not vacuously empty.
    pub fn filter_clause(&self) -> Option<&WhereClause> {
        self.where_clause.as_ref().filter(|clause| !clause.is_empty())
    }

    /// Parse a criteria object from its JSON wire shape.
    ///
    /// The object either carries the usual modifier keys (`where`, `select`,
    /// `limit`, `offset`/`skip`, `sort`, `caseSensitive`) or is a bare filter,
    /// in which case the whole object is taken as the `where` clause. `null`
    /// selects everything.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let mut criteria = Criteria::new();
        let object = match value {
            serde_json::Value::Null => return Ok(criteria),
            serde_json::Value::Object(object) => object,
            _ => return Err(invalid("criteria must be an object")),
        };
        if !object.keys().any(|key| MODIFIERS.contains(&key.as_str())) {
            if !object.is_empty() {
                criteria.where_clause = Some(WhereClause::from_json(object)?);
            }
            return Ok(criteria);
        }
        for (key, value) in object {
            match key.as_str() {
                "where" => {
                    criteria.where_clause = match value {
                        serde_json::Value::Null => None,
                        serde_json::Value::Object(object) if object.is_empty() => None,
                        serde_json::Value::Object(object) => {
                            Some(WhereClause::from_json(object)?)
                        }
                        _ => return Err(invalid("`where` must be an object")),
                    }
                }
                "select" => {
                    let Some(attributes) = value.as_array() else {
                        return Err(invalid("`select` must be an array of attribute names"));
                    };
                    criteria.select = Some(
                        attributes
                            .iter()
                            .map(|v| {
                                v.as_str().map(Into::into).ok_or_else(|| {
                                    invalid("`select` must be an array of attribute names")
                                })
                            })
                            .collect::<Result<_>>()?,
                    );
                }
                "limit" => criteria.limit = Some(unsigned_modifier(value, "limit")?),
                "offset" | "skip" => criteria.offset = Some(unsigned_modifier(value, key)?),
                "sort" => criteria.sort = parse_sort(value)?,
                "caseSensitive" => {
                    criteria.case_sensitive = value
                        .as_bool()
                        .ok_or_else(|| invalid("`caseSensitive` must be a boolean"))?
                }
                other => {
                    return Err(invalid(format!(
                        "unexpected `{other}` next to criteria modifiers, nest it under `where`"
                    )));
                }
            }
        }
        Ok(criteria)
    }
}

const MODIFIERS: &[&str] = &[
    "where",
    "select",
    "limit",
    "offset",
    "skip",
    "sort",
    "caseSensitive",
];

/// Closed set of operator keys. Checked before anything else so an attribute
/// can never shadow an operator.
fn is_operator(key: &str) -> bool {
    matches!(
        key,
        "<" | "lessThan"
            | "<="
            | "lessThanOrEqual"
            | ">"
            | "greaterThan"
            | ">="
            | "greaterThanOrEqual"
            | "!"
            | "not"
            | "like"
            | "contains"
            | "startsWith"
            | "endsWith"
    )
}

fn operator_condition(key: &str, value: &serde_json::Value) -> Result<Condition> {
    let pattern = |value: &serde_json::Value| -> Result<String> {
        value
            .as_str()
            .map(Into::into)
            .ok_or_else(|| invalid(format!("`{key}` requires a string argument")))
    };
    Ok(match key {
        "<" | "lessThan" => Condition::LessThan(Value::from_json(value)),
        "<=" | "lessThanOrEqual" => Condition::LessThanOrEqual(Value::from_json(value)),
        ">" | "greaterThan" => Condition::GreaterThan(Value::from_json(value)),
        ">=" | "greaterThanOrEqual" => Condition::GreaterThanOrEqual(Value::from_json(value)),
        "!" | "not" => match value {
            serde_json::Value::Array(entries) => {
                Condition::NotIn(entries.iter().map(Value::from_json).collect())
            }
            _ => Condition::NotEquals(Value::from_json(value)),
        },
        "like" => Condition::Like(pattern(value)?),
        "contains" => Condition::Contains(pattern(value)?),
        "startsWith" => Condition::StartsWith(pattern(value)?),
        "endsWith" => Condition::EndsWith(pattern(value)?),
        _ => return Err(invalid(format!("unknown operator `{key}`"))),
    })
}

/// Turn one `attribute: value` member of a filter object into terms.
///
/// An operator object contributes one term per operator, all joined with AND
/// by the surrounding clause. An object without any operator key is a
/// hydrated related record.
fn leaf_terms(
    attribute: &str,
    value: &serde_json::Value,
    terms: &mut Vec<WhereTerm>,
) -> Result<()> {
    match value {
        serde_json::Value::Array(entries) => terms.push(WhereTerm::Compare(
            attribute.into(),
            Condition::In(entries.iter().map(Value::from_json).collect()),
        )),
        serde_json::Value::Object(object) => {
            let operators = object.keys().filter(|key| is_operator(key)).count();
            if operators == 0 {
                terms.push(WhereTerm::Compare(
                    attribute.into(),
                    Condition::Reference(
                        object
                            .iter()
                            .map(|(name, v)| (name.clone(), Value::from_json(v)))
                            .collect(),
                    ),
                ));
            } else if operators == object.len() {
                for (key, v) in object {
                    terms.push(WhereTerm::Compare(
                        attribute.into(),
                        operator_condition(key, v)?,
                    ));
                }
            } else {
                return Err(invalid(format!(
                    "`{attribute}` mixes operator and attribute keys"
                )));
            }
        }
        _ => terms.push(WhereTerm::Compare(
            attribute.into(),
            Condition::Equals(Value::from_json(value)),
        )),
    }
    Ok(())
}

fn parse_sort(value: &serde_json::Value) -> Result<Vec<Sort>> {
    let Some(object) = value.as_object() else {
        return Err(invalid("`sort` must be an object"));
    };
    object
        .iter()
        .map(|(attribute, direction)| {
            let order = match direction {
                serde_json::Value::Number(v) => {
                    if v.as_f64().unwrap_or(0.0) < 0.0 {
                        Order::DESC
                    } else {
                        Order::ASC
                    }
                }
                serde_json::Value::String(v) => match v.to_ascii_lowercase().as_str() {
                    "asc" => Order::ASC,
                    "desc" => Order::DESC,
                    _ => return Err(invalid(format!("unknown sort direction `{v}`"))),
                },
                _ => return Err(invalid("sort direction must be 1/-1 or ASC/DESC")),
            };
            Ok(Sort {
                attribute: attribute.clone(),
                order,
            })
        })
        .collect()
}

fn unsigned_modifier(value: &serde_json::Value, name: &str) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|v| v.fract() == 0.0 && *v >= 0.0)
                .map(|v| v as u64)
        })
        .ok_or_else(|| invalid(format!("`{name}` must be a non-negative integer")))
}

fn invalid(message: impl Into<String>) -> Error {
    AdapterError::InvalidCriteria(message.into()).into()
}
