use crate::{
    AdapterError, ColumnDef, ColumnType, Condition, Criteria, Error, Fragment, Order, Record,
    Result, Sort, SqlBuffer, TableSchema, Value, WhereClause, WhereTerm, separated_by,
    writer::Context,
};
use std::fmt::Write;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $context:ident, $out:ident, $value:expr) => {{
        if $value.is_infinite() {
            $this.write_value_infinity($context, $out, $value.is_sign_negative());
        } else if $value.is_nan() {
            $this.write_value_nan($context, $out);
        } else {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        }
    }};
}

fn lowercased(value: Value) -> Value {
    match value {
        Value::Varchar(Some(v)) => Value::Varchar(Some(v.to_lowercase())),
        other => other,
    }
}

/// Dialect printer turning schemas, criteria and records into concrete SQL.
///
/// Every method prints into a [`SqlBuffer`], binding parameter values as it
/// goes, so placeholder ordinals always match the order values appear in the
/// finished statement.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Whether the current fragment context allows alias declaration.
    fn alias_declaration(&self, context: &Context) -> bool {
        matches!(context.fragment, Fragment::SqlSelectFrom)
    }

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &Context,
        out: &mut SqlBuffer,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &Context, out: &mut SqlBuffer, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Render the table, self-aliased where the fragment declares aliases.
    fn write_table(&self, context: &Context, out: &mut SqlBuffer, schema: &TableSchema) {
        self.write_identifier_quoted(context, out, schema.name());
        if self.alias_declaration(context) {
            out.push_str(" AS ");
            self.write_identifier_quoted(context, out, schema.name());
        }
    }

    /// Render a column reference, qualified by table when the context asks for it.
    fn write_column(&self, context: &Context, out: &mut SqlBuffer, table: &str, column: &str) {
        if context.qualify_columns && !table.is_empty() {
            self.write_identifier_quoted(context, out, table);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, column);
    }

    /// Render a column reference, wrapped in LOWER() when folding.
    fn write_column_folded(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        table: &str,
        column: &str,
        fold: bool,
    ) {
        if fold {
            out.push_str("LOWER(");
        }
        self.write_column(context, out, table, column);
        if fold {
            out.push(')');
        }
    }

    /// Bind a value and print its placeholder (dialect overrides the shape).
    fn write_placeholder(&self, _context: &Context, out: &mut SqlBuffer, value: Value) {
        out.bind(value);
        out.push('?');
    }

    /// Render a value, either binding a placeholder or printing a literal, and
    /// wrapping string payloads headed for json columns in a CAST.
    fn write_value_expr(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        column: Option<&ColumnDef>,
        value: Value,
    ) {
        let json_cast = column.is_some_and(|c| c.column_type == ColumnType::Json)
            && matches!(value, Value::Varchar(Some(..)));
        if json_cast {
            out.push_str("CAST(");
        }
        if context.parameterize {
            self.write_placeholder(context, out, value);
        } else {
            self.write_value(context, out, &value);
        }
        if json_cast {
            out.push_str(" AS json)");
        }
    }

    /// Render a concrete value as an inline literal (including quoting / escaping).
    fn write_value(&self, context: &Context, out: &mut SqlBuffer, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(context, out),
            Value::Boolean(Some(v)) => self.write_value_bool(context, out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(self, context, out, *v),
            Value::Float64(Some(v)) => write_float!(self, context, out, *v),
            Value::Decimal(Some(v)) => drop(write!(out.sql, "{}", v)),
            Value::Varchar(Some(v)) => self.write_value_string(context, out, v),
            Value::Blob(Some(v)) => self.write_value_blob(context, out, v.as_ref()),
            Value::Date(Some(v)) => self.write_value_date(context, out, v),
            Value::Time(Some(v)) => self.write_value_time(context, out, v),
            Value::Timestamp(Some(v)) => self.write_value_timestamp(context, out, v),
            Value::TimestampWithTimezone(Some(v)) => {
                self.write_value_timestamptz(context, out, v)
            }
            Value::Uuid(Some(v)) => drop(write!(out.sql, "'{}'", v)),
            Value::Json(Some(v)) => self.write_value_string(context, out, &v.to_string()),
            Value::List(Some(..)) => {
                // Lists persist as their JSON serialization
                self.write_value_string(context, out, &value.to_json().to_string())
            }
            _ => self.write_value_none(context, out),
        };
    }

    /// Render NULL literal.
    fn write_value_none(&self, _context: &Context, out: &mut SqlBuffer) {
        out.push_str("NULL");
    }

    /// Render boolean literal.
    fn write_value_bool(&self, _context: &Context, out: &mut SqlBuffer, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, _context: &Context, out: &mut SqlBuffer, value: &str) {
        out.push('\'');
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == '\'' {
                out.push_str(&value[position..i]);
                out.push_str("''");
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
        out.push('\'');
    }

    /// Render an infinity literal through a cast, lacking a native form.
    fn write_value_infinity(&self, context: &Context, out: &mut SqlBuffer, negative: bool) {
        out.push_str("CAST(");
        self.write_value_string(context, out, if negative { "-Infinity" } else { "Infinity" });
        out.push_str(" AS DOUBLE PRECISION)");
    }

    /// Render a NaN literal through a cast, lacking a native form.
    fn write_value_nan(&self, context: &Context, out: &mut SqlBuffer) {
        out.push_str("CAST(");
        self.write_value_string(context, out, "NaN");
        out.push_str(" AS DOUBLE PRECISION)");
    }

    /// Render a blob literal using the hex input form.
    fn write_value_blob(&self, _context: &Context, out: &mut SqlBuffer, value: &[u8]) {
        out.push_str("'\\x");
        out.push_str(&hex::encode(value));
        out.push('\'');
    }

    /// Render a DATE literal.
    fn write_value_date(&self, _context: &Context, out: &mut SqlBuffer, value: &Date) {
        let _ = write!(
            out.sql,
            "'{:04}-{:02}-{:02}'",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    /// Render a TIME literal.
    fn write_value_time(&self, _context: &Context, out: &mut SqlBuffer, value: &Time) {
        let _ = write!(
            out.sql,
            "'{:02}:{:02}:{:02}'",
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    /// Render a TIMESTAMP literal in `YYYY-MM-DD HH:MM:SS` form.
    fn write_value_timestamp(
        &self,
        _context: &Context,
        out: &mut SqlBuffer,
        value: &PrimitiveDateTime,
    ) {
        let _ = write!(
            out.sql,
            "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}'",
            value.year(),
            value.month() as u8,
            value.day(),
            value.hour(),
            value.minute(),
            value.second()
        );
    }

    /// Render a TIMESTAMPTZ literal, normalized to UTC.
    fn write_value_timestamptz(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        value: &OffsetDateTime,
    ) {
        let utc = value.to_utc();
        self.write_value_timestamp(
            context,
            out,
            &PrimitiveDateTime::new(utc.date(), utc.time()),
        );
    }

    /// Render a conjunction of predicates, separating emitting terms with AND.
    fn write_where(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        clause: &WhereClause,
    ) -> Result<()> {
        let mut len = out.len();
        for term in clause.terms.iter().filter(|term| !term.is_empty()) {
            if out.len() > len {
                out.push_str(" AND ");
            }
            len = out.len();
            self.write_where_term(context, out, schema, term)?;
        }
        Ok(())
    }

    /// Render a single predicate, recursing into combinator branches.
    fn write_where_term(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        term: &WhereTerm,
    ) -> Result<()> {
        match term {
            WhereTerm::And(branches) | WhereTerm::Or(branches) => {
                let joiner = match term {
                    WhereTerm::Or(..) => " OR ",
                    _ => " AND ",
                };
                let branches = branches.iter().filter(|branch| !branch.is_empty());
                if branches.clone().next().is_none() {
                    return Ok(());
                }
                out.push('(');
                let mut len = out.len();
                for branch in branches {
                    if out.len() > len {
                        out.push_str(joiner);
                    }
                    len = out.len();
                    out.push('(');
                    self.write_where(context, out, schema, branch)?;
                    out.push(')');
                }
                out.push(')');
            }
            WhereTerm::Compare(attribute, condition) => {
                self.write_criterion(context, out, schema, attribute, condition)?;
            }
        }
        Ok(())
    }

    /// Render one attribute comparison.
    ///
    /// Resolution goes through the schema so aliased attributes land on their
    /// storage column, unresolved names pass through as literal column names.
    /// NULL payloads always render as IS [NOT] NULL without binding anything.
    fn write_criterion(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        attribute: &str,
        condition: &Condition,
    ) -> Result<()> {
        if let Condition::Reference(fields) = condition {
            // Hydrated related record: compare through the attribute the
            // foreign key points at
            let key = schema
                .resolve(attribute)
                .and_then(|c| c.references.as_ref())
                .map(|r| r.attribute.as_str())
                .unwrap_or("id");
            let value = fields
                .iter()
                .find(|(name, ..)| name == key)
                .map(|(.., v)| v.clone())
                .ok_or_else(|| {
                    Error::from(AdapterError::InvalidCriteria(format!(
                        "hydrated record for `{attribute}` has no `{key}` attribute"
                    )))
                })?;
            return self.write_criterion(context, out, schema, attribute, &Condition::Equals(value));
        }
        let column_def = schema.resolve(attribute);
        let table = schema.name();
        let column = column_def.map(|c| c.column.as_str()).unwrap_or(attribute);
        let fold = !context.case_sensitive
            && column_def.is_some_and(|c| c.column_type.is_text() && !c.primary_key);
        match condition {
            Condition::Equals(value) if value.is_null() => {
                self.write_column(context, out, table, column);
                out.push_str(" IS NULL");
            }
            Condition::NotEquals(value) if value.is_null() => {
                self.write_column(context, out, table, column);
                out.push_str(" IS NOT NULL");
            }
            Condition::Equals(value) => {
                self.write_comparison(context, out, table, column, column_def, "=", value, fold)
            }
            Condition::NotEquals(value) => {
                self.write_comparison(context, out, table, column, column_def, "<>", value, fold)
            }
            Condition::LessThan(value) => {
                self.write_comparison(context, out, table, column, column_def, "<", value, fold)
            }
            Condition::LessThanOrEqual(value) => {
                self.write_comparison(context, out, table, column, column_def, "<=", value, fold)
            }
            Condition::GreaterThan(value) => {
                self.write_comparison(context, out, table, column, column_def, ">", value, fold)
            }
            Condition::GreaterThanOrEqual(value) => {
                self.write_comparison(context, out, table, column, column_def, ">=", value, fold)
            }
            Condition::In(values) => {
                self.write_membership(context, out, table, column, column_def, false, values, fold)
            }
            Condition::NotIn(values) => {
                // A null entry strengthens the predicate to IS NOT NULL, the
                // remaining entries form the NOT IN list
                let (nulls, rest): (Vec<Value>, Vec<Value>) =
                    values.iter().cloned().partition(|v| v.is_null());
                if !nulls.is_empty() {
                    self.write_column(context, out, table, column);
                    out.push_str(" IS NOT NULL");
                    if !rest.is_empty() {
                        out.push_str(" AND ");
                    }
                }
                if !rest.is_empty() {
                    self.write_membership(
                        context, out, table, column, column_def, true, &rest, fold,
                    );
                } else if nulls.is_empty() {
                    // NOT IN over an empty set holds for every row
                    out.push_str("TRUE");
                }
            }
            Condition::Like(pattern) => {
                self.write_like(context, out, table, column, pattern.clone(), fold)
            }
            Condition::Contains(value) => {
                self.write_like(context, out, table, column, format!("%{value}%"), fold)
            }
            Condition::StartsWith(value) => {
                self.write_like(context, out, table, column, format!("{value}%"), fold)
            }
            Condition::EndsWith(value) => {
                self.write_like(context, out, table, column, format!("%{value}"), fold)
            }
            Condition::Reference(..) => unreachable!(),
        }
        Ok(())
    }

    /// Render a binary comparison, folding case on both sides when it applies.
    fn write_comparison(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        table: &str,
        column: &str,
        column_def: Option<&ColumnDef>,
        operator: &str,
        value: &Value,
        fold: bool,
    ) {
        let fold = fold && value.as_str().is_some();
        self.write_column_folded(context, out, table, column, fold);
        out.push(' ');
        out.push_str(operator);
        out.push(' ');
        let value = if fold {
            lowercased(value.clone())
        } else {
            value.clone()
        };
        self.write_value_expr(context, out, column_def, value);
    }

    /// Render an IN / NOT IN membership test.
    fn write_membership(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        table: &str,
        column: &str,
        column_def: Option<&ColumnDef>,
        negated: bool,
        values: &[Value],
        fold: bool,
    ) {
        if values.is_empty() {
            // IN over an empty set can never hold
            out.push_str(if negated { "TRUE" } else { "FALSE" });
            return;
        }
        let fold = fold && values.iter().any(|v| v.as_str().is_some());
        self.write_column_folded(context, out, table, column, fold);
        out.push_str(if negated { " NOT IN (" } else { " IN (" });
        separated_by(
            out,
            values,
            |out, value| {
                let value = if fold {
                    lowercased(value.clone())
                } else {
                    value.clone()
                };
                self.write_value_expr(context, out, column_def, value);
            },
            ", ",
        );
        out.push(')');
    }

    /// Render a LIKE family comparison. The pattern is always bound as a
    /// value, wildcards included (dialect may override the folded form).
    fn write_like(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        table: &str,
        column: &str,
        pattern: String,
        fold: bool,
    ) {
        self.write_column_folded(context, out, table, column, fold);
        out.push_str(" LIKE ");
        let pattern = if fold {
            pattern.to_lowercase()
        } else {
            pattern
        };
        if context.parameterize {
            self.write_placeholder(context, out, Value::Varchar(Some(pattern)));
        } else {
            self.write_value_string(context, out, &pattern);
        }
    }

    /// Render the ORDER BY column list.
    fn write_order_by(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        sort: &[Sort],
    ) {
        separated_by(
            out,
            sort,
            |out, item| {
                self.write_column(
                    context,
                    out,
                    schema.name(),
                    schema.storage_column(&item.attribute),
                );
                out.push_str(match item.order {
                    Order::ASC => " ASC",
                    Order::DESC => " DESC",
                });
            },
            ", ",
        );
    }

    /// Render LIMIT / OFFSET as inline integers.
    fn write_limit_offset(
        &self,
        _context: &Context,
        out: &mut SqlBuffer,
        limit: Option<u64>,
        offset: Option<u64>,
    ) {
        if let Some(limit) = limit {
            out.push_str(" LIMIT ");
            write_integer!(out, limit);
        }
        if let Some(offset) = offset {
            out.push_str(" OFFSET ");
            write_integer!(out, offset);
        }
    }

    /// Ask modify statements to hand back the touched rows.
    fn write_returning(&self, _context: &Context, out: &mut SqlBuffer) {
        out.push_str(" RETURNING *");
    }

    /// Emit a SELECT over the table (projection, FROM, WHERE, ORDER, LIMIT, OFFSET).
    fn write_find(
        &self,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        criteria: &Criteria,
    ) -> Result<()> {
        let mut context = Context::new(Fragment::SqlSelect, true);
        context.case_sensitive = criteria.case_sensitive;
        out.push_str("SELECT ");
        let table = schema.name();
        match criteria.select.as_deref() {
            Some(attributes) if !attributes.is_empty() => separated_by(
                out,
                attributes,
                |out, attribute| {
                    self.write_column(&context, out, table, schema.storage_column(attribute));
                },
                ", ",
            ),
            _ if schema.columns().is_empty() => out.push('*'),
            _ => separated_by(
                out,
                schema.columns(),
                |out, column| {
                    self.write_column(&context, out, table, &column.column);
                },
                ", ",
            ),
        }
        out.push_str(" FROM ");
        self.write_table(&context.switch_fragment(Fragment::SqlSelectFrom), out, schema);
        if let Some(clause) = criteria.filter_clause() {
            out.push_str(" WHERE ");
            self.write_where(
                &context.switch_fragment(Fragment::SqlSelectWhere),
                out,
                schema,
                clause,
            )?;
        }
        if !criteria.sort.is_empty() {
            out.push_str(" ORDER BY ");
            self.write_order_by(
                &context.switch_fragment(Fragment::SqlSelectOrderBy),
                out,
                schema,
                &criteria.sort,
            );
        }
        self.write_limit_offset(&context, out, criteria.limit, criteria.offset);
        Ok(())
    }

    /// Emit a COUNT(*) aliased `count`. Projection, ordering and pagination
    /// modifiers do not apply to the aggregate and are ignored.
    fn write_count(
        &self,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        criteria: &Criteria,
    ) -> Result<()> {
        let mut context = Context::new(Fragment::SqlSelect, true);
        context.case_sensitive = criteria.case_sensitive;
        out.push_str("SELECT COUNT(*) AS ");
        self.write_identifier_quoted(&context, out, "count");
        out.push_str(" FROM ");
        self.write_table(&context.switch_fragment(Fragment::SqlSelectFrom), out, schema);
        if let Some(clause) = criteria.filter_clause() {
            out.push_str(" WHERE ");
            self.write_where(
                &context.switch_fragment(Fragment::SqlSelectWhere),
                out,
                schema,
                clause,
            )?;
        }
        Ok(())
    }

    /// Emit an INSERT built from the record's attributes, asking for the row back.
    fn write_insert(&self, out: &mut SqlBuffer, schema: &TableSchema, record: &Record) {
        let context = Context::new(Fragment::SqlInsertInto, false);
        out.push_str("INSERT INTO ");
        self.write_table(&context, out, schema);
        if record.is_empty() {
            out.push_str(" DEFAULT VALUES");
            self.write_returning(&context, out);
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            record.iter(),
            |out, (name, ..)| {
                self.write_identifier_quoted(&context, out, schema.storage_column(name));
            },
            ", ",
        );
        out.push_str(") VALUES (");
        let values_context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        separated_by(
            out,
            record.iter(),
            |out, (name, value)| {
                self.write_value_expr(&values_context, out, schema.resolve(name), value.clone());
            },
            ", ",
        );
        out.push(')');
        self.write_returning(&context, out);
    }

    /// Emit an UPDATE applying `changes` to the rows the criteria matches.
    ///
    /// UPDATE has no portable row limit, a criteria carrying one is refused.
    fn write_update(
        &self,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        criteria: &Criteria,
        changes: &Record,
    ) -> Result<()> {
        if criteria.limit.is_some() {
            return Err(AdapterError::UnsupportedModifier("limit").into());
        }
        if changes.is_empty() {
            return Err(Error::msg("The update carries no values to set"));
        }
        let mut context = Context::new(Fragment::SqlUpdate, false);
        context.case_sensitive = criteria.case_sensitive;
        out.push_str("UPDATE ");
        self.write_table(&context, out, schema);
        out.push_str(" SET ");
        let set_context = context.switch_fragment(Fragment::SqlUpdateSet);
        separated_by(
            out,
            changes.iter(),
            |out, (name, value)| {
                self.write_identifier_quoted(&set_context, out, schema.storage_column(name));
                out.push_str(" = ");
                self.write_value_expr(&set_context, out, schema.resolve(name), value.clone());
            },
            ", ",
        );
        if let Some(clause) = criteria.filter_clause() {
            out.push_str(" WHERE ");
            self.write_where(
                &context.switch_fragment(Fragment::SqlUpdateWhere),
                out,
                schema,
                clause,
            )?;
        }
        self.write_returning(&context, out);
        Ok(())
    }

    /// Emit a DELETE for the rows the criteria matches.
    ///
    /// Like UPDATE, DELETE cannot honor a row limit and refuses one.
    fn write_delete(
        &self,
        out: &mut SqlBuffer,
        schema: &TableSchema,
        criteria: &Criteria,
    ) -> Result<()> {
        if criteria.limit.is_some() {
            return Err(AdapterError::UnsupportedModifier("limit").into());
        }
        let mut context = Context::new(Fragment::SqlDeleteFrom, false);
        context.case_sensitive = criteria.case_sensitive;
        out.push_str("DELETE FROM ");
        self.write_table(&context, out, schema);
        if let Some(clause) = criteria.filter_clause() {
            out.push_str(" WHERE ");
            self.write_where(
                &context.switch_fragment(Fragment::SqlDeleteFromWhere),
                out,
                schema,
                clause,
            )?;
        }
        self.write_returning(&context, out);
        Ok(())
    }
}

/// Fallback generic SQL writer (closest to PostgreSQL conventions).
pub struct GenericSqlWriter;
impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}
impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
