use berth_core::{Context, SqlBuffer, SqlWriter, Value};
use std::fmt::Write;

pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    /// Postgres numbers its placeholders, `$1` onwards in bind order.
    fn write_placeholder(&self, _context: &Context, out: &mut SqlBuffer, value: Value) {
        let ordinal = out.bind(value);
        let _ = write!(out.sql, "${}", ordinal);
    }

    /// Folded patterns use the native ILIKE instead of lower-casing both sides.
    fn write_like(
        &self,
        context: &Context,
        out: &mut SqlBuffer,
        table: &str,
        column: &str,
        pattern: String,
        fold: bool,
    ) {
        self.write_column(context, out, table, column);
        out.push_str(if fold { " ILIKE " } else { " LIKE " });
        if context.parameterize {
            self.write_placeholder(context, out, Value::Varchar(Some(pattern)));
        } else {
            self.write_value_string(context, out, &pattern);
        }
    }
}
