use crate::{Connection, SqlWriter};

pub trait Driver {
    type Connection: Connection;
    type SqlWriter: SqlWriter;

    /// Scheme expected at the front of connection URLs.
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;
}
