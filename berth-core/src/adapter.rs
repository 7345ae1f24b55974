use crate::{
    AdapterError, Connection, Criteria, Driver, Error, Query, Record, Result, RowLabeled,
    SchemaRegistry, SharedSchema, SqlBuffer, SqlWriter, TableDescriptor, Value, record_to_storage,
    row_to_record,
};
use std::borrow::Cow;

/// Mapper facing facade tying the pieces together.
///
/// Owns one backend connection and the schemas registered against it. Every
/// operation resolves the table, renders SQL through the driver's writer,
/// runs it and normalizes the returned rows back into attribute keyed
/// records. After [`teardown`](Adapter::teardown) the connection is gone and
/// operations fail with [`AdapterError::InvalidConnection`].
pub struct Adapter<C: Connection> {
    connection: Option<C>,
    registry: SchemaRegistry,
}

impl<C: Connection> Adapter<C> {
    /// Connect to the given URL and start with an empty schema set.
    pub async fn connect(url: impl Into<Cow<'static, str>>) -> Result<Self> {
        Ok(Self::new(C::connect(url.into()).await?))
    }

    /// Wrap an already established connection.
    pub fn new(connection: C) -> Self {
        Self {
            connection: Some(connection),
            registry: SchemaRegistry::new(),
        }
    }

    /// Register a table so criteria against it resolve attributes and casts.
    pub fn register_table(&mut self, descriptor: TableDescriptor) -> Result<()> {
        self.registry.register(descriptor)?;
        Ok(())
    }

    /// Schema registered under the given identity.
    pub fn schema(&self, table: &str) -> Result<SharedSchema> {
        self.registry.get(table)
    }

    /// Fetch the records the criteria matches.
    pub async fn find(&mut self, table: &str, criteria: &Criteria) -> Result<Vec<Record>> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(AdapterError::InvalidConnection)?;
        let schema = self.registry.get(table)?;
        let mut out = SqlBuffer::with_capacity(512);
        connection
            .driver()
            .sql_writer()
            .write_find(&mut out, &schema, criteria)?;
        let rows = connection.fetch_all(out.into_query()).await?;
        Ok(rows
            .into_iter()
            .map(|row| row_to_record(&schema, row))
            .collect())
    }

    /// Count the records the criteria matches.
    pub async fn count(&mut self, table: &str, criteria: &Criteria) -> Result<i64> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(AdapterError::InvalidConnection)?;
        let schema = self.registry.get(table)?;
        let mut out = SqlBuffer::with_capacity(512);
        connection
            .driver()
            .sql_writer()
            .write_count(&mut out, &schema, criteria)?;
        let rows = connection.fetch_all(out.into_query()).await?;
        let row = rows.into_iter().next().ok_or(AdapterError::EmptyResult)?;
        let count = row.get_column("count").cloned().unwrap_or_default();
        // Some backends hand aggregates back as text
        count.as_i64().ok_or_else(|| {
            Error::msg(format!("The count query returned a non numeric value: {count:?}"))
        })
    }

    /// Insert one record, returning it as stored.
    pub async fn create(&mut self, table: &str, record: Record) -> Result<Record> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(AdapterError::InvalidConnection)?;
        let schema = self.registry.get(table)?;
        let record = record_to_storage(&schema, record);
        let mut out = SqlBuffer::with_capacity(512);
        connection
            .driver()
            .sql_writer()
            .write_insert(&mut out, &schema, &record);
        let rows = connection.fetch_all(out.into_query()).await?;
        let row = rows.into_iter().next().ok_or(AdapterError::EmptyResult)?;
        Ok(row_to_record(&schema, row))
    }

    /// Insert records one by one, results come back in input order.
    pub async fn create_each(&mut self, table: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            created.push(self.create(table, record).await?);
        }
        Ok(created)
    }

    /// Apply the changes to the records the criteria matches, returning them.
    pub async fn update(
        &mut self,
        table: &str,
        criteria: &Criteria,
        changes: Record,
    ) -> Result<Vec<Record>> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(AdapterError::InvalidConnection)?;
        let schema = self.registry.get(table)?;
        let changes = record_to_storage(&schema, changes);
        let mut out = SqlBuffer::with_capacity(512);
        connection
            .driver()
            .sql_writer()
            .write_update(&mut out, &schema, criteria, &changes)?;
        let rows = connection.fetch_all(out.into_query()).await?;
        Ok(rows
            .into_iter()
            .map(|row| row_to_record(&schema, row))
            .collect())
    }

    /// Delete the records the criteria matches, returning them.
    pub async fn destroy(&mut self, table: &str, criteria: &Criteria) -> Result<Vec<Record>> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(AdapterError::InvalidConnection)?;
        let schema = self.registry.get(table)?;
        let mut out = SqlBuffer::with_capacity(512);
        connection
            .driver()
            .sql_writer()
            .write_delete(&mut out, &schema, criteria)?;
        let rows = connection.fetch_all(out.into_query()).await?;
        Ok(rows
            .into_iter()
            .map(|row| row_to_record(&schema, row))
            .collect())
    }

    /// Raw SQL escape hatch, parameterized but bypassing the query builder.
    pub async fn query(
        &mut self,
        sql: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<Vec<RowLabeled>> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(AdapterError::InvalidConnection)?;
        connection.fetch_all(Query::new(sql, values)).await
    }

    /// Drop the connection and every registered schema.
    pub fn teardown(&mut self) {
        self.registry.clear();
        self.connection = None;
    }

    /// Migrations are out of scope, the mapper's DDL entry points accept and
    /// do nothing so generic setup flows keep working.
    pub fn define(&mut self, _table: &str, _definition: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    pub fn create_schema(&mut self, _schema: &str) -> Result<()> {
        Ok(())
    }

    pub fn drop_table(&mut self, _table: &str) -> Result<()> {
        Ok(())
    }

    pub fn add_attribute(
        &mut self,
        _table: &str,
        _attribute: &str,
        _definition: &serde_json::Value,
    ) -> Result<()> {
        Ok(())
    }

    pub fn remove_attribute(&mut self, _table: &str, _attribute: &str) -> Result<()> {
        Ok(())
    }

    /// The adapter keeps no backend schema knowledge to report.
    pub fn describe(&self, _table: &str) -> Result<Option<TableDescriptor>> {
        Ok(None)
    }

    /// Record streaming over the mapper protocol is not provided.
    pub fn stream(&mut self, _table: &str, _criteria: &Criteria) -> Result<()> {
        Err(AdapterError::Unsupported("stream").into())
    }
}
