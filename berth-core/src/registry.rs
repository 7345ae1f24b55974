use crate::{AdapterError, Result, SharedSchema, TableDescriptor, TableSchema};
use std::{collections::HashMap, sync::Arc};

/// Table schemas owned by one adapter instance.
///
/// Registration parses the descriptor once (cast table included); lookups
/// hand out shared references so query paths never clone column lists.
#[derive(Default, Debug)]
pub struct SchemaRegistry {
    tables: HashMap<String, SharedSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its identity.
    pub fn register(&mut self, descriptor: TableDescriptor) -> Result<SharedSchema> {
        if descriptor.identity.trim().is_empty() {
            return Err(AdapterError::IdentityMissing.into());
        }
        if self.tables.contains_key(&descriptor.identity) {
            return Err(AdapterError::IdentityDuplicate(descriptor.identity).into());
        }
        let schema: SharedSchema = Arc::new(TableSchema::new(descriptor));
        self.tables
            .insert(schema.name().into(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Look a registered table up by identity.
    pub fn get(&self, identity: &str) -> Result<SharedSchema> {
        self.tables
            .get(identity)
            .map(Arc::clone)
            .ok_or_else(|| AdapterError::UnknownTable(identity.into()).into())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.tables.contains_key(identity)
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Drop every registered table.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
