//! Records read from a table.

use georest_proto::Value;

use crate::catalog::SchemaDescriptor;

static NULL: Value = Value::Null;

/// One row: field values by column name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Value of a field. Absent fields read as null.
    pub fn get_field(&self, name: &str) -> &Value {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .unwrap_or(&NULL)
    }

    /// All fields.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Primary key values, in the descriptor's key column order.
    pub fn primary_key(&self, descriptor: &SchemaDescriptor) -> Vec<Value> {
        descriptor
            .primary_key_column_names()
            .iter()
            .map(|name| self.get_field(name).clone())
            .collect()
    }

    /// Primary key text, comma-joined. `None` for tables without a key.
    pub fn key_text(&self, descriptor: &SchemaDescriptor) -> Option<String> {
        let names = descriptor.primary_key_column_names();
        if names.is_empty() {
            return None;
        }
        let parts: Vec<String> = names
            .iter()
            .map(|name| self.get_field(name).to_text().unwrap_or_default())
            .collect();
        Some(parts.join(","))
    }
}
