//! Document type shared by the store, handlers and codec

use crate::types::DocumentId;
use serde_json::{Map, Value};

/// Domain fields of a document, keyed by field name
pub type Fields = Map<String, Value>;

/// One record of a resource collection
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned identifier
    pub id: DocumentId,
    /// Domain fields; never contains the identifier
    pub fields: Fields,
}

impl Document {
    /// Create a document from an id and its fields
    pub fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Look up a single field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
