//! Resource collections
//!
//! A resource is a named collection exposed under the API prefix. The
//! registry decides which names are served and with which schema.

use std::collections::HashMap;
use thiserror::Error;

use crate::core::config::{is_path_safe, Config};

/// Field schemas and payload validation
pub mod schema;

pub use schema::{normalize_date, FieldKind, FieldSpec, ResourceSchema, RESERVED_ID_KEYS};

/// Why a payload was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or null
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// A field had the wrong JSON kind
    #[error("field '{field}' must be a {expected}")]
    WrongKind {
        /// Offending field
        field: String,
        /// Expected kind name
        expected: &'static str,
    },
}

/// Lookup table of served resources
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    declared: HashMap<String, ResourceSchema>,
    order: Vec<String>,
    dynamic: bool,
    schemaless: ResourceSchema,
}

impl ResourceRegistry {
    /// Build the registry from configuration
    pub fn from_config(config: &Config) -> Self {
        let mut declared = HashMap::new();
        let mut order = Vec::new();
        for resource in &config.resources {
            declared.insert(resource.name.clone(), ResourceSchema::from_config(resource));
            order.push(resource.name.clone());
        }

        Self {
            declared,
            order,
            dynamic: config.api.dynamic_resources,
            schemaless: ResourceSchema::schemaless(),
        }
    }

    /// Schema for `name`, or `None` if the name is not served.
    ///
    /// With dynamic resources enabled any path-safe name is served; names
    /// that were not declared are schemaless.
    pub fn resolve(&self, name: &str) -> Option<&ResourceSchema> {
        match self.declared.get(name) {
            Some(schema) => Some(schema),
            None if self.dynamic && is_path_safe(name) => Some(&self.schemaless),
            None => None,
        }
    }

    /// Declared resource names, in configuration order
    pub fn declared(&self) -> &[String] {
        &self.order
    }

    /// Whether `name` is a configured resource
    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    /// Whether undeclared names are served
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}
