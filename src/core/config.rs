//! Configuration management for the resource server
//!
//! Settings come from three layers, applied in order: a TOML file (or the
//! built-in defaults), `RS_*` environment variables, and finally command line
//! flags (see `main.rs`). [`Config::validate`] runs after all layers.

use crate::core::error::{Error, Result};
use crate::resource::{FieldKind, RESERVED_ID_KEYS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Available storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Process-local store, lost on restart
    Memory,
    /// Memory store mirrored to one JSON file per collection
    File,
}

impl StorageType {
    /// Lowercase name, as accepted in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Memory => "memory",
            StorageType::File => "file",
        }
    }
}

impl std::str::FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "file" => Ok(StorageType::File),
            other => Err(Error::config(format!(
                "Invalid storage type: {}. Valid options: memory, file",
                other
            ))),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Routing configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Wire format configuration
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Declared resource collections
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: SocketAddr,

    /// Directory served for non-API paths
    pub static_dir: Option<PathBuf>,

    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type
    pub storage_type: StorageType,

    /// Data directory path (file storage only)
    pub data_dir: PathBuf,

    /// Upper bound for a single store call
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub operation_timeout: Duration,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Path prefix for resource routes
    pub prefix: String,

    /// Accept any collection name, not just the declared ones
    pub dynamic_resources: bool,
}

/// Wire format configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Name of the identifier attribute in JSON bodies (`id` or `_id`)
    pub id_field: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Use the compact single-line formatter
    pub compact: bool,

    /// Include the event target in each line
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose Prometheus metrics at `/metrics`
    pub enabled: bool,
}

/// One declared resource collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Collection name, also the path segment
    pub name: String,

    /// Drop payload keys that are not declared fields
    #[serde(default = "default_strict")]
    pub strict: bool,

    /// Declared fields; empty means schemaless
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// One declared field of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Field name
    pub name: String,

    /// Expected JSON kind
    #[serde(default)]
    pub kind: FieldKind,

    /// Reject payloads that omit this field
    #[serde(default)]
    pub required: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            api: ApiConfig::default(),
            codec: CodecConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            resources: default_resources(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 4711)),
            static_dir: None,
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            data_dir: PathBuf::from("./data"),
            operation_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
            dynamic_resources: false,
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            compact: false,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_strict() -> bool {
    true
}

fn field(name: &str, kind: FieldKind) -> FieldConfig {
    FieldConfig {
        name: name.to_string(),
        kind,
        required: false,
    }
}

/// The two collections every default deployment serves
pub fn default_resources() -> Vec<ResourceConfig> {
    vec![
        ResourceConfig {
            name: "books".to_string(),
            strict: true,
            fields: vec![
                field("title", FieldKind::String),
                field("author", FieldKind::String),
                field("releaseDate", FieldKind::Date),
                field("keywords", FieldKind::Array),
            ],
        },
        ResourceConfig {
            name: "todos".to_string(),
            strict: true,
            fields: vec![
                field("text", FieldKind::String),
                field("done", FieldKind::Boolean),
                field("order", FieldKind::Number),
            ],
        },
    ]
}

impl Config {
    /// Load configuration: file (or defaults), then environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply `RS_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("RS_HTTP_ADDR") {
            self.server.http_addr = addr
                .parse()
                .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
        }

        if let Some(dir) = lookup("RS_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }

        if let Some(storage_type) = lookup("RS_STORAGE_TYPE") {
            self.storage.storage_type = storage_type.parse()?;
        }

        if let Some(data_dir) = lookup("RS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Some(timeout) = lookup("RS_STORE_TIMEOUT") {
            self.storage.operation_timeout = parse_duration(&timeout)
                .map_err(|e| Error::config(format!("Invalid store timeout: {}", e)))?;
        }

        if let Some(level) = lookup("RS_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage.operation_timeout.is_zero() {
            return Err(Error::config("Store operation timeout must be non-zero"));
        }

        if self.server.max_body_bytes == 0 {
            return Err(Error::config("max_body_bytes must be non-zero"));
        }

        if !self.api.prefix.starts_with('/') || self.api.prefix.len() < 2 || self.api.prefix.ends_with('/') {
            return Err(Error::config(format!(
                "API prefix must look like '/api', got '{}'",
                self.api.prefix
            )));
        }

        if self.codec.id_field.is_empty() {
            return Err(Error::config("codec.id_field must not be empty"));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::config(format!("Invalid log level: {}", other))),
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !is_path_safe(&resource.name) {
                return Err(Error::config(format!(
                    "Invalid resource name '{}': use letters, digits, '-' or '_'",
                    resource.name
                )));
            }
            if !seen.insert(resource.name.as_str()) {
                return Err(Error::config(format!("Duplicate resource '{}'", resource.name)));
            }

            let mut fields = HashSet::new();
            for field in &resource.fields {
                if field.name.is_empty()
                    || field.name == self.codec.id_field
                    || RESERVED_ID_KEYS.contains(&field.name.as_str())
                {
                    return Err(Error::config(format!(
                        "Invalid field name '{}' on resource '{}'",
                        field.name, resource.name
                    )));
                }
                if !fields.insert(field.name.as_str()) {
                    return Err(Error::config(format!(
                        "Duplicate field '{}' on resource '{}'",
                        field.name, resource.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Collection names double as path segments and file names
pub fn is_path_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// For TOML parsing
use serde::de::{self, Deserializer, Visitor};
use serde::Serializer;
use std::fmt;

// Custom deserializer for Duration from string
fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration string like '30s' or '500ms', or whole seconds")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            parse_duration(value).map_err(E::custom)
        }

        fn visit_i64<E>(self, value: i64) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            u64::try_from(value)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_u64<E>(self, value: u64) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(value))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}

/// Simple duration parser for common formats
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let parse = |digits: &str, what: &str| -> std::result::Result<u64, String> {
        digits.parse().map_err(|_| format!("Invalid {}: '{}'", what, s))
    };
    let scaled = |value: u64, factor: u64| -> std::result::Result<Duration, String> {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("Duration out of range: '{}'", s))
    };

    if let Some(ms) = s.strip_suffix("ms") {
        Ok(Duration::from_millis(parse(ms, "milliseconds")?))
    } else if let Some(secs) = s.strip_suffix('s') {
        Ok(Duration::from_secs(parse(secs, "seconds")?))
    } else if let Some(mins) = s.strip_suffix('m') {
        scaled(parse(mins, "minutes")?, 60)
    } else if let Some(hours) = s.strip_suffix('h') {
        scaled(parse(hours, "hours")?, 3600)
    } else {
        // Raw seconds
        Ok(Duration::from_secs(parse(s, "duration")?))
    }
}
