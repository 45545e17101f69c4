//! Field schemas and payload validation

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::ResourceConfig;
use crate::resource::ValidationError;
use crate::types::Fields;

/// JSON kind a declared field must have
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// JSON string
    String,
    /// Any JSON number
    Number,
    /// JSON number without a fractional part
    Integer,
    /// JSON boolean
    Boolean,
    /// RFC 3339 string, `YYYY-MM-DD`, or epoch milliseconds; stored as RFC 3339 UTC
    Date,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// Anything
    #[default]
    Any,
}

impl FieldKind {
    /// Name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Any => "any",
        }
    }

    /// Check `value` against this kind, returning the value to store
    fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (FieldKind::Any, v) => Some(v),
            (FieldKind::String, v @ Value::String(_)) => Some(v),
            (FieldKind::Number, v @ Value::Number(_)) => Some(v),
            (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(Value::Number(n)),
            (FieldKind::Boolean, v @ Value::Bool(_)) => Some(v),
            (FieldKind::Array, v @ Value::Array(_)) => Some(v),
            (FieldKind::Object, v @ Value::Object(_)) => Some(v),
            (FieldKind::Date, v) => normalize_date(&v).map(Value::String),
            _ => None,
        }
    }
}

/// Accepts RFC 3339, a bare calendar date, or integer epoch milliseconds
pub fn normalize_date(value: &Value) -> Option<String> {
    let parsed: DateTime<Utc> = match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                dt.with_timezone(&Utc)
            } else {
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?)
            }
        }
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single()?,
        _ => return None,
    };
    Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Identifier keys that never reach the store as domain fields
pub const RESERVED_ID_KEYS: &[&str] = &["id", "_id"];

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Expected kind
    pub kind: FieldKind,
    /// Must be present and non-null
    pub required: bool,
}

/// Shape of one resource's documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    fields: Vec<FieldSpec>,
    strict: bool,
}

impl ResourceSchema {
    /// A schema that accepts any object unchanged
    pub fn schemaless() -> Self {
        Self {
            fields: Vec::new(),
            strict: false,
        }
    }

    /// Build from the configured resource
    pub fn from_config(config: &ResourceConfig) -> Self {
        Self {
            fields: config
                .fields
                .iter()
                .map(|f| FieldSpec {
                    name: f.name.clone(),
                    kind: f.kind,
                    required: f.required,
                })
                .collect(),
            strict: config.strict,
        }
    }

    /// Declared fields
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Whether the schema declares no fields
    pub fn is_schemaless(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a decoded payload and produce the fields to store.
    ///
    /// `id_field`, `id` and `_id` are dropped first: identifiers belong to the
    /// store, and `_id` is the id key of the file store's on-disk records.
    /// Declared fields that are absent or `null` are left out, so a full
    /// replace with a partial payload clears them. Undeclared keys are dropped
    /// when the schema is strict.
    pub fn validate(&self, mut payload: Fields, id_field: &str) -> Result<Fields, ValidationError> {
        payload.remove(id_field);
        for reserved in RESERVED_ID_KEYS {
            payload.remove(*reserved);
        }

        if self.is_schemaless() {
            return Ok(payload);
        }

        let mut out = Fields::new();
        for spec in &self.fields {
            match payload.remove(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ValidationError::MissingField(spec.name.clone()));
                    }
                }
                Some(value) => {
                    let stored = spec.kind.coerce(value).ok_or_else(|| ValidationError::WrongKind {
                        field: spec.name.clone(),
                        expected: spec.kind.as_str(),
                    })?;
                    out.insert(spec.name.clone(), stored);
                }
            }
        }

        if !self.strict {
            out.extend(payload);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{default_resources, FieldConfig};
    use serde_json::json;

    fn obj(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn todos() -> ResourceSchema {
        ResourceSchema::from_config(&default_resources()[1])
    }

    fn books() -> ResourceSchema {
        ResourceSchema::from_config(&default_resources()[0])
    }

    #[test]
    fn test_todo_payload_passes_and_strips_ids() {
        let out = todos()
            .validate(obj(json!({"id": "abc", "text": "wash dishes", "done": false, "order": 1})), "id")
            .unwrap();
        assert_eq!(out, obj(json!({"text": "wash dishes", "done": false, "order": 1})));
    }

    #[test]
    fn test_strict_schema_drops_unknown_keys() {
        let out = todos()
            .validate(obj(json!({"text": "x", "colour": "red"})), "id")
            .unwrap();
        assert_eq!(out, obj(json!({"text": "x"})));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let err = todos().validate(obj(json!({"done": "yes"})), "id").unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongKind {
                field: "done".to_string(),
                expected: "boolean"
            }
        );
    }

    #[test]
    fn test_null_and_missing_fields_are_cleared() {
        let out = todos().validate(obj(json!({"text": null})), "id").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_required_field() {
        let config = ResourceConfig {
            name: "notes".to_string(),
            strict: false,
            fields: vec![FieldConfig {
                name: "body".to_string(),
                kind: FieldKind::String,
                required: true,
            }],
        };
        let schema = ResourceSchema::from_config(&config);

        assert_eq!(
            schema.validate(obj(json!({"other": 1})), "id").unwrap_err(),
            ValidationError::MissingField("body".to_string())
        );
        assert_eq!(
            schema.validate(obj(json!({"body": null})), "id").unwrap_err(),
            ValidationError::MissingField("body".to_string())
        );
        let out = schema.validate(obj(json!({"body": "hi", "other": 1})), "id").unwrap();
        assert_eq!(out, obj(json!({"body": "hi", "other": 1})));
    }

    #[test]
    fn test_book_dates_are_normalized() {
        let out = books()
            .validate(
                obj(json!({"title": "Dune", "releaseDate": "1965-08-01", "keywords": [{"keyword": "sand"}]})),
                "_id",
            )
            .unwrap();
        assert_eq!(out["releaseDate"], json!("1965-08-01T00:00:00.000Z"));
        assert_eq!(out["keywords"], json!([{"keyword": "sand"}]));

        assert!(books().validate(obj(json!({"releaseDate": "last tuesday"})), "_id").is_err());
    }

    #[test]
    fn test_normalize_date_inputs() {
        assert_eq!(
            normalize_date(&json!("2013-02-03T04:05:06+01:00")).unwrap(),
            "2013-02-03T03:05:06.000Z"
        );
        assert_eq!(normalize_date(&json!(0)).unwrap(), "1970-01-01T00:00:00.000Z");
        assert!(normalize_date(&json!(true)).is_none());
        assert!(normalize_date(&json!(1.5)).is_none());
    }

    #[test]
    fn test_integer_kind() {
        let schema = ResourceSchema::from_config(&ResourceConfig {
            name: "counters".to_string(),
            strict: true,
            fields: vec![FieldConfig {
                name: "n".to_string(),
                kind: FieldKind::Integer,
                required: false,
            }],
        });
        assert!(schema.validate(obj(json!({"n": 3})), "id").is_ok());
        assert!(schema.validate(obj(json!({"n": 3.5})), "id").is_err());
    }

    #[test]
    fn test_schemaless_keeps_everything_but_ids() {
        let out = ResourceSchema::schemaless()
            .validate(obj(json!({"_id": "x", "id": "y", "a": 1, "b": [2]})), "_id")
            .unwrap();
        assert_eq!(out, obj(json!({"a": 1, "b": [2]})));
    }

    #[test]
    fn test_underscore_id_is_dropped_with_plain_id_attribute() {
        let out = ResourceSchema::schemaless()
            .validate(obj(json!({"_id": "client-sent", "text": "x"})), "id")
            .unwrap();
        assert_eq!(out, obj(json!({"text": "x"})));

        let mut loose = default_resources()[1].clone();
        loose.strict = false;
        let out = ResourceSchema::from_config(&loose)
            .validate(obj(json!({"_id": "client-sent", "text": "x", "extra": 1})), "id")
            .unwrap();
        assert_eq!(out, obj(json!({"text": "x", "extra": 1})));
    }
}
