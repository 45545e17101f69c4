//! Wire codec for resource documents
//!
//! Request bodies decode to a field map; documents encode to a flat JSON
//! object carrying the id as a plain string under the configured attribute.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json as JsonExtractor,
};
use serde_json::Value;

use crate::api::error::ApiError;
use crate::log_debug;
use crate::types::{Document, Fields};

/// Custom JSON extractor that turns every rejection into a `DecodeError`
pub struct JsonRequest<T>(pub T);

impl<T, S> FromRequest<S> for JsonRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match JsonExtractor::<T>::from_request(req, state).await {
            Ok(JsonExtractor(value)) => Ok(JsonRequest(value)),
            Err(rejection) => {
                let message = match &rejection {
                    JsonRejection::JsonDataError(err) => {
                        log_debug!("Invalid JSON data: {}", err);
                        "Request body must be a JSON object".to_string()
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON".to_string(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing or invalid Content-Type header. Expected 'application/json'".to_string()
                    }
                    JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
                    _ => rejection.body_text(),
                };
                Err(ApiError::Decode(message))
            }
        }
    }
}

/// Request body of create and update
pub type FieldsRequest = JsonRequest<Fields>;

/// Encode one document for the wire
pub fn encode_document(document: Document, id_field: &str) -> Value {
    let mut object = document.fields;
    object.insert(id_field.to_string(), Value::String(document.id.to_hex()));
    Value::Object(object)
}

/// Encode a list of documents, keeping their order
pub fn encode_documents(documents: Vec<Document>, id_field: &str) -> Value {
    Value::Array(
        documents
            .into_iter()
            .map(|doc| encode_document(doc, id_field))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request as HttpRequest};
    use crate::types::DocumentId;
    use serde_json::json;

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = HttpRequest::builder().method("POST").uri("/api/todos");
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn decode(content_type: Option<&str>, body: &'static str) -> Result<Fields, ApiError> {
        FieldsRequest::from_request(request(content_type, body), &())
            .await
            .map(|JsonRequest(fields)| fields)
    }

    #[tokio::test]
    async fn test_decodes_object_bodies() {
        let fields = decode(Some("application/json"), r#"{"text":"wash dishes","done":false}"#)
            .await
            .unwrap();
        assert_eq!(fields.get("text"), Some(&json!("wash dishes")));
        assert_eq!(fields.get("done"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_rejects_malformed_and_non_object_bodies() {
        for body in ["{not json", "[1,2]", "42", "\"text\"", ""] {
            let err = decode(Some("application/json"), body).await.unwrap_err();
            assert_eq!(err.kind(), "DecodeError", "body {body:?}");
        }
    }

    #[tokio::test]
    async fn test_rejects_missing_content_type() {
        let err = decode(None, r#"{"text":"x"}"#).await.unwrap_err();
        assert_eq!(err.kind(), "DecodeError");
        assert!(err.to_string().contains("Content-Type"));
    }

    #[test]
    fn test_encode_uses_configured_id_attribute() {
        let id = DocumentId::generate();
        let fields = json!({"title": "Dune"}).as_object().cloned().unwrap();
        let doc = Document::new(id, fields);

        let plain = encode_document(doc.clone(), "id");
        assert_eq!(plain, json!({"id": id.to_hex(), "title": "Dune"}));

        let mongo = encode_document(doc, "_id");
        assert_eq!(mongo, json!({"_id": id.to_hex(), "title": "Dune"}));
    }

    #[test]
    fn test_encode_documents_keeps_order() {
        let docs: Vec<Document> = (0..3)
            .map(|i| Document::new(DocumentId::generate(), json!({"order": i}).as_object().cloned().unwrap()))
            .collect();
        let ids: Vec<String> = docs.iter().map(|d| d.id.to_hex()).collect();

        let encoded = encode_documents(docs, "id");
        let encoded_ids: Vec<&str> = encoded
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_str().unwrap())
            .collect();
        assert_eq!(encoded_ids, ids);
    }
}
