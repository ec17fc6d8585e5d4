use crate::document::{Document, Filter, FilterOp};
use crate::error::{Result, StoreError};
use crate::store::DocumentStore;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_DATABASE: &str = "(default)";

#[derive(Clone, Debug)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    /// OAuth2 bearer token. Requests are sent unauthenticated when absent.
    pub token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: DEFAULT_DATABASE.to_string(),
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents:runQuery",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }
}

/// Firestore REST backend using structured `runQuery` requests.
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self> {
        if config.project_id.trim().is_empty() {
            return Err(StoreError::Other(
                "Firestore project id must not be empty".to_string(),
            ));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn run_query(&self, body: Value) -> Result<Vec<Document>> {
        let url = self.config.run_query_url();
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        decode_run_query_response(payload)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>> {
        let body = structured_query(collection, &[Filter::eq(field, value)], Some(1));
        let docs = self.run_query(body).await?;
        Ok(docs.into_iter().next())
    }

    async fn find_many(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        let body = structured_query(collection, filters, None);
        self.run_query(body).await
    }
}

/// Builds a `runQuery` request body for the given collection and AND-ed filters.
pub fn structured_query(collection: &str, filters: &[Filter], limit: Option<u32>) -> Value {
    let mut query = Map::new();
    query.insert("from".to_string(), json!([{ "collectionId": collection }]));

    let mut field_filters: Vec<Value> = filters.iter().map(field_filter).collect();
    match field_filters.len() {
        0 => {}
        1 => {
            query.insert("where".to_string(), field_filters.remove(0));
        }
        _ => {
            query.insert(
                "where".to_string(),
                json!({ "compositeFilter": { "op": "AND", "filters": field_filters } }),
            );
        }
    }

    if let Some(limit) = limit {
        query.insert("limit".to_string(), json!(limit));
    }

    json!({ "structuredQuery": Value::Object(query) })
}

fn field_filter(filter: &Filter) -> Value {
    let op = match filter.op {
        FilterOp::Equal => "EQUAL",
        FilterOp::NotEqual => "NOT_EQUAL",
    };
    json!({
        "fieldFilter": {
            "field": { "fieldPath": filter.field },
            "op": op,
            "value": encode_value(&filter.value),
        }
    })
}

/// Converts plain JSON into a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Converts a Firestore typed value into plain JSON.
pub fn decode_value(value: &Value) -> Result<Value> {
    let Some(obj) = value.as_object() else {
        return Err(StoreError::Decode(format!(
            "typed value must be an object, got {value}"
        )));
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Err(StoreError::Decode("empty typed value".to_string()));
    };

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::Decode(format!("bad integerValue {inner}")))?
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" | "geoPointValue" => {
            inner.clone()
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => Value::Object(decode_fields(inner.get("fields"))?),
        other => {
            return Err(StoreError::Decode(format!(
                "unsupported Firestore value type '{other}'"
            )))
        }
    };
    Ok(decoded)
}

fn decode_fields(fields: Option<&Value>) -> Result<Map<String, Value>> {
    let Some(fields) = fields.and_then(Value::as_object) else {
        return Ok(Map::new());
    };
    fields
        .iter()
        .map(|(k, v)| decode_value(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Decodes a `runQuery` response stream (a JSON array of result entries).
/// Entries without a `document` (progress markers, read time only) are skipped,
/// and so are documents whose fields fail to decode.
pub fn decode_run_query_response(payload: Value) -> Result<Vec<Document>> {
    let Value::Array(entries) = payload else {
        return Err(StoreError::Decode(
            "runQuery response must be an array".to_string(),
        ));
    };

    let mut docs = Vec::new();
    for entry in entries {
        let Some(doc) = entry.get("document") else {
            continue;
        };
        let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
        let id = name.rsplit('/').next().unwrap_or_default().to_string();
        match decode_fields(doc.get("fields")) {
            Ok(fields) => docs.push(Document::new(id, fields)),
            Err(err) => log::warn!("Skipping undecodable document {name}: {err}"),
        }
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_filter_query_uses_field_filter() {
        let body = structured_query("leads", &[Filter::eq("phoneNumber", "9876543210")], Some(1));
        assert_eq!(
            body,
            json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "leads" }],
                    "where": {
                        "fieldFilter": {
                            "field": { "fieldPath": "phoneNumber" },
                            "op": "EQUAL",
                            "value": { "stringValue": "9876543210" }
                        }
                    },
                    "limit": 1
                }
            })
        );
    }

    #[test]
    fn multiple_filters_compose_with_and() {
        let body = structured_query(
            "Plots",
            &[Filter::eq("leadId", "L1"), Filter::not_eq("status", "Inactive")],
            None,
        );
        let composite = &body["structuredQuery"]["where"]["compositeFilter"];
        assert_eq!(composite["op"], "AND");
        assert_eq!(composite["filters"][1]["fieldFilter"]["op"], "NOT_EQUAL");
        assert!(body["structuredQuery"].get("limit").is_none());
    }

    #[test]
    fn decodes_typed_documents() {
        let payload = json!([
            { "readTime": "2024-01-01T00:00:00Z" },
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/leads/L42",
                    "fields": {
                        "name": { "stringValue": "Asha" },
                        "createdAt": { "integerValue": "1700000000000" },
                        "score": { "doubleValue": 0.5 },
                        "vip": { "booleanValue": true },
                        "tags": { "arrayValue": { "values": [{ "stringValue": "hot" }] } },
                        "meta": { "mapValue": { "fields": { "src": { "stringValue": "web" } } } },
                        "note": { "nullValue": null }
                    }
                }
            }
        ]);

        let docs = decode_run_query_response(payload).unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.id, "L42");
        assert_eq!(doc.str_field("name"), Some("Asha"));
        assert_eq!(doc.i64_field("createdAt"), Some(1_700_000_000_000));
        assert_eq!(doc.get("vip"), Some(&json!(true)));
        assert_eq!(doc.get("tags"), Some(&json!(["hot"])));
        assert_eq!(doc.get("meta"), Some(&json!({ "src": "web" })));
        assert_eq!(doc.get("note"), Some(&Value::Null));
    }

    #[test]
    fn bad_document_does_not_drop_the_rest() {
        let payload = json!([
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/Residential/R1",
                    "fields": { "leadId": { "stringValue": "L1" } }
                }
            },
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/Residential/R2",
                    "fields": { "odd": { "mysteryValue": 1 } }
                }
            }
        ]);

        let docs = decode_run_query_response(payload).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "R1");
        assert_eq!(docs[0].str_field("leadId"), Some("L1"));
    }

    #[test]
    fn empty_array_values_decode_to_empty_lists() {
        let value = decode_value(&json!({ "arrayValue": {} })).unwrap();
        assert_eq!(value, json!([]));
    }

    #[test]
    fn rejects_unknown_value_types() {
        let err = decode_value(&json!({ "mysteryValue": 1 })).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn encode_round_trips_scalars_through_decode() {
        for value in [json!("x"), json!(7), json!(true), Value::Null] {
            assert_eq!(decode_value(&encode_value(&value)).unwrap(), value);
        }
    }

    #[test]
    fn config_rejects_blank_project() {
        assert!(FirestoreStore::new(FirestoreConfig::new("  ")).is_err());
        let url = FirestoreConfig::new("demo").run_query_url();
        assert_eq!(
            url,
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents:runQuery"
        );
    }
}
