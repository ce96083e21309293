//! Firestore document codec
//!
//! Firestore's REST surface wraps every value in a single-key object naming
//! its type (`stringValue`, `integerValue`, `mapValue`, ...). Projects are
//! converted through plain JSON so the model's lenient decoding applies to
//! remote documents exactly as it does to cached ones.

use crate::error::RemoteError;
use grantdesk_model::{Project, ProjectId};
use serde_json::{Map, Number, Value};

/// Integral doubles up to this magnitude are stored as `integerValue`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Encode a project as a document body: `{"fields": {...}}`
pub fn encode_project(project: &Project) -> Result<Value, RemoteError> {
    let value = serde_json::to_value(project).map_err(|e| RemoteError::Malformed(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(RemoteError::Malformed("project did not encode as an object".into()));
    };
    Ok(serde_json::json!({ "fields": encode_fields(map) }))
}

/// Decode a document body into a project
pub fn decode_project(document: &Value) -> Result<Project, RemoteError> {
    let fields = plain_fields(document)?;
    serde_json::from_value(Value::Object(fields)).map_err(|e| RemoteError::Malformed(e.to_string()))
}

/// Decode the document stored under `id`
///
/// The document key stands in for a missing or blank `id` field.
pub fn decode_project_at(document: &Value, id: &ProjectId) -> Result<Project, RemoteError> {
    let mut fields = plain_fields(document)?;
    if !matches!(fields.get("id"), Some(Value::String(s)) if !s.trim().is_empty()) {
        fields.insert("id".to_string(), Value::String(id.as_str().to_string()));
    }
    serde_json::from_value(Value::Object(fields)).map_err(|e| RemoteError::Malformed(e.to_string()))
}

fn plain_fields(document: &Value) -> Result<Map<String, Value>, RemoteError> {
    match document.get("fields") {
        Some(Value::Object(fields)) => decode_fields(fields),
        Some(other) => Err(RemoteError::Malformed(format!("fields is not a map: {other}"))),
        None => Ok(Map::new()),
    }
}

fn encode_fields(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (k, encode_value(v))).collect()
}

/// Wrap a plain JSON value in Firestore's typed representation
#[must_use]
pub fn encode_value(value: Value) -> Value {
    let (kind, inner) = match value {
        Value::Null => ("nullValue", Value::Null),
        Value::Bool(b) => ("booleanValue", Value::Bool(b)),
        Value::Number(n) => encode_number(&n),
        Value::String(s) => ("stringValue", Value::String(s)),
        Value::Array(items) => (
            "arrayValue",
            serde_json::json!({ "values": items.into_iter().map(encode_value).collect::<Vec<_>>() }),
        ),
        Value::Object(map) => ("mapValue", serde_json::json!({ "fields": encode_fields(map) })),
    };
    let mut wrapped = Map::with_capacity(1);
    wrapped.insert(kind.to_string(), inner);
    Value::Object(wrapped)
}

fn encode_number(n: &Number) -> (&'static str, Value) {
    if let Some(i) = n.as_i64() {
        return ("integerValue", Value::String(i.to_string()));
    }
    if let Some(u) = n.as_u64() {
        return ("integerValue", Value::String(u.to_string()));
    }
    let f = n.as_f64().unwrap_or(0.0);
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        #[allow(clippy::cast_possible_truncation)]
        return ("integerValue", Value::String((f as i64).to_string()));
    }
    ("doubleValue", Value::Number(n.clone()))
}

fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, RemoteError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Unwrap a Firestore typed value into plain JSON
pub fn decode_value(value: &Value) -> Result<Value, RemoteError> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(RemoteError::Malformed(format!("untyped value: {value}")));
    };
    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
        "integerValue" => decode_integer(inner)?,
        "doubleValue" => decode_double(inner),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Value::String(inner.as_str().unwrap_or_default().to_string())
        }
        "arrayValue" => {
            let items = inner.get("values").and_then(Value::as_array);
            Value::Array(
                items
                    .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                    .transpose()?
                    .unwrap_or_default(),
            )
        }
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => Value::Object(decode_fields(fields)?),
            None => Value::Object(Map::new()),
        },
        "geoPointValue" => inner.clone(),
        other => return Err(RemoteError::Malformed(format!("unsupported value type {other}"))),
    };
    Ok(decoded)
}

fn decode_integer(inner: &Value) -> Result<Value, RemoteError> {
    let parsed = match inner {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed
        .map(Value::from)
        .ok_or_else(|| RemoteError::Malformed(format!("bad integerValue: {inner}")))
}

fn decode_double(inner: &Value) -> Value {
    let parsed = match inner {
        Value::Number(n) => n.as_f64(),
        // NaN and Infinity arrive as strings
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    parsed.and_then(Number::from_f64).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantdesk_model::{ApplicationStatus, Grant, Scale};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Project {
        let mut project = Project::new("austin-ab12c", "Austin")
            .with_budget(250_000.0)
            .with_grants(vec![Grant::new("grant-0-1700000000000", "Parks Fund")
                .with_range(5_000.0, 100_000.5)
                .with_status(ApplicationStatus::Awarded)
                .with_confirmed_award(80_000.0)]);
        project.priorities = vec!["Health equity".into()];
        project.scale = Scale::MultiSite;
        project.last_updated = 1_700_000_000_123;
        project.is_processed = true;
        project
    }

    #[test]
    fn scalars_use_firestore_type_tags() {
        assert_eq!(encode_value(json!(null)), json!({ "nullValue": null }));
        assert_eq!(encode_value(json!(true)), json!({ "booleanValue": true }));
        assert_eq!(encode_value(json!(250000.0)), json!({ "integerValue": "250000" }));
        assert_eq!(encode_value(json!(0.5)), json!({ "doubleValue": 0.5 }));
        assert_eq!(encode_value(json!("x")), json!({ "stringValue": "x" }));
    }

    #[test]
    fn project_survives_the_codec() {
        let project = sample();
        let document = encode_project(&project).unwrap();

        assert_eq!(document["fields"]["cityName"], json!({ "stringValue": "Austin" }));
        assert_eq!(document["fields"]["phaseBreakdown"], json!({ "nullValue": null }));
        assert_eq!(decode_project(&document).unwrap(), project);
    }

    #[test]
    fn empty_array_and_map_omit_inner_keys() {
        let decoded = decode_value(&json!({ "arrayValue": {} })).unwrap();
        assert_eq!(decoded, json!([]));
        let decoded = decode_value(&json!({ "mapValue": {} })).unwrap();
        assert_eq!(decoded, json!({}));
    }

    #[test]
    fn document_written_by_another_client_decodes() {
        let document = json!({
            "name": "projects/demo/databases/(default)/documents/projects/austin-ab12c",
            "fields": {
                "id": { "stringValue": "austin-ab12c" },
                "cityName": { "stringValue": "Austin" },
                "budgetEstimate": { "integerValue": "400000" },
                "fundingSecured": { "doubleValue": 1250.75 },
                "lastUpdated": { "integerValue": "1700000000999" },
                "potentialGrants": { "arrayValue": { "values": [
                    { "mapValue": { "fields": {
                        "id": { "stringValue": "grant-0-1" },
                        "name": { "stringValue": "LWCF" },
                        "maxVal": { "integerValue": "500000" },
                        "status": { "stringValue": "Submitted" }
                    } } }
                ] } }
            },
            "createTime": "2024-01-01T00:00:00Z",
            "updateTime": "2024-01-01T00:00:00Z"
        });

        let project = decode_project(&document).unwrap();
        assert_eq!(project.budget_estimate, 400_000.0);
        assert_eq!(project.funding_secured, 1250.75);
        assert_eq!(project.last_updated, 1_700_000_000_999);
        assert_eq!(project.potential_grants[0].max_val, 500_000.0);
        assert_eq!(project.potential_grants[0].status, ApplicationStatus::Submitted);
    }

    #[test]
    fn document_key_fills_a_missing_id() {
        let document = json!({ "fields": { "cityName": { "stringValue": "Austin" } } });
        assert!(matches!(decode_project(&document), Err(RemoteError::Malformed(_))));

        let project = decode_project_at(&document, &ProjectId::from("austin-ab12c")).unwrap();
        assert_eq!(project.id.as_str(), "austin-ab12c");
        assert_eq!(project.city_name, "Austin");

        let stored = json!({ "fields": { "id": { "stringValue": "austin-zz999" } } });
        let project = decode_project_at(&stored, &ProjectId::from("austin-ab12c")).unwrap();
        assert_eq!(project.id.as_str(), "austin-zz999");
    }

    #[test]
    fn untyped_values_are_malformed() {
        let document = json!({ "fields": { "cityName": "Austin" } });
        assert!(matches!(decode_project(&document), Err(RemoteError::Malformed(_))));
    }
}
