use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const PATH_PARAMETERS_KEY: &str = "pathParameters";

/// HTTP-shaped envelope handed back to the gateway for every invocation.
/// The body is always valid JSON text, even for logically-empty results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn json_response(status_code: u16, payload: impl Serialize) -> ResponseEnvelope {
    ResponseEnvelope {
        status_code,
        headers: BTreeMap::from([(
            "Content-Type".to_string(),
            CONTENT_TYPE_JSON.to_string(),
        )]),
        body: serde_json::to_string(&payload).expect("response payload should serialize"),
    }
}

/// Looks up a named path parameter in a raw invocation event.
///
/// Any missing or malformed level (no event object, no `pathParameters`
/// mapping, absent key, non-string value) resolves to `None` rather than
/// failing the invocation.
pub fn path_parameter<'a>(event: &'a Value, name: &str) -> Option<&'a str> {
    event.get(PATH_PARAMETERS_KEY)?.get(name)?.as_str()
}
