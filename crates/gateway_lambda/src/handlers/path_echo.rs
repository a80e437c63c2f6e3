use gateway_core::contract::{json_response, path_parameter, ResponseEnvelope};
use gateway_core::route_table::PATH_VARIABLE_NAME;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct PathEchoBody {
    ok: bool,
    variable1: Option<String>,
}

/// Echoes the `variable1` path segment back to the caller.
///
/// The field is always present in the body: a missing event level or key
/// serializes as JSON `null` rather than failing the invocation.
pub fn handle_path_echo_event(event: &Value) -> ResponseEnvelope {
    let variable1 = path_parameter(event, PATH_VARIABLE_NAME).map(str::to_string);
    json_response(200, PathEchoBody { ok: true, variable1 })
}

#[cfg(test)]
mod tests {
    use gateway_core::contract::CONTENT_TYPE_JSON;
    use serde_json::json;

    use super::*;

    #[test]
    fn echoes_present_path_parameter() {
        let event = json!({"pathParameters": {"variable1": "foo"}});
        let response = handle_path_echo_event(&event);

        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.headers.get("Content-Type").map(String::as_str),
            Some(CONTENT_TYPE_JSON)
        );

        let body: Value = serde_json::from_str(&response.body).expect("body should parse");
        assert_eq!(body, json!({"ok": true, "variable1": "foo"}));
    }

    #[test]
    fn absent_parameter_mapping_serializes_as_null() {
        let response = handle_path_echo_event(&json!({}));
        let body: Value = serde_json::from_str(&response.body).expect("body should parse");

        assert_eq!(body, json!({"ok": true, "variable1": null}));
        assert_eq!(body.get("variable1"), Some(&Value::Null));
    }

    #[test]
    fn tolerates_malformed_events() {
        for event in [json!(null), json!("text"), json!({"pathParameters": "oops"})] {
            let response = handle_path_echo_event(&event);
            let body: Value = serde_json::from_str(&response.body).expect("body should parse");
            assert_eq!(body, json!({"ok": true, "variable1": null}));
        }
    }
}
