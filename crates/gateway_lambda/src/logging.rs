use serde_json::json;

/// One structured log line per handled request, in the same shape the deploy
/// apply emits.
pub fn log_request(component: &str, status_code: u16) {
    eprintln!(
        "{}",
        json!({
            "component": component,
            "event": "request_handled",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": { "status_code": status_code },
        })
    );
}
