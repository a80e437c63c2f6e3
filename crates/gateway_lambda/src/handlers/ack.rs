use gateway_core::contract::{json_response, ResponseEnvelope};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct AckBody {
    ok: bool,
}

/// Unconditional acknowledgement for the fixed route. The event is accepted
/// for signature parity with the path-echo handler and never inspected; the
/// body carries no fields beyond `ok`.
pub fn handle_ack_event(_event: &Value) -> ResponseEnvelope {
    json_response(200, AckBody { ok: true })
}
