use gateway_core::contract::ResponseEnvelope;
use gateway_lambda::handlers::path_echo::handle_path_echo_event;
use gateway_lambda::logging::log_request;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ResponseEnvelope, Error> {
    let response = handle_path_echo_event(&event.payload);
    log_request("path_echo_handler", response.status_code);
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
