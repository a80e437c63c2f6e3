use aws_sdk_apigateway::types::{Op, PatchOperation, PutMode};
use aws_sdk_lambda::types::{FunctionCode, Runtime};
use gateway_core::route_table::API_TITLE;
use gateway_deploy::apply::{apply, DeployConfig, ResourceProvisioner};
use gateway_deploy::resources::{
    DeploymentOutput, ExecutionRoleSpec, FunctionOutput, FunctionSpec, InvokePermissionSpec,
    RestApiOutput, RestApiSpec, RoleOutput, StageOutput, StageSpec, FINGERPRINT_STAGE_VARIABLE,
    GATEWAY_PRINCIPAL, INVOKE_ACTION,
};
use serde_json::json;

struct AwsResourceProvisioner {
    iam_client: aws_sdk_iam::Client,
    lambda_client: aws_sdk_lambda::Client,
    apigateway_client: aws_sdk_apigateway::Client,
    region: String,
    account_id: String,
}

fn block_on<F, T>(future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

impl ResourceProvisioner for AwsResourceProvisioner {
    fn provision_role(&self, spec: &ExecutionRoleSpec) -> Result<RoleOutput, String> {
        let client = self.iam_client.clone();
        let role_name = spec.name.clone();
        let policy = spec.assume_role_policy.clone();

        block_on(async move {
            let created = client
                .create_role()
                .role_name(&role_name)
                .assume_role_policy_document(&policy)
                .send()
                .await;

            let role = match created {
                Ok(output) => output.role,
                // Role already exists from a previous apply.
                Err(_) => {
                    client
                        .get_role()
                        .role_name(&role_name)
                        .send()
                        .await
                        .map_err(|error| format!("failed to resolve execution role: {error}"))?
                        .role
                }
            };

            role.map(|role| RoleOutput {
                arn: role.arn().to_string(),
            })
            .ok_or_else(|| "iam returned no role".to_string())
        })
    }

    fn provision_function(
        &self,
        spec: &FunctionSpec,
        role: &RoleOutput,
    ) -> Result<FunctionOutput, String> {
        let archive = std::fs::read(&spec.archive_path)
            .map_err(|error| format!("failed to read archive '{}': {error}", spec.archive_path))?;
        let client = self.lambda_client.clone();
        let region = self.region.clone();
        let spec = spec.clone();
        let role_arn = role.arn.clone();

        block_on(async move {
            let created = client
                .create_function()
                .function_name(&spec.name)
                .role(&role_arn)
                .handler(&spec.handler)
                .runtime(Runtime::from(spec.runtime.as_str()))
                .code(
                    FunctionCode::builder()
                        .zip_file(aws_sdk_lambda::primitives::Blob::new(archive.clone()))
                        .build(),
                )
                .send()
                .await;

            let function_arn = match created {
                Ok(output) => output.function_arn,
                // Function already exists; push the new archive instead.
                Err(_) => {
                    client
                        .update_function_code()
                        .function_name(&spec.name)
                        .zip_file(aws_sdk_lambda::primitives::Blob::new(archive))
                        .send()
                        .await
                        .map_err(|error| format!("failed to update function code: {error}"))?
                        .function_arn
                }
            };

            let arn = function_arn.ok_or_else(|| "lambda returned no function arn".to_string())?;
            let invoke_arn = format!(
                "arn:aws:apigateway:{region}:lambda:path/2015-03-31/functions/{arn}/invocations"
            );
            Ok(FunctionOutput { arn, invoke_arn })
        })
    }

    fn provision_rest_api(
        &self,
        spec: &RestApiSpec,
        body_json: &str,
    ) -> Result<RestApiOutput, String> {
        let client = self.apigateway_client.clone();
        let api_name = spec.name.clone();
        let body = body_json.as_bytes().to_vec();
        let region = self.region.clone();
        let account_id = self.account_id.clone();

        block_on(async move {
            let existing = client
                .get_rest_apis()
                .send()
                .await
                .map_err(|error| format!("failed to list rest apis: {error}"))?
                .items
                .unwrap_or_default()
                .into_iter()
                .find(|api| api.name() == Some(api_name.as_str()))
                .and_then(|api| api.id);

            let rest_api_id = match existing {
                Some(id) => id,
                None => client
                    .create_rest_api()
                    .name(&api_name)
                    .send()
                    .await
                    .map_err(|error| format!("failed to create rest api: {error}"))?
                    .id
                    .ok_or_else(|| "apigateway returned no rest api id".to_string())?,
            };

            client
                .put_rest_api()
                .rest_api_id(&rest_api_id)
                .mode(PutMode::Overwrite)
                .body(aws_sdk_apigateway::primitives::Blob::new(body))
                .send()
                .await
                .map_err(|error| format!("failed to put rest api body: {error}"))?;

            let execution_arn =
                format!("arn:aws:execute-api:{region}:{account_id}:{rest_api_id}");
            Ok(RestApiOutput {
                id: rest_api_id,
                execution_arn,
            })
        })
    }

    fn grant_invoke(
        &self,
        spec: &InvokePermissionSpec,
        function: &FunctionOutput,
        source_arn: &str,
    ) -> Result<(), String> {
        let client = self.lambda_client.clone();
        let statement_id = spec.statement_id.clone();
        let function_name = function.arn.clone();
        let source_arn = source_arn.to_string();

        block_on(async move {
            // Grants are idempotent per statement id; drop a stale one first.
            let _ = client
                .remove_permission()
                .function_name(&function_name)
                .statement_id(&statement_id)
                .send()
                .await;

            client
                .add_permission()
                .function_name(&function_name)
                .statement_id(&statement_id)
                .action(INVOKE_ACTION)
                .principal(GATEWAY_PRINCIPAL)
                .source_arn(&source_arn)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to add invoke permission: {error}"))
        })
    }

    fn last_applied_fingerprint(
        &self,
        rest_api: &RestApiOutput,
        stage_name: &str,
    ) -> Result<Option<String>, String> {
        let client = self.apigateway_client.clone();
        let rest_api_id = rest_api.id.clone();
        let stage_name = stage_name.to_string();

        block_on(async move {
            let stage = match client
                .get_stage()
                .rest_api_id(&rest_api_id)
                .stage_name(&stage_name)
                .send()
                .await
            {
                Ok(output) => output,
                // No stage yet: first deployment.
                Err(_) => return Ok(None),
            };

            Ok(stage
                .variables
                .and_then(|variables| variables.get(FINGERPRINT_STAGE_VARIABLE).cloned()))
        })
    }

    fn provision_deployment(&self, rest_api: &RestApiOutput) -> Result<DeploymentOutput, String> {
        let client = self.apigateway_client.clone();
        let rest_api_id = rest_api.id.clone();

        block_on(async move {
            client
                .create_deployment()
                .rest_api_id(&rest_api_id)
                .send()
                .await
                .map_err(|error| format!("failed to create deployment: {error}"))?
                .id
                .map(|id| DeploymentOutput { id })
                .ok_or_else(|| "apigateway returned no deployment id".to_string())
        })
    }

    fn bind_stage(
        &self,
        spec: &StageSpec,
        rest_api: &RestApiOutput,
        deployment: &DeploymentOutput,
        fingerprint: &str,
    ) -> Result<StageOutput, String> {
        let client = self.apigateway_client.clone();
        let rest_api_id = rest_api.id.clone();
        let stage_name = spec.stage_name.clone();
        let deployment_id = deployment.id.clone();
        let fingerprint = fingerprint.to_string();
        let region = self.region.clone();

        block_on(async move {
            let created = client
                .create_stage()
                .rest_api_id(&rest_api_id)
                .stage_name(&stage_name)
                .deployment_id(&deployment_id)
                .variables(FINGERPRINT_STAGE_VARIABLE, &fingerprint)
                .send()
                .await;

            if created.is_err() {
                // Stage exists; repoint it at the new deployment.
                client
                    .update_stage()
                    .rest_api_id(&rest_api_id)
                    .stage_name(&stage_name)
                    .patch_operations(
                        PatchOperation::builder()
                            .op(Op::Replace)
                            .path("/deploymentId")
                            .value(&deployment_id)
                            .build(),
                    )
                    .patch_operations(
                        PatchOperation::builder()
                            .op(Op::Replace)
                            .path(format!("/variables/{FINGERPRINT_STAGE_VARIABLE}"))
                            .value(&fingerprint)
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|error| format!("failed to update stage: {error}"))?;
            }

            Ok(StageOutput {
                invoke_url: format!(
                    "https://{rest_api_id}.execute-api.{region}.amazonaws.com/{stage_name}"
                ),
            })
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let archive_path = std::env::var("GATEWAY_FUNCTION_ARCHIVE")
        .map_err(|_| "GATEWAY_FUNCTION_ARCHIVE must be configured")?;
    let api_name =
        std::env::var("GATEWAY_API_NAME").unwrap_or_else(|_| API_TITLE.to_string());
    let stage_name =
        std::env::var("GATEWAY_STAGE_NAME").unwrap_or_else(|_| "example".to_string());
    let function_name =
        std::env::var("GATEWAY_FUNCTION_NAME").unwrap_or_else(|_| "gateway-handler".to_string());

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let region = aws_config
        .region()
        .map(ToString::to_string)
        .ok_or("an AWS region must be configured")?;
    let account_id = aws_sdk_sts::Client::new(&aws_config)
        .get_caller_identity()
        .send()
        .await
        .map_err(|error| format!("failed to resolve caller identity: {error}"))?
        .account
        .ok_or("sts returned no account id")?;

    let provisioner = AwsResourceProvisioner {
        iam_client: aws_sdk_iam::Client::new(&aws_config),
        lambda_client: aws_sdk_lambda::Client::new(&aws_config),
        apigateway_client: aws_sdk_apigateway::Client::new(&aws_config),
        region,
        account_id,
    };

    let config = DeployConfig::new(
        api_name,
        stage_name,
        FunctionSpec::provided_runtime(function_name, archive_path),
    );
    let report = apply(&config, &provisioner)?;

    eprintln!(
        "{}",
        json!({
            "component": "deploy_runtime",
            "event": "apply_finished",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": {
                "fingerprint": report.fingerprint,
                "state": report.state,
                "resources_applied": report.resources_applied,
                "invoke_url": report.invoke_url,
            },
        })
    );
    Ok(())
}
