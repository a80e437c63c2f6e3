use std::sync::Mutex;

use gateway_core::fingerprint::{content_fingerprint, stable_document_json, DeploymentState};
use gateway_core::route_table::{build_route_table, ACK_PATH, ECHO_PATH};
use gateway_deploy::apply::{apply, DeployConfig, ResourceProvisioner};
use gateway_deploy::error::DeployError;
use gateway_deploy::resources::{
    DeploymentOutput, ExecutionRoleSpec, FunctionOutput, FunctionSpec, InvokePermissionSpec,
    RestApiOutput, RestApiSpec, RoleOutput, StageOutput, StageSpec,
};

const INVOKE_ARN: &str = "arn:aws:apigateway:eu-central-1:lambda:path/2015-03-31/functions/\
                          arn:aws:lambda:eu-central-1:123456789012:function:gateway-handler/invocations";
const EXECUTION_ARN: &str = "arn:aws:execute-api:eu-central-1:123456789012:abc123";

struct RecordingProvisioner {
    calls: Mutex<Vec<String>>,
    rest_api_bodies: Mutex<Vec<String>>,
    grant_source_arns: Mutex<Vec<String>>,
    last_applied: Option<String>,
    fail_function: bool,
}

impl RecordingProvisioner {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rest_api_bodies: Mutex::new(Vec::new()),
            grant_source_arns: Mutex::new(Vec::new()),
            last_applied: None,
            fail_function: false,
        }
    }

    fn with_last_applied(digest: String) -> Self {
        Self {
            last_applied: Some(digest),
            ..Self::new()
        }
    }

    fn record(&self, call: &str) {
        self.calls
            .lock()
            .expect("poisoned mutex")
            .push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("poisoned mutex").clone()
    }
}

impl ResourceProvisioner for RecordingProvisioner {
    fn provision_role(&self, _spec: &ExecutionRoleSpec) -> Result<RoleOutput, String> {
        self.record("provision_role");
        Ok(RoleOutput {
            arn: "arn:aws:iam::123456789012:role/gateway-handler-execution-role".to_string(),
        })
    }

    fn provision_function(
        &self,
        _spec: &FunctionSpec,
        _role: &RoleOutput,
    ) -> Result<FunctionOutput, String> {
        if self.fail_function {
            return Err("archive not found".to_string());
        }
        self.record("provision_function");
        Ok(FunctionOutput {
            arn: "arn:aws:lambda:eu-central-1:123456789012:function:gateway-handler".to_string(),
            invoke_arn: INVOKE_ARN.to_string(),
        })
    }

    fn provision_rest_api(
        &self,
        _spec: &RestApiSpec,
        body_json: &str,
    ) -> Result<RestApiOutput, String> {
        self.record("provision_rest_api");
        self.rest_api_bodies
            .lock()
            .expect("poisoned mutex")
            .push(body_json.to_string());
        Ok(RestApiOutput {
            id: "abc123".to_string(),
            execution_arn: EXECUTION_ARN.to_string(),
        })
    }

    fn grant_invoke(
        &self,
        _spec: &InvokePermissionSpec,
        _function: &FunctionOutput,
        source_arn: &str,
    ) -> Result<(), String> {
        self.record("grant_invoke");
        self.grant_source_arns
            .lock()
            .expect("poisoned mutex")
            .push(source_arn.to_string());
        Ok(())
    }

    fn last_applied_fingerprint(
        &self,
        _rest_api: &RestApiOutput,
        _stage_name: &str,
    ) -> Result<Option<String>, String> {
        self.record("last_applied_fingerprint");
        Ok(self.last_applied.clone())
    }

    fn provision_deployment(&self, _rest_api: &RestApiOutput) -> Result<DeploymentOutput, String> {
        self.record("provision_deployment");
        Ok(DeploymentOutput {
            id: "dep-1".to_string(),
        })
    }

    fn bind_stage(
        &self,
        spec: &StageSpec,
        rest_api: &RestApiOutput,
        _deployment: &DeploymentOutput,
        _fingerprint: &str,
    ) -> Result<StageOutput, String> {
        self.record("bind_stage");
        Ok(StageOutput {
            invoke_url: format!(
                "https://{}.execute-api.eu-central-1.amazonaws.com/{}",
                rest_api.id, spec.stage_name
            ),
        })
    }
}

fn example_config() -> DeployConfig {
    DeployConfig::new(
        "example",
        "example",
        FunctionSpec::provided_runtime("gateway-handler", "dist/path_echo.zip"),
    )
}

fn expected_fingerprint() -> String {
    content_fingerprint(&stable_document_json(build_route_table(INVOKE_ARN)))
}

#[test]
fn first_apply_materializes_everything_in_dependency_order() {
    let provisioner = RecordingProvisioner::new();
    let report = apply(&example_config(), &provisioner).expect("apply should pass");

    assert_eq!(
        provisioner.calls(),
        vec![
            "provision_role",
            "provision_function",
            "provision_rest_api",
            "grant_invoke",
            "grant_invoke",
            "last_applied_fingerprint",
            "provision_deployment",
            "bind_stage",
        ]
    );
    assert_eq!(report.state, DeploymentState::Deployed);
    assert_eq!(report.fingerprint, expected_fingerprint());
    assert_eq!(
        report.resources_applied,
        vec![
            "execution-role",
            "handler-function",
            "rest-api",
            "invoke-permission-path1",
            "invoke-permission-test-variable1",
            "deployment",
            "stage",
        ]
    );
    assert_eq!(
        report.invoke_url.as_deref(),
        Some("https://abc123.execute-api.eu-central-1.amazonaws.com/example")
    );
}

#[test]
fn matching_fingerprint_skips_redeployment() {
    let provisioner = RecordingProvisioner::with_last_applied(expected_fingerprint());
    let report = apply(&example_config(), &provisioner).expect("apply should pass");

    assert_eq!(report.state, DeploymentState::Unchanged);
    assert!(report.invoke_url.is_none());

    let calls = provisioner.calls();
    assert!(!calls.iter().any(|call| call == "provision_deployment"));
    assert!(!calls.iter().any(|call| call == "bind_stage"));
}

#[test]
fn changed_fingerprint_forces_redeployment() {
    let provisioner =
        RecordingProvisioner::with_last_applied("0000000000000000000000000000000000000000".into());
    let report = apply(&example_config(), &provisioner).expect("apply should pass");

    assert_eq!(report.state, DeploymentState::Deployed);
    let calls = provisioner.calls();
    assert!(calls.iter().any(|call| call == "provision_deployment"));
    assert!(calls.iter().any(|call| call == "bind_stage"));
}

#[test]
fn rest_api_body_declares_both_routes() {
    let provisioner = RecordingProvisioner::new();
    apply(&example_config(), &provisioner).expect("apply should pass");

    let bodies = provisioner.rest_api_bodies.lock().expect("poisoned mutex");
    assert_eq!(bodies.len(), 1);

    let document: serde_json::Value =
        serde_json::from_str(&bodies[0]).expect("body should be valid JSON");
    let paths = document["paths"].as_object().expect("paths object");
    assert!(paths.contains_key(ACK_PATH));
    assert!(paths.contains_key(ECHO_PATH));
    assert_eq!(
        paths[ACK_PATH]["get"]["x-amazon-apigateway-integration"]["uri"],
        INVOKE_ARN
    );
}

#[test]
fn grant_sources_cover_both_routes() {
    let provisioner = RecordingProvisioner::new();
    apply(&example_config(), &provisioner).expect("apply should pass");

    let source_arns = provisioner.grant_source_arns.lock().expect("poisoned mutex");
    assert_eq!(
        *source_arns,
        vec![
            format!("{EXECUTION_ARN}/*/GET/path1"),
            format!("{EXECUTION_ARN}/*/GET/test/{{variable1}}"),
        ]
    );
}

#[test]
fn missing_grant_fails_before_any_provisioning() {
    let mut config = example_config();
    config.invoke_grants.retain(|grant| grant.route_path == ACK_PATH);

    let provisioner = RecordingProvisioner::new();
    let error = apply(&config, &provisioner).expect_err("apply should fail");

    assert_eq!(
        error,
        DeployError::MissingInvokePermission {
            route_path: ECHO_PATH.to_string(),
        }
    );
    assert!(provisioner.calls().is_empty());
}

#[test]
fn provisioner_failure_names_the_resource() {
    let provisioner = RecordingProvisioner {
        fail_function: true,
        ..RecordingProvisioner::new()
    };
    let error = apply(&example_config(), &provisioner).expect_err("apply should fail");

    assert_eq!(
        error,
        DeployError::Provision {
            resource: "handler-function".to_string(),
            message: "archive not found".to_string(),
        }
    );
}
