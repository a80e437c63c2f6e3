use std::collections::BTreeMap;

use gateway_core::fingerprint::{
    content_fingerprint, redeploy_decision, stable_document_json, DeploymentState,
};
use gateway_core::route_table::{build_route_table, declared_paths};
use serde_json::json;

use crate::error::DeployError;
use crate::graph::{permission_node_id, standard_topology};
use crate::resources::{
    DeploymentOutput, ExecutionRoleSpec, FunctionOutput, FunctionSpec, InvokePermissionSpec,
    ResourceKind, RestApiOutput, RestApiSpec, RoleOutput, StageOutput, StageSpec,
    LAMBDA_ASSUME_ROLE_POLICY,
};

/// Materializes one resource at a time. Implementations are thin adapters
/// over the platform SDK; tests substitute recording fakes.
pub trait ResourceProvisioner {
    fn provision_role(&self, spec: &ExecutionRoleSpec) -> Result<RoleOutput, String>;

    fn provision_function(
        &self,
        spec: &FunctionSpec,
        role: &RoleOutput,
    ) -> Result<FunctionOutput, String>;

    fn provision_rest_api(
        &self,
        spec: &RestApiSpec,
        body_json: &str,
    ) -> Result<RestApiOutput, String>;

    fn grant_invoke(
        &self,
        spec: &InvokePermissionSpec,
        function: &FunctionOutput,
        source_arn: &str,
    ) -> Result<(), String>;

    /// Digest recorded by the previous apply, if any stage exists yet.
    fn last_applied_fingerprint(
        &self,
        rest_api: &RestApiOutput,
        stage_name: &str,
    ) -> Result<Option<String>, String>;

    fn provision_deployment(&self, rest_api: &RestApiOutput) -> Result<DeploymentOutput, String>;

    fn bind_stage(
        &self,
        spec: &StageSpec,
        rest_api: &RestApiOutput,
        deployment: &DeploymentOutput,
        fingerprint: &str,
    ) -> Result<StageOutput, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub api_name: String,
    pub stage_name: String,
    pub role: ExecutionRoleSpec,
    pub function: FunctionSpec,
    pub invoke_grants: Vec<InvokePermissionSpec>,
}

impl DeployConfig {
    /// Standard configuration: one grant per declared route and an execution
    /// role named after the function.
    pub fn new(
        api_name: impl Into<String>,
        stage_name: impl Into<String>,
        function: FunctionSpec,
    ) -> Self {
        let role = ExecutionRoleSpec {
            name: format!("{}-execution-role", function.name),
            assume_role_policy: LAMBDA_ASSUME_ROLE_POLICY.to_string(),
        };
        let invoke_grants = declared_paths()
            .iter()
            .map(|path| InvokePermissionSpec {
                statement_id: permission_node_id(path),
                route_path: (*path).to_string(),
            })
            .collect();

        Self {
            api_name: api_name.into(),
            stage_name: stage_name.into(),
            role,
            function,
            invoke_grants,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub fingerprint: String,
    pub state: DeploymentState,
    pub resources_applied: Vec<String>,
    pub invoke_url: Option<String>,
}

/// Applies the deployment as a unit: validates grants, resolves the
/// topological order, materializes each resource, and gates the deployment
/// and stage on the fingerprint decision.
pub fn apply(
    config: &DeployConfig,
    provisioner: &dyn ResourceProvisioner,
) -> Result<ApplyReport, DeployError> {
    let route_paths = declared_paths();
    crate::graph::validate_invoke_permissions(&route_paths, &config.invoke_grants)?;

    let graph = standard_topology(&config.invoke_grants);
    let order = graph.topological_order()?;

    let grants_by_node: BTreeMap<String, &InvokePermissionSpec> = config
        .invoke_grants
        .iter()
        .map(|grant| (permission_node_id(&grant.route_path), grant))
        .collect();

    let mut role: Option<RoleOutput> = None;
    let mut function: Option<FunctionOutput> = None;
    let mut rest_api: Option<RestApiOutput> = None;
    let mut fingerprint: Option<String> = None;
    let mut state: Option<DeploymentState> = None;
    let mut deployment: Option<DeploymentOutput> = None;
    let mut invoke_url: Option<String> = None;
    let mut resources_applied = Vec::with_capacity(order.len());

    for node in order {
        match node.kind {
            ResourceKind::ExecutionRole => {
                let output = provisioner
                    .provision_role(&config.role)
                    .map_err(|message| provision_error(&node.id, message))?;
                log_apply_info(
                    "resource_applied",
                    json!({"resource": node.id.clone(), "arn": output.arn.clone()}),
                );
                role = Some(output);
                resources_applied.push(node.id.clone());
            }
            ResourceKind::Function => {
                let role = require(&role, &node.id, crate::graph::EXECUTION_ROLE_ID)?;
                let output = provisioner
                    .provision_function(&config.function, role)
                    .map_err(|message| provision_error(&node.id, message))?;
                log_apply_info(
                    "resource_applied",
                    json!({"resource": node.id.clone(), "arn": output.arn.clone()}),
                );
                function = Some(output);
                resources_applied.push(node.id.clone());
            }
            ResourceKind::RestApi => {
                let function = require(&function, &node.id, crate::graph::FUNCTION_ID)?;
                let body = stable_document_json(build_route_table(&function.invoke_arn));
                let digest = content_fingerprint(&body);
                let spec = RestApiSpec {
                    name: config.api_name.clone(),
                };
                let output = provisioner
                    .provision_rest_api(&spec, &body)
                    .map_err(|message| provision_error(&node.id, message))?;
                log_apply_info(
                    "resource_applied",
                    json!({
                        "resource": node.id.clone(),
                        "rest_api_id": output.id.clone(),
                        "fingerprint": digest.clone(),
                    }),
                );
                rest_api = Some(output);
                fingerprint = Some(digest);
                resources_applied.push(node.id.clone());
            }
            ResourceKind::InvokePermission => {
                let grant = grants_by_node.get(&node.id).copied().ok_or_else(|| {
                    DeployError::OutputNotResolved {
                        resource: node.id.clone(),
                        dependency: "invoke grant".to_string(),
                    }
                })?;
                let function = require(&function, &node.id, crate::graph::FUNCTION_ID)?;
                let rest_api = require(&rest_api, &node.id, crate::graph::REST_API_ID)?;
                let source_arn = grant.source_arn(&rest_api.execution_arn);
                provisioner
                    .grant_invoke(grant, function, &source_arn)
                    .map_err(|message| provision_error(&node.id, message))?;
                log_apply_info(
                    "resource_applied",
                    json!({"resource": node.id.clone(), "source_arn": source_arn.clone()}),
                );
                resources_applied.push(node.id.clone());
            }
            ResourceKind::Deployment => {
                let rest_api = require(&rest_api, &node.id, crate::graph::REST_API_ID)?;
                let digest = require(&fingerprint, &node.id, crate::graph::REST_API_ID)?;
                let last_applied = provisioner
                    .last_applied_fingerprint(rest_api, &config.stage_name)
                    .map_err(|message| provision_error(&node.id, message))?;
                let decision = redeploy_decision(last_applied.as_deref(), digest);
                match decision {
                    DeploymentState::Unchanged => {
                        log_apply_info(
                            "deployment_unchanged",
                            json!({"resource": node.id.clone(), "fingerprint": digest.clone()}),
                        );
                    }
                    _ => {
                        log_apply_info(
                            "redeployment_triggered",
                            json!({
                                "resource": node.id.clone(),
                                "fingerprint": digest.clone(),
                                "last_applied": last_applied.clone(),
                            }),
                        );
                        let output = provisioner
                            .provision_deployment(rest_api)
                            .map_err(|message| provision_error(&node.id, message))?;
                        deployment = Some(output);
                        resources_applied.push(node.id.clone());
                    }
                }
                state = Some(decision);
            }
            ResourceKind::Stage => {
                let decision = state.ok_or_else(|| DeployError::OutputNotResolved {
                    resource: node.id.clone(),
                    dependency: crate::graph::DEPLOYMENT_ID.to_string(),
                })?;
                if decision == DeploymentState::Unchanged {
                    log_apply_info("stage_unchanged", json!({"resource": node.id.clone()}));
                    continue;
                }

                let rest_api = require(&rest_api, &node.id, crate::graph::REST_API_ID)?;
                let deployment = require(&deployment, &node.id, crate::graph::DEPLOYMENT_ID)?;
                let digest = require(&fingerprint, &node.id, crate::graph::REST_API_ID)?;
                let spec = StageSpec {
                    stage_name: config.stage_name.clone(),
                };
                let output = provisioner
                    .bind_stage(&spec, rest_api, deployment, digest)
                    .map_err(|message| provision_error(&node.id, message))?;
                log_apply_info(
                    "stage_bound",
                    json!({"resource": node.id.clone(), "invoke_url": output.invoke_url.clone()}),
                );
                invoke_url = Some(output.invoke_url);
                state = Some(DeploymentState::Deployed);
                resources_applied.push(node.id.clone());
            }
        }
    }

    let fingerprint = fingerprint.ok_or_else(|| DeployError::OutputNotResolved {
        resource: crate::graph::DEPLOYMENT_ID.to_string(),
        dependency: crate::graph::REST_API_ID.to_string(),
    })?;
    let state = state.ok_or_else(|| DeployError::OutputNotResolved {
        resource: crate::graph::STAGE_ID.to_string(),
        dependency: crate::graph::DEPLOYMENT_ID.to_string(),
    })?;

    Ok(ApplyReport {
        fingerprint,
        state,
        resources_applied,
        invoke_url,
    })
}

fn require<'a, T>(
    output: &'a Option<T>,
    resource: &str,
    dependency: &str,
) -> Result<&'a T, DeployError> {
    output.as_ref().ok_or_else(|| DeployError::OutputNotResolved {
        resource: resource.to_string(),
        dependency: dependency.to_string(),
    })
}

fn provision_error(resource: &str, message: String) -> DeployError {
    DeployError::Provision {
        resource: resource.to_string(),
        message,
    }
}

fn log_apply_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "deploy_apply",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use gateway_core::route_table::{ACK_PATH, ECHO_PATH};

    use super::*;

    #[test]
    fn standard_config_grants_every_declared_route() {
        let config = DeployConfig::new(
            "example",
            "example",
            FunctionSpec::provided_runtime("gateway-handler", "dist/path_echo.zip"),
        );

        let granted: Vec<&str> = config
            .invoke_grants
            .iter()
            .map(|grant| grant.route_path.as_str())
            .collect();
        assert_eq!(granted, vec![ACK_PATH, ECHO_PATH]);
        assert_eq!(config.role.name, "gateway-handler-execution-role");
    }
}
