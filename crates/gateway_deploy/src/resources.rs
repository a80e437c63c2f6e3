use serde::{Deserialize, Serialize};

/// Assume-role policy allowing the Lambda service to assume the execution
/// role.
pub const LAMBDA_ASSUME_ROLE_POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Action": "sts:AssumeRole",
      "Principal": {
        "Service": "lambda.amazonaws.com"
      },
      "Effect": "Allow",
      "Sid": ""
    }
  ]
}"#;

pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";
pub const GATEWAY_PRINCIPAL: &str = "apigateway.amazonaws.com";

/// Stage variable recording the applied route table digest, read back on the
/// next apply to decide whether a redeployment is needed.
pub const FINGERPRINT_STAGE_VARIABLE: &str = "routeTableFingerprint";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ExecutionRole,
    Function,
    RestApi,
    InvokePermission,
    Deployment,
    Stage,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecutionRole => "execution_role",
            Self::Function => "function",
            Self::RestApi => "rest_api",
            Self::InvokePermission => "invoke_permission",
            Self::Deployment => "deployment",
            Self::Stage => "stage",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionRoleSpec {
    pub name: String,
    pub assume_role_policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: String,
    pub archive_path: String,
    pub handler: String,
    pub runtime: String,
}

impl FunctionSpec {
    /// A function backed by a packaged Rust binary: the archive carries a
    /// `bootstrap` entry and runs on the provided runtime.
    pub fn provided_runtime(name: impl Into<String>, archive_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            archive_path: archive_path.into(),
            handler: "bootstrap".to_string(),
            runtime: "provided.al2023".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestApiSpec {
    pub name: String,
}

/// Grant authorizing the gateway to invoke the function for one route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvokePermissionSpec {
    pub statement_id: String,
    pub route_path: String,
}

impl InvokePermissionSpec {
    /// Execution-scoped source for the grant: any stage, inbound GET, this
    /// route template.
    pub fn source_arn(&self, execution_arn: &str) -> String {
        format!("{execution_arn}/*/GET{}", self.route_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageSpec {
    pub stage_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleOutput {
    pub arn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionOutput {
    pub arn: String,
    pub invoke_arn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestApiOutput {
    pub id: String,
    pub execution_arn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentOutput {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageOutput {
    pub invoke_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_arn_scopes_grant_to_route() {
        let grant = InvokePermissionSpec {
            statement_id: "invoke-permission-path1".to_string(),
            route_path: "/path1".to_string(),
        };

        assert_eq!(
            grant.source_arn("arn:aws:execute-api:eu-central-1:123456789012:abc123"),
            "arn:aws:execute-api:eu-central-1:123456789012:abc123/*/GET/path1"
        );
    }

    #[test]
    fn provided_runtime_function_uses_bootstrap_handler() {
        let function = FunctionSpec::provided_runtime("gateway-handler", "dist/path_echo.zip");

        assert_eq!(function.handler, "bootstrap");
        assert_eq!(function.runtime, "provided.al2023");
    }

    #[test]
    fn assume_role_policy_targets_lambda_service() {
        let policy: serde_json::Value =
            serde_json::from_str(LAMBDA_ASSUME_ROLE_POLICY).expect("policy should parse");

        assert_eq!(policy["Version"], "2012-10-17");
        assert_eq!(
            policy["Statement"][0]["Principal"]["Service"],
            "lambda.amazonaws.com"
        );
        assert_eq!(policy["Statement"][0]["Action"], "sts:AssumeRole");
    }
}
