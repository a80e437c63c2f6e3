use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const OPENAPI_VERSION: &str = "3.0.1";
pub const API_TITLE: &str = "example";
pub const API_VERSION: &str = "1.0";

/// Fixed, parameter-less route served by the acknowledgement handler.
pub const ACK_PATH: &str = "/path1";
/// Templated route served by the path-echo handler.
pub const ECHO_PATH: &str = "/test/{variable1}";
pub const PATH_VARIABLE_NAME: &str = "variable1";

/// Route paths this deployment declares. Every entry must be matched by an
/// invocation-permission grant before anything is materialized.
pub fn declared_paths() -> [&'static str; 2] {
    [ACK_PATH, ECHO_PATH]
}

/// OpenAPI document mapping URL path templates to gateway integrations.
///
/// Paths are held in a `BTreeMap` so the serialized form is canonical; the
/// redeployment fingerprint is computed over exactly that form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteTable {
    pub openapi: String,
    pub info: ApiInfo,
    pub paths: BTreeMap<String, PathEntry>,
}

impl RouteTable {
    pub fn route_paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<PathParameterSpec>,
    pub get: MethodEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathParameterSpec {
    #[serde(rename = "in")]
    pub location: String,
    pub name: String,
    pub schema: ParameterSchema,
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodEntry {
    #[serde(rename = "x-amazon-apigateway-integration")]
    pub integration: GatewayIntegration,
    pub responses: BTreeMap<String, MethodResponse>,
}

/// Backend binding for one route: method POST to the handler regardless of
/// the inbound method, with a catch-all response mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayIntegration {
    #[serde(rename = "httpMethod")]
    pub http_method: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    pub uri: String,
    pub responses: BTreeMap<String, IntegrationResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodResponse {
    pub description: String,
    pub content: serde_json::Map<String, Value>,
}

/// Builds the route table for the given function invocation identity.
///
/// The identity is an opaque reference resolved only after the function is
/// provisioned; both path entries proxy to it with identical integration
/// semantics.
pub fn build_route_table(invoke_arn: &str) -> RouteTable {
    let echo_parameter = PathParameterSpec {
        location: "path".to_string(),
        name: PATH_VARIABLE_NAME.to_string(),
        schema: ParameterSchema {
            schema_type: "string".to_string(),
        },
        required: true,
        description: "The first variable of the url".to_string(),
    };

    RouteTable {
        openapi: OPENAPI_VERSION.to_string(),
        info: ApiInfo {
            title: API_TITLE.to_string(),
            version: API_VERSION.to_string(),
        },
        paths: BTreeMap::from([
            (
                ACK_PATH.to_string(),
                PathEntry {
                    parameters: Vec::new(),
                    get: method_entry(invoke_arn),
                },
            ),
            (
                ECHO_PATH.to_string(),
                PathEntry {
                    parameters: vec![echo_parameter],
                    get: method_entry(invoke_arn),
                },
            ),
        ]),
    }
}

fn method_entry(invoke_arn: &str) -> MethodEntry {
    MethodEntry {
        integration: GatewayIntegration {
            http_method: "POST".to_string(),
            integration_type: "aws_proxy".to_string(),
            uri: invoke_arn.to_string(),
            responses: BTreeMap::from([(
                ".*".to_string(),
                IntegrationResponse { status_code: 200 },
            )]),
        },
        responses: BTreeMap::from([(
            "200".to_string(),
            MethodResponse {
                description: "200 response".to_string(),
                content: serde_json::Map::new(),
            },
        )]),
    }
}
