use crate::error::DeployError;
use crate::resources::{InvokePermissionSpec, ResourceKind};

pub const EXECUTION_ROLE_ID: &str = "execution-role";
pub const FUNCTION_ID: &str = "handler-function";
pub const REST_API_ID: &str = "rest-api";
pub const DEPLOYMENT_ID: &str = "deployment";
pub const STAGE_ID: &str = "stage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub id: String,
    pub kind: ResourceKind,
    pub depends_on: Vec<String>,
}

/// Immutable configuration graph, built once per apply. Dependency edges are
/// resolved into a topological order before any resource is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentGraph {
    nodes: Vec<ResourceNode>,
}

impl DeploymentGraph {
    pub fn new(nodes: Vec<ResourceNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Kahn's algorithm over declaration order, so the result is
    /// deterministic for identical input. Unknown dependencies and cycles
    /// are configuration errors.
    pub fn topological_order(&self) -> Result<Vec<&ResourceNode>, DeployError> {
        for node in &self.nodes {
            for dependency in &node.depends_on {
                if !self.nodes.iter().any(|other| &other.id == dependency) {
                    return Err(DeployError::UnknownDependency {
                        resource: node.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut emitted = vec![false; self.nodes.len()];

        while ordered.len() < self.nodes.len() {
            let ready = self.nodes.iter().enumerate().find(|(index, node)| {
                !emitted[*index]
                    && node.depends_on.iter().all(|dependency| {
                        self.nodes
                            .iter()
                            .position(|other| &other.id == dependency)
                            .is_some_and(|position| emitted[position])
                    })
            });

            match ready {
                Some((index, node)) => {
                    emitted[index] = true;
                    ordered.push(node);
                }
                None => {
                    let remaining = self
                        .nodes
                        .iter()
                        .enumerate()
                        .filter(|(index, _)| !emitted[*index])
                        .map(|(_, node)| node.id.clone())
                        .collect();
                    return Err(DeployError::DependencyCycle { remaining });
                }
            }
        }

        Ok(ordered)
    }
}

/// Stable node id for the grant covering one route template.
pub fn permission_node_id(route_path: &str) -> String {
    let mut slug = String::new();
    for c in route_path.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    format!("invoke-permission-{}", slug.trim_matches('-'))
}

/// The fixed deployment topology: role, then function, then the API
/// description, then one invoke grant per route, then the deployment keyed
/// by the content fingerprint, then the stage binding it.
pub fn standard_topology(grants: &[InvokePermissionSpec]) -> DeploymentGraph {
    let mut nodes = vec![
        ResourceNode {
            id: EXECUTION_ROLE_ID.to_string(),
            kind: ResourceKind::ExecutionRole,
            depends_on: Vec::new(),
        },
        ResourceNode {
            id: FUNCTION_ID.to_string(),
            kind: ResourceKind::Function,
            depends_on: vec![EXECUTION_ROLE_ID.to_string()],
        },
        ResourceNode {
            id: REST_API_ID.to_string(),
            kind: ResourceKind::RestApi,
            depends_on: vec![FUNCTION_ID.to_string()],
        },
    ];

    let mut deployment_depends_on = vec![REST_API_ID.to_string()];
    for grant in grants {
        let id = permission_node_id(&grant.route_path);
        deployment_depends_on.push(id.clone());
        nodes.push(ResourceNode {
            id,
            kind: ResourceKind::InvokePermission,
            depends_on: vec![FUNCTION_ID.to_string(), REST_API_ID.to_string()],
        });
    }

    nodes.push(ResourceNode {
        id: DEPLOYMENT_ID.to_string(),
        kind: ResourceKind::Deployment,
        depends_on: deployment_depends_on,
    });
    nodes.push(ResourceNode {
        id: STAGE_ID.to_string(),
        kind: ResourceKind::Stage,
        depends_on: vec![REST_API_ID.to_string(), DEPLOYMENT_ID.to_string()],
    });

    DeploymentGraph::new(nodes)
}

/// Every declared route must be covered by a grant; an omission is a
/// deployment-time misconfiguration, not a runtime-detectable fault.
pub fn validate_invoke_permissions(
    route_paths: &[&str],
    grants: &[InvokePermissionSpec],
) -> Result<(), DeployError> {
    for route_path in route_paths {
        if !grants.iter().any(|grant| grant.route_path == *route_path) {
            return Err(DeployError::MissingInvokePermission {
                route_path: (*route_path).to_string(),
            });
        }
    }
    Ok(())
}
