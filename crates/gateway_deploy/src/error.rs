use std::fmt;

/// Deploy-time configuration and provisioning failures. All are terminal;
/// the apply halts on the first one and nothing is retried locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    UnknownDependency {
        resource: String,
        dependency: String,
    },
    DependencyCycle {
        remaining: Vec<String>,
    },
    MissingInvokePermission {
        route_path: String,
    },
    OutputNotResolved {
        resource: String,
        dependency: String,
    },
    Provision {
        resource: String,
        message: String,
    },
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDependency {
                resource,
                dependency,
            } => write!(
                f,
                "resource '{resource}' depends on unknown resource '{dependency}'"
            ),
            Self::DependencyCycle { remaining } => write!(
                f,
                "dependency cycle among resources: {}",
                remaining.join(", ")
            ),
            Self::MissingInvokePermission { route_path } => write!(
                f,
                "route '{route_path}' has no invocation-permission grant"
            ),
            Self::OutputNotResolved {
                resource,
                dependency,
            } => write!(
                f,
                "resource '{resource}' was scheduled before the output of '{dependency}' resolved"
            ),
            Self::Provision { resource, message } => {
                write!(f, "failed to provision '{resource}': {message}")
            }
        }
    }
}

impl std::error::Error for DeployError {}
