use serde_json::json;

use crate::error::DeployError;
use crate::remote::{InfrastructureEngine, StackDeployRequest};
use crate::telemetry::log_info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackStatus {
    InProgress(String),
    Succeeded(String),
    /// The engine found nothing to change.
    NoChanges,
    Failed { status: String, reason: String },
}

impl StackStatus {
    pub fn classify(status: &str, reason: Option<&str>) -> Self {
        if status.ends_with("_IN_PROGRESS") {
            return Self::InProgress(status.to_string());
        }
        match status {
            "CREATE_COMPLETE" | "UPDATE_COMPLETE" | "IMPORT_COMPLETE" => {
                Self::Succeeded(status.to_string())
            }
            _ => Self::Failed {
                status: status.to_string(),
                reason: reason.unwrap_or("no reason reported").to_string(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress(status) | Self::Succeeded(status) => status,
            Self::NoChanges => "NO_CHANGES",
            Self::Failed { status, .. } => status,
        }
    }
}

/// Creates or updates the stack and blocks until the engine is done with it.
pub fn deploy_stack(
    request: &StackDeployRequest,
    engine: &dyn InfrastructureEngine,
) -> Result<StackStatus, DeployError> {
    log_info(
        "stack_deployer",
        "stack_submitted",
        json!({
            "stack_name": request.stack_name,
            "template": request.template_path.display().to_string(),
            "capabilities": request.capabilities,
            "parameter_names": request.parameters.keys().collect::<Vec<_>>(),
        }),
    );

    let status = engine.deploy(request)?;
    match &status {
        StackStatus::Succeeded(value) => {
            log_info(
                "stack_deployer",
                "stack_ready",
                json!({ "stack_name": request.stack_name, "status": value }),
            );
            Ok(status)
        }
        StackStatus::NoChanges => {
            log_info(
                "stack_deployer",
                "stack_no_changes",
                json!({ "stack_name": request.stack_name }),
            );
            Ok(status)
        }
        StackStatus::Failed { status, reason } => Err(DeployError::StackFailed {
            stack_name: request.stack_name.clone(),
            status: status.clone(),
            reason: reason.clone(),
        }),
        StackStatus::InProgress(value) => Err(DeployError::StackFailed {
            stack_name: request.stack_name.clone(),
            status: value.clone(),
            reason: "engine returned before the stack reached a terminal status".to_string(),
        }),
    }
}
